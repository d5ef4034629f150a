//! services/client/src/adapters/studio_api.rs
//!
//! HTTP adapter for studio content generation, implementing the `StudioApi`
//! port. Generation itself runs server side; this adapter only starts jobs,
//! lists finished artifacts, and deletes them.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use sop_genius_core::domain::StudioArtifact;
use sop_genius_core::ports::{PortError, PortResult, StudioApi};

use crate::http::transport::{read_json, read_ok, RequestSpec, Transport};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An HTTP adapter that implements the `StudioApi` port.
#[derive(Clone)]
pub struct StudioHttp {
    base_url: String,
    transport: Arc<Transport>,
}

impl StudioHttp {
    pub fn new(base_url: impl Into<String>, transport: Arc<Transport>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            transport,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

//=========================================================================================
// "Impure" Wire Record Structs
//=========================================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArtifactRecord {
    tool_id: String,
    #[serde(default)]
    content: serde_json::Value,
}

impl ArtifactRecord {
    fn to_domain(self) -> StudioArtifact {
        StudioArtifact {
            tool_id: self.tool_id,
            content: self.content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    success: bool,
}

//=========================================================================================
// Port Implementation
//=========================================================================================

#[async_trait]
impl StudioApi for StudioHttp {
    async fn fetch_artifacts(&self, chat_id: &str) -> PortResult<Vec<StudioArtifact>> {
        let spec = RequestSpec::get(self.url(&format!("/api/studio/{chat_id}")));
        let records: Vec<ArtifactRecord> =
            read_json(self.transport.send_with_refresh(spec).await?).await?;
        Ok(records.into_iter().map(ArtifactRecord::to_domain).collect())
    }

    async fn start_generation(&self, chat_id: &str, tool_id: &str) -> PortResult<()> {
        let spec = RequestSpec::post_json(
            self.url("/api/studio/generate"),
            json!({ "chatId": chat_id, "toolId": tool_id }),
        );
        let response: GenerateResponse =
            read_json(self.transport.send_with_refresh(spec).await?).await?;
        if response.success {
            Ok(())
        } else {
            Err(PortError::Unexpected(
                "Generation request was not accepted".to_string(),
            ))
        }
    }

    async fn delete_artifact(&self, chat_id: &str, tool_id: &str) -> PortResult<()> {
        let spec = RequestSpec::delete(self.url(&format!("/api/studio/{chat_id}/{tool_id}")));
        read_ok(self.transport.send_with_refresh(spec).await?).await
    }
}
