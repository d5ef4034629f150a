//! services/client/src/adapters/auth_api.rs
//!
//! This module contains the HTTP adapter for authentication and profile
//! operations, the concrete implementation of the `AuthApi` port from the
//! `core` crate.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use sop_genius_core::domain::{FileUpload, ProfileUpdate, User};
use sop_genius_core::ports::{AuthApi, PortError, PortResult};

use crate::http::transport::{read_json, read_ok, PartSpec, RequestSpec, Transport};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An HTTP adapter that implements the `AuthApi` port.
///
/// Every call here is sent raw, without refresh interception: a 401 from
/// login means bad credentials, and the bootstrap's profile probe manages
/// its own single refresh-and-retry.
#[derive(Clone)]
pub struct AuthHttp {
    base_url: String,
    transport: Arc<Transport>,
}

impl AuthHttp {
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
struct UserRecord {
    #[serde(alias = "_id")]
    id: String,
    fullname: String,
    email: String,
    avatar: Option<String>,
    last_login: Option<DateTime<Utc>>,
    is_email_verified: Option<bool>,
}

impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            fullname: self.fullname,
            email: self.email,
            avatar: self.avatar,
            last_login: self.last_login,
            is_email_verified: self.is_email_verified,
        }
    }
}

/// Auth endpoints wrap the account in a `user` field.
#[derive(Debug, Deserialize)]
struct UserEnvelope {
    user: Option<UserRecord>,
}

impl UserEnvelope {
    fn into_user(self) -> PortResult<User> {
        match self.user {
            Some(record) => Ok(record.to_domain()),
            None => Err(PortError::Unexpected(
                "Response did not include a user".to_string(),
            )),
        }
    }
}

//=========================================================================================
// Port Implementation
//=========================================================================================

#[async_trait]
impl AuthApi for AuthHttp {
    async fn register(&self, fullname: &str, email: &str, password: &str) -> PortResult<()> {
        let spec = RequestSpec::post_json(
            self.url("/api/auth/register"),
            json!({ "fullname": fullname, "email": email, "password": password }),
        );
        read_ok(self.transport.send(&spec).await?).await
    }

    async fn send_otp(&self, email: &str) -> PortResult<()> {
        let spec = RequestSpec::post_json(self.url("/api/auth/send-otp"), json!({ "email": email }));
        read_ok(self.transport.send(&spec).await?).await
    }

    async fn verify_otp(&self, email: &str, otp: &str) -> PortResult<User> {
        let spec = RequestSpec::post_json(
            self.url("/api/auth/verify-otp"),
            json!({ "email": email, "otp": otp }),
        );
        let envelope: UserEnvelope = read_json(self.transport.send(&spec).await?).await?;
        envelope.into_user()
    }

    async fn login(&self, email: &str, password: &str) -> PortResult<User> {
        let spec = RequestSpec::post_json(
            self.url("/api/auth/login"),
            json!({ "email": email, "password": password }),
        );
        let envelope: UserEnvelope = read_json(self.transport.send(&spec).await?).await?;
        envelope.into_user()
    }

    async fn logout(&self) -> PortResult<()> {
        let spec = RequestSpec::post_empty(self.url("/api/auth/logout"));
        read_ok(self.transport.send(&spec).await?).await
    }

    async fn refresh_token(&self) -> PortResult<()> {
        let spec = RequestSpec::post_empty(self.url("/api/auth/refresh-token"));
        read_ok(self.transport.send(&spec).await?).await
    }

    async fn get_profile(&self) -> PortResult<User> {
        let spec = RequestSpec::get(self.url("/api/profile/"));
        let envelope: UserEnvelope = read_json(self.transport.send(&spec).await?).await?;
        envelope.into_user()
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> PortResult<User> {
        let mut body = serde_json::Map::new();
        if let Some(fullname) = &update.fullname {
            body.insert("fullname".to_string(), json!(fullname));
        }
        if let Some(email) = &update.email {
            body.insert("email".to_string(), json!(email));
        }
        let spec = RequestSpec::patch_json(self.url("/api/profile/"), body.into());
        let envelope: UserEnvelope = read_json(self.transport.send(&spec).await?).await?;
        envelope.into_user()
    }

    async fn upload_avatar(&self, file: FileUpload) -> PortResult<User> {
        let spec = RequestSpec::post_multipart(
            self.url("/api/profile/upload"),
            vec![PartSpec::File {
                name: "avatar".to_string(),
                file_name: file.file_name,
                bytes: Bytes::from(file.bytes),
            }],
        );
        let envelope: UserEnvelope = read_json(self.transport.send(&spec).await?).await?;
        envelope.into_user()
    }
}
