//! services/client/src/http/transport.rs
//!
//! The HTTP layer shared by every adapter: a replayable request description,
//! the refreshing send path that intercepts 401s, and the normalization of
//! error responses into `PortError`.

use bytes::Bytes;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use sop_genius_core::ports::{PortError, PortResult};

use super::refresh::{RefreshGate, RefreshTicket, RefreshVerdict};

//=========================================================================================
// Request Specification
//=========================================================================================

/// One part of a multipart form.
#[derive(Debug, Clone)]
pub enum PartSpec {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        bytes: Bytes,
    },
}

#[derive(Debug, Clone)]
enum RequestBody {
    Empty,
    Json(Value),
    Multipart(Vec<PartSpec>),
}

/// A request described by value rather than as a built `reqwest::Request`.
///
/// A consumed multipart form cannot be cloned, but the refresh flow has to
/// be able to issue the same request twice; rebuilding from this spec makes
/// the replay exact.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    url: String,
    body: RequestBody,
}

impl RequestSpec {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn post_empty(url: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: RequestBody::Json(body),
        }
    }

    pub fn patch_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::PATCH,
            url: url.into(),
            body: RequestBody::Json(body),
        }
    }

    /// DELETE carrying a JSON body (the chat delete endpoint wants the id in
    /// the body, not the path).
    pub fn delete_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::DELETE,
            url: url.into(),
            body: RequestBody::Json(body),
        }
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            url: url.into(),
            body: RequestBody::Empty,
        }
    }

    pub fn post_multipart(url: impl Into<String>, parts: Vec<PartSpec>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: RequestBody::Multipart(parts),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

//=========================================================================================
// Transport
//=========================================================================================

/// Issues requests over one cookie-carrying `reqwest::Client` and owns the
/// refresh coordination for everything routed through `send_with_refresh`.
pub struct Transport {
    http: reqwest::Client,
    refresh_url: String,
    gate: RefreshGate,
}

impl Transport {
    pub fn new(http: reqwest::Client, refresh_url: String) -> Self {
        Self {
            http,
            refresh_url,
            gate: RefreshGate::new(),
        }
    }

    /// Sends a request exactly once. No 401 handling; auth endpoints use
    /// this directly, since a 401 from login means bad credentials rather
    /// than a stale token.
    pub async fn send(&self, spec: &RequestSpec) -> PortResult<Response> {
        let mut builder = self.http.request(spec.method.clone(), &spec.url);
        builder = match &spec.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)),
        };
        builder
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))
    }

    /// Sends a request, transparently refreshing the session on a 401.
    ///
    /// The refresh endpoint itself is never intercepted (that would recurse),
    /// at most one refresh call is in flight across all concurrent requests,
    /// and a request is replayed at most once per refresh cycle. A 401 on
    /// the replay, or a failed refresh, surfaces as `SessionExpired`.
    pub async fn send_with_refresh(&self, spec: RequestSpec) -> PortResult<Response> {
        let response = self.send(&spec).await?;
        if response.status() != StatusCode::UNAUTHORIZED || spec.url.contains("/refresh-token") {
            return Ok(response);
        }

        debug!("Request to {} returned 401, entering refresh flow", spec.url);
        match self.gate.begin().await {
            RefreshTicket::Leader => {
                let verdict = self.run_refresh().await;
                self.gate.settle(verdict).await;
                match verdict {
                    RefreshVerdict::Refreshed => self.replay(&spec).await,
                    RefreshVerdict::Expired => Err(PortError::SessionExpired),
                }
            }
            RefreshTicket::Follower(rx) => match rx.await {
                Ok(RefreshVerdict::Refreshed) => self.replay(&spec).await,
                // A dropped leader counts as a failed refresh.
                Ok(RefreshVerdict::Expired) | Err(_) => Err(PortError::SessionExpired),
            },
        }
    }

    /// The leader's refresh call. Any failure mode means the session is gone.
    async fn run_refresh(&self) -> RefreshVerdict {
        info!("Access token rejected, attempting a token refresh");
        let refresh = RequestSpec::post_empty(&self.refresh_url);
        match self.send(&refresh).await {
            Ok(response) if response.status().is_success() => RefreshVerdict::Refreshed,
            Ok(response) => {
                warn!("Token refresh rejected with status {}", response.status());
                RefreshVerdict::Expired
            }
            Err(e) => {
                warn!("Token refresh failed to complete: {:?}", e);
                RefreshVerdict::Expired
            }
        }
    }

    async fn replay(&self, spec: &RequestSpec) -> PortResult<Response> {
        let response = self.send(spec).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            // Still rejected after a fresh token: stop instead of looping.
            return Err(PortError::SessionExpired);
        }
        Ok(response)
    }
}

fn build_form(parts: &[PartSpec]) -> reqwest::multipart::Form {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        form = match part {
            PartSpec::Text { name, value } => form.text(name.clone(), value.clone()),
            PartSpec::File {
                name,
                file_name,
                bytes,
            } => form.part(
                name.clone(),
                reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(file_name.clone()),
            ),
        };
    }
    form
}

//=========================================================================================
// Response Normalization
//=========================================================================================

/// Checks the status and decodes a JSON body.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> PortResult<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| PortError::Unexpected(format!("Invalid response body: {e}")))
}

/// Checks the status and discards the body.
pub async fn read_ok(response: Response) -> PortResult<()> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    Ok(())
}

/// Normalizes a non-2xx response into a `PortError`.
///
/// Error bodies are JSON `{message}` when the backend produced them; a body
/// that does not parse still yields the generic status-code message. An OTP
/// rate limit is recognized by its `remainingCooldown` field.
pub async fn error_from_response(response: Response) -> PortError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed: Option<Value> = serde_json::from_str(&body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string);
    let cooldown = parsed
        .as_ref()
        .and_then(|v| v.get("remainingCooldown"))
        .and_then(|c| c.as_u64());

    if let Some(retry_after_secs) = cooldown {
        return PortError::Cooldown {
            message: message
                .unwrap_or_else(|| "Please wait before requesting another code".to_string()),
            retry_after_secs,
        };
    }
    if status == StatusCode::UNAUTHORIZED {
        return PortError::Unauthorized(
            message.unwrap_or_else(|| "Access token required".to_string()),
        );
    }
    PortError::Status {
        status: status.as_u16(),
        message: message.unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16())),
    }
}
