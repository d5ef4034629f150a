//! crates/sop_genius_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of the HTTP implementation behind them.

use async_trait::async_trait;
use crate::domain::{
    Chat, ChatAnswer, ChatUpdate, FileUpload, PdfDocument, ProfileUpdate, Source, StudioArtifact,
    User,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error surface shared by every port operation.
///
/// Transport failures and HTTP error responses are normalized into these
/// variants by the adapters, so the stores can match on meaning instead of
/// sniffing message strings.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PortError {
    /// The request never produced a response (DNS, connect, TLS, body read).
    #[error("Network error: {0}")]
    Network(String),
    /// A non-2xx response, carrying the server's `message` or a generic
    /// status line when the body had none.
    #[error("{message}")]
    Status { status: u16, message: String },
    /// A 401 from an endpoint called outside the refresh flow.
    #[error("{0}")]
    Unauthorized(String),
    /// An OTP resend was rate-limited; `retry_after_secs` comes from the
    /// server's `remainingCooldown`.
    #[error("{message}")]
    Cooldown { message: String, retry_after_secs: u64 },
    /// Raised when a token refresh fails or a replayed request 401s again.
    /// Terminal: callers treat the session as gone.
    #[error("Session expired")]
    SessionExpired,
    /// The response arrived but did not have the expected shape.
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

impl PortError {
    /// True for the terminal session-loss error raised by the refresh flow.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, PortError::SessionExpired)
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthApi: Send + Sync {
    // --- Registration (two-phase: register, then verify the emailed OTP) ---
    async fn register(&self, fullname: &str, email: &str, password: &str) -> PortResult<()>;

    async fn send_otp(&self, email: &str) -> PortResult<()>;

    async fn verify_otp(&self, email: &str, otp: &str) -> PortResult<User>;

    // --- Session ---
    async fn login(&self, email: &str, password: &str) -> PortResult<User>;

    async fn logout(&self) -> PortResult<()>;

    /// Exchanges the refresh cookie for a new access token. The new token
    /// arrives as a Set-Cookie; the caller only learns success or failure.
    async fn refresh_token(&self) -> PortResult<()>;

    // --- Profile ---
    async fn get_profile(&self) -> PortResult<User>;

    async fn update_profile(&self, update: &ProfileUpdate) -> PortResult<User>;

    async fn upload_avatar(&self, file: FileUpload) -> PortResult<User>;
}

#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Creates a chat under a client-chosen id. The backend answers 409 when
    /// the id already exists; callers decide whether that is an error.
    async fn create_chat(&self, chat_id: &str, title: &str) -> PortResult<Chat>;

    async fn fetch_chats(&self) -> PortResult<Vec<Chat>>;

    async fn update_chat(&self, chat_id: &str, update: &ChatUpdate) -> PortResult<Chat>;

    async fn rename_chat(&self, chat_id: &str, title: &str) -> PortResult<()>;

    async fn delete_chat(&self, chat_id: &str) -> PortResult<()>;

    async fn send_message(&self, chat_id: &str, question: &str) -> PortResult<ChatAnswer>;

    /// Multipart upload of one or more PDFs into a chat. Returns the
    /// server-assigned source descriptors (usually still `Processing`).
    async fn upload_pdfs(&self, chat_id: &str, files: Vec<FileUpload>) -> PortResult<Vec<Source>>;

    async fn fetch_chat_pdfs(&self, chat_id: &str) -> PortResult<Vec<Source>>;

    async fn fetch_all_pdfs(&self) -> PortResult<Vec<PdfDocument>>;
}

#[async_trait]
pub trait StudioApi: Send + Sync {
    /// Lists every generated artifact for a chat.
    async fn fetch_artifacts(&self, chat_id: &str) -> PortResult<Vec<StudioArtifact>>;

    /// Kicks off asynchronous generation for one tool. Acceptance only; the
    /// content appears later in `fetch_artifacts`.
    async fn start_generation(&self, chat_id: &str, tool_id: &str) -> PortResult<()>;

    async fn delete_artifact(&self, chat_id: &str, tool_id: &str) -> PortResult<()>;
}
