//! services/client/src/lib.rs
//!
//! The assembled SOP assistant client. `SopClient::new` wires one cookie-
//! holding HTTP transport (with its token-refresh gate) to the auth, chat,
//! and studio adapters, and puts a store over each. Consumers hold the
//! stores; everything below them is plumbing.

pub mod adapters;
pub mod config;
pub mod error;
pub mod http;
pub mod store;

pub use config::Config;
pub use error::ClientError;

use std::sync::Arc;

use adapters::{AuthHttp, ChatHttp, StudioHttp};
use http::Transport;
use store::{ChatStore, SessionStore, StudioStore};

pub struct SopClient {
    pub session: Arc<SessionStore>,
    pub chats: Arc<ChatStore>,
    pub studio: Arc<StudioStore>,
    pub config: Config,
}

impl SopClient {
    pub fn new(config: Config) -> Result<Self, ClientError> {
        // --- 1. Build the HTTP Client & Refreshing Transport ---
        // The cookie store carries the access and refresh cookies; tokens
        // are never handled in application code.
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        let refresh_url = format!(
            "{}/api/auth/refresh-token",
            config.api_url.trim_end_matches('/')
        );
        let transport = Arc::new(Transport::new(http, refresh_url));

        // --- 2. Initialize the API Adapters ---
        let auth_api = Arc::new(AuthHttp::new(config.api_url.clone(), transport.clone()));
        let chat_api = Arc::new(ChatHttp::new(config.chat_api_url.clone(), transport.clone()));
        let studio_api = Arc::new(StudioHttp::new(config.chat_api_url.clone(), transport));

        // --- 3. Build the Stores ---
        let session = Arc::new(SessionStore::new(auth_api));
        let chats = Arc::new(ChatStore::new(chat_api));
        let studio = Arc::new(StudioStore::new(
            studio_api,
            config.studio_poll_interval,
            config.studio_poll_attempts,
        ));

        Ok(Self {
            session,
            chats,
            studio,
            config,
        })
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(Config::from_env()?)
    }
}
