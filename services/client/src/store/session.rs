//! services/client/src/store/session.rs
//!
//! The session store: owns the `SessionState` snapshot, dispatches reducer
//! actions around each `AuthApi` call, and tracks the OTP resend cooldown.
//! It is the only component that clears the session.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use sop_genius_core::domain::{FileUpload, ProfileUpdate, User};
use sop_genius_core::ports::{AuthApi, PortError, PortResult};
use sop_genius_core::session::{
    reduce, OtpCooldown, SessionAction, SessionState, DEFAULT_OTP_COOLDOWN_SECS,
};

//=========================================================================================
// The Session Store
//=========================================================================================

pub struct SessionStore {
    api: Arc<dyn AuthApi>,
    state: RwLock<SessionState>,
    cooldown: RwLock<OtpCooldown>,
}

impl SessionStore {
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        Self {
            api,
            state: RwLock::new(SessionState::default()),
            cooldown: RwLock::new(OtpCooldown::default()),
        }
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    async fn dispatch(&self, action: SessionAction) {
        let mut state = self.state.write().await;
        *state = reduce(&state, action);
    }

    /// Seconds left before the resend-OTP button unlocks. Zero means resend
    /// is allowed.
    pub async fn otp_cooldown_remaining(&self) -> u64 {
        self.cooldown.read().await.remaining_secs(Instant::now())
    }

    async fn start_cooldown(&self, secs: u64) {
        self.cooldown.write().await.start(Instant::now(), secs);
    }

    //=====================================================================================
    // Operations
    //=====================================================================================

    /// Restores the session on application start: fetch the profile, and on a
    /// 401 refresh the token once and retry the fetch once. Any remaining
    /// failure leaves the session anonymous without surfacing an error.
    /// Protected views must wait for the `is_initialized` flag this sets.
    pub async fn bootstrap(&self) {
        self.dispatch(SessionAction::BootstrapStarted).await;

        let user = match self.api.get_profile().await {
            Ok(user) => Some(user),
            Err(PortError::Unauthorized(_)) => {
                debug!("Bootstrap profile fetch was rejected, attempting a token refresh");
                match self.api.refresh_token().await {
                    Ok(()) => match self.api.get_profile().await {
                        Ok(user) => Some(user),
                        Err(e) => {
                            debug!("Profile fetch still failing after refresh: {}", e);
                            None
                        }
                    },
                    Err(e) => {
                        debug!("Token refresh failed during bootstrap: {}", e);
                        None
                    }
                }
            }
            Err(e) => {
                warn!("Bootstrap profile fetch failed: {}", e);
                None
            }
        };

        match &user {
            Some(user) => info!("Session restored for user {}", user.id),
            None => debug!("No session to restore, starting anonymous"),
        }
        self.dispatch(SessionAction::BootstrapFinished(user)).await;
    }

    pub async fn login(&self, email: &str, password: &str) -> PortResult<User> {
        self.dispatch(SessionAction::LoginStarted).await;
        match self.api.login(email, password).await {
            Ok(user) => {
                info!("User {} logged in", user.id);
                self.dispatch(SessionAction::LoginSucceeded(user.clone()))
                    .await;
                Ok(user)
            }
            Err(e) => {
                self.dispatch(SessionAction::LoginFailed(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    /// Phase one of signup: creates the unverified account and triggers the
    /// OTP email. The session stays anonymous until `verify_otp` succeeds.
    pub async fn register(&self, fullname: &str, email: &str, password: &str) -> PortResult<()> {
        self.dispatch(SessionAction::RegisterStarted).await;
        match self.api.register(fullname, email, password).await {
            Ok(()) => {
                self.dispatch(SessionAction::RegisterSucceeded).await;
                self.start_cooldown(DEFAULT_OTP_COOLDOWN_SECS).await;
                Ok(())
            }
            Err(e) => {
                self.adopt_server_cooldown(&e).await;
                self.dispatch(SessionAction::RegisterFailed(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    pub async fn resend_otp(&self, email: &str) -> PortResult<()> {
        self.dispatch(SessionAction::OtpResendStarted).await;
        match self.api.send_otp(email).await {
            Ok(()) => {
                self.dispatch(SessionAction::OtpResendSucceeded).await;
                self.start_cooldown(DEFAULT_OTP_COOLDOWN_SECS).await;
                Ok(())
            }
            Err(e) => {
                self.adopt_server_cooldown(&e).await;
                self.dispatch(SessionAction::OtpResendFailed(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    /// Phase two of signup. A successful verification authenticates the
    /// session; a rejected one clears it, same as a rejected login.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> PortResult<User> {
        self.dispatch(SessionAction::OtpVerifyStarted).await;
        match self.api.verify_otp(email, otp).await {
            Ok(user) => {
                info!("User {} verified and logged in", user.id);
                self.dispatch(SessionAction::OtpVerifySucceeded(user.clone()))
                    .await;
                Ok(user)
            }
            Err(e) => {
                self.dispatch(SessionAction::OtpVerifyFailed(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    pub async fn logout(&self) -> PortResult<()> {
        match self.api.logout().await {
            Ok(()) => {
                info!("User logged out");
                self.dispatch(SessionAction::LogoutSucceeded).await;
                Ok(())
            }
            Err(e) => {
                warn!("Logout request failed: {}", e);
                self.dispatch(SessionAction::LogoutFailed(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    pub async fn fetch_profile(&self) -> PortResult<User> {
        self.dispatch(SessionAction::ProfileFetchStarted).await;
        match self.api.get_profile().await {
            Ok(user) => {
                self.dispatch(SessionAction::ProfileFetched(user.clone()))
                    .await;
                Ok(user)
            }
            Err(e) => {
                self.dispatch(SessionAction::ProfileFetchFailed(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> PortResult<User> {
        self.dispatch(SessionAction::ProfileUpdateStarted).await;
        match self.api.update_profile(update).await {
            Ok(user) => {
                self.dispatch(SessionAction::ProfileUpdated(user.clone()))
                    .await;
                Ok(user)
            }
            Err(e) => {
                self.dispatch(SessionAction::ProfileUpdateFailed(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    pub async fn upload_avatar(&self, file: FileUpload) -> PortResult<User> {
        self.dispatch(SessionAction::ProfileUpdateStarted).await;
        match self.api.upload_avatar(file).await {
            Ok(user) => {
                self.dispatch(SessionAction::ProfileUpdated(user.clone()))
                    .await;
                Ok(user)
            }
            Err(e) => {
                self.dispatch(SessionAction::ProfileUpdateFailed(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    /// A rate-limited resend reports how long to wait; the countdown adopts
    /// the server's figure instead of the default.
    async fn adopt_server_cooldown(&self, error: &PortError) {
        if let PortError::Cooldown {
            retry_after_secs, ..
        } = error
        {
            self.start_cooldown(*retry_after_secs).await;
        }
    }
}
