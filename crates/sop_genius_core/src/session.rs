//! crates/sop_genius_core/src/session.rs
//!
//! The authentication session state machine, expressed as a pure reducer:
//! `reduce(&state, action) -> state`. The client's session store owns the
//! current snapshot and is the only place actions are dispatched from, but
//! every transition lives here where it can be tested without I/O.

use std::time::{Duration, Instant};

use crate::domain::User;

//=========================================================================================
// Session State
//=========================================================================================

/// The single source of truth for "is there a valid session".
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub user: Option<User>,
    /// True iff the last login/verify/profile fetch succeeded.
    pub is_authenticated: bool,
    /// Flips to true exactly once, when the first profile-fetch attempt
    /// settles. Views must not render protected content before this.
    pub is_initialized: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

//=========================================================================================
// Session Actions
//=========================================================================================

/// Every observable state transition of the session. Each network operation
/// contributes a started action and one of a success/failure pair.
#[derive(Debug, Clone)]
pub enum SessionAction {
    BootstrapStarted,
    /// The bootstrap settled. `Some(user)` restores a session; `None` leaves
    /// it anonymous without surfacing an error (a cold visit is not a fault).
    BootstrapFinished(Option<User>),

    LoginStarted,
    LoginSucceeded(User),
    /// A rejected login force-clears any previous session.
    LoginFailed(String),

    RegisterStarted,
    /// Registration alone never authenticates; the account stays pending
    /// until the OTP is verified.
    RegisterSucceeded,
    RegisterFailed(String),

    OtpResendStarted,
    OtpResendSucceeded,
    OtpResendFailed(String),

    OtpVerifyStarted,
    OtpVerifySucceeded(User),
    /// A rejected verification is treated like a rejected login.
    OtpVerifyFailed(String),

    ProfileFetchStarted,
    ProfileFetched(User),
    /// Completes initialization (the bootstrap gate) but leaves whatever
    /// authenticated state existed before.
    ProfileFetchFailed(String),

    ProfileUpdateStarted,
    /// Covers both field updates and avatar uploads: the server returns the
    /// whole user, which replaces the held one.
    ProfileUpdated(User),
    /// A failed profile mutation must not log the user out.
    ProfileUpdateFailed(String),

    LogoutSucceeded,
    LogoutFailed(String),
}

/// Applies one action to a snapshot, returning the next snapshot.
pub fn reduce(state: &SessionState, action: SessionAction) -> SessionState {
    let mut next = state.clone();
    match action {
        SessionAction::BootstrapStarted => {
            next.is_loading = true;
        }
        SessionAction::BootstrapFinished(user) => {
            next.is_loading = false;
            next.is_initialized = true;
            if let Some(user) = user {
                next.user = Some(user);
                next.is_authenticated = true;
            }
        }

        SessionAction::LoginStarted
        | SessionAction::RegisterStarted
        | SessionAction::OtpResendStarted
        | SessionAction::OtpVerifyStarted => {
            next.is_loading = true;
            next.error = None;
        }

        SessionAction::LoginSucceeded(user) | SessionAction::OtpVerifySucceeded(user) => {
            next.user = Some(user);
            next.is_authenticated = true;
            next.is_loading = false;
            next.error = None;
        }
        SessionAction::LoginFailed(message) | SessionAction::OtpVerifyFailed(message) => {
            next.user = None;
            next.is_authenticated = false;
            next.is_loading = false;
            next.error = Some(message);
        }

        SessionAction::RegisterSucceeded | SessionAction::OtpResendSucceeded => {
            next.is_loading = false;
        }
        SessionAction::RegisterFailed(message) | SessionAction::OtpResendFailed(message) => {
            next.is_loading = false;
            next.error = Some(message);
        }

        SessionAction::ProfileFetchStarted | SessionAction::ProfileUpdateStarted => {
            next.is_loading = true;
        }
        SessionAction::ProfileFetched(user) => {
            next.user = Some(user);
            next.is_authenticated = true;
            next.is_initialized = true;
            next.is_loading = false;
        }
        SessionAction::ProfileFetchFailed(message) => {
            next.is_initialized = true;
            next.is_loading = false;
            next.error = Some(message);
        }
        SessionAction::ProfileUpdated(user) => {
            next.user = Some(user);
            next.is_loading = false;
        }
        SessionAction::ProfileUpdateFailed(message) => {
            next.is_loading = false;
            next.error = Some(message);
        }

        SessionAction::LogoutSucceeded => {
            next.user = None;
            next.is_authenticated = false;
            next.error = None;
        }
        SessionAction::LogoutFailed(message) => {
            next.error = Some(message);
        }
    }
    next
}

//=========================================================================================
// OTP Resend Cooldown
//=========================================================================================

/// Default client-side cooldown after a successful register or resend.
pub const DEFAULT_OTP_COOLDOWN_SECS: u64 = 30;

/// A pure countdown for the resend-OTP button. The clock is always passed
/// in, so tests never have to sleep.
#[derive(Debug, Clone, Copy, Default)]
pub struct OtpCooldown {
    deadline: Option<Instant>,
}

impl OtpCooldown {
    pub fn start(&mut self, now: Instant, secs: u64) {
        self.deadline = Some(now + Duration::from_secs(secs));
    }

    /// Whole seconds left, rounded up. Zero once the cooldown has elapsed.
    pub fn remaining_secs(&self, now: Instant) -> u64 {
        let Some(deadline) = self.deadline else {
            return 0;
        };
        let left = deadline.saturating_duration_since(now);
        left.as_secs() + u64::from(left.subsec_nanos() > 0)
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.remaining_secs(now) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            fullname: "Ana Ruiz".to_string(),
            email: "ana@example.com".to_string(),
            avatar: None,
            last_login: None,
            is_email_verified: Some(true),
        }
    }

    #[test]
    fn bootstrap_success_initializes_and_authenticates() {
        let s0 = SessionState::default();
        let s1 = reduce(&s0, SessionAction::BootstrapStarted);
        assert!(s1.is_loading);
        assert!(!s1.is_initialized);

        let s2 = reduce(&s1, SessionAction::BootstrapFinished(Some(user("u1"))));
        assert!(s2.is_initialized);
        assert!(s2.is_authenticated);
        assert!(!s2.is_loading);
        assert_eq!(s2.user.as_ref().map(|u| u.id.as_str()), Some("u1"));
    }

    #[test]
    fn terminal_bootstrap_failure_is_silent() {
        let s0 = reduce(&SessionState::default(), SessionAction::BootstrapStarted);
        let s1 = reduce(&s0, SessionAction::BootstrapFinished(None));
        assert!(s1.is_initialized);
        assert!(!s1.is_authenticated);
        assert!(s1.user.is_none());
        // An anonymous cold start is not an error the user should see.
        assert!(s1.error.is_none());
    }

    #[test]
    fn rejected_login_clears_a_previous_session() {
        let signed_in = reduce(
            &SessionState::default(),
            SessionAction::LoginSucceeded(user("u1")),
        );
        assert!(signed_in.is_authenticated);

        let rejected = reduce(
            &reduce(&signed_in, SessionAction::LoginStarted),
            SessionAction::LoginFailed("Invalid email or password".to_string()),
        );
        assert!(!rejected.is_authenticated);
        assert!(rejected.user.is_none());
        assert_eq!(
            rejected.error.as_deref(),
            Some("Invalid email or password")
        );
    }

    #[test]
    fn register_success_does_not_authenticate() {
        let s = reduce(
            &reduce(&SessionState::default(), SessionAction::RegisterStarted),
            SessionAction::RegisterSucceeded,
        );
        assert!(!s.is_authenticated);
        assert!(s.user.is_none());
        assert!(!s.is_loading);
    }

    #[test]
    fn verify_success_completes_the_two_phase_signup() {
        let s = reduce(
            &SessionState::default(),
            SessionAction::OtpVerifySucceeded(user("u2")),
        );
        assert!(s.is_authenticated);
        assert_eq!(s.user.as_ref().map(|u| u.id.as_str()), Some("u2"));
    }

    #[test]
    fn failed_profile_mutation_keeps_the_session() {
        let signed_in = reduce(
            &SessionState::default(),
            SessionAction::LoginSucceeded(user("u1")),
        );
        let s = reduce(
            &reduce(&signed_in, SessionAction::ProfileUpdateStarted),
            SessionAction::ProfileUpdateFailed("avatar too large".to_string()),
        );
        assert!(s.is_authenticated);
        assert!(s.user.is_some());
        assert_eq!(s.error.as_deref(), Some("avatar too large"));
    }

    #[test]
    fn logout_clears_user_and_error() {
        let signed_in = reduce(
            &SessionState::default(),
            SessionAction::LoginSucceeded(user("u1")),
        );
        let errored = reduce(
            &signed_in,
            SessionAction::ProfileUpdateFailed("boom".to_string()),
        );
        let s = reduce(&errored, SessionAction::LogoutSucceeded);
        assert!(!s.is_authenticated);
        assert!(s.user.is_none());
        assert!(s.error.is_none());
    }

    #[test]
    fn started_actions_clear_stale_errors() {
        let errored = reduce(
            &SessionState::default(),
            SessionAction::LoginFailed("nope".to_string()),
        );
        let retrying = reduce(&errored, SessionAction::LoginStarted);
        assert!(retrying.error.is_none());
        assert!(retrying.is_loading);
    }

    #[test]
    fn cooldown_counts_down_and_expires() {
        let t0 = Instant::now();
        let mut cd = OtpCooldown::default();
        assert!(!cd.is_active(t0));

        cd.start(t0, DEFAULT_OTP_COOLDOWN_SECS);
        assert_eq!(cd.remaining_secs(t0), 30);
        assert_eq!(cd.remaining_secs(t0 + Duration::from_secs(29)), 1);
        assert_eq!(
            cd.remaining_secs(t0 + Duration::from_millis(29_500)),
            1,
            "partial seconds round up"
        );
        assert_eq!(cd.remaining_secs(t0 + Duration::from_secs(30)), 0);
        assert!(!cd.is_active(t0 + Duration::from_secs(30)));
    }

    #[test]
    fn cooldown_adopts_the_server_provided_length() {
        let t0 = Instant::now();
        let mut cd = OtpCooldown::default();
        cd.start(t0, 12);
        assert_eq!(cd.remaining_secs(t0), 12);
    }
}
