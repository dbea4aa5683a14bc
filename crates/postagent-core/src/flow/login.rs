//! The login state machine.
//!
//! `Idle → Submitting → Authenticated`, or back to `Idle` after a failure.
//! Only one submission may be in flight per flow; a second submit while the
//! first is pending is turned away without touching the network.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::api::{AuthError, Authenticator};
use crate::auth::{Credentials, SessionStore};
use crate::notify::NotificationBus;
use crate::routes::{Navigator, Page};

pub const LOGIN_SUCCESS_MESSAGE: &str = "Logged in successfully";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    Submitting,
    Authenticated,
}

/// What a call to `LoginFlow::submit` ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Authenticated,
    /// The server refused; carries the message that was shown
    Rejected(String),
    ConnectionFailed,
    /// Another submission was still in flight; nothing was sent
    Busy,
}

/// Holds the in-flight slot for one submission. Whatever happens to the
/// submit future, dropping this puts the flow back into a usable state.
struct InFlight<'a> {
    state: &'a Mutex<LoginState>,
    next: LoginState,
}

impl InFlight<'_> {
    fn finish(mut self, next: LoginState) {
        self.next = next;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = self.next;
    }
}

pub struct LoginFlow<A, S, N> {
    auth: A,
    store: S,
    notifications: NotificationBus,
    navigator: N,
    state: Mutex<LoginState>,
}

impl<A, S, N> LoginFlow<A, S, N>
where
    A: Authenticator,
    S: SessionStore,
    N: Navigator,
{
    pub fn new(auth: A, store: S, notifications: NotificationBus, navigator: N) -> Self {
        Self {
            auth,
            store,
            notifications,
            navigator,
            state: Mutex::new(LoginState::Idle),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LoginState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> LoginState {
        *self.lock_state()
    }

    pub fn is_submitting(&self) -> bool {
        self.state() == LoginState::Submitting
    }

    /// Claim the in-flight slot, or `None` if a submission is pending
    fn begin(&self) -> Option<InFlight<'_>> {
        let mut state = self.lock_state();
        if *state == LoginState::Submitting {
            return None;
        }
        let previous = *state;
        *state = LoginState::Submitting;
        Some(InFlight {
            state: &self.state,
            next: previous,
        })
    }

    /// Submit the login form.
    ///
    /// On success the session is stored, a success toast is published and the
    /// user is sent to the dashboard, in that order. Failures only produce an
    /// error toast and leave the flow idle for another attempt.
    pub async fn submit(&self, credentials: Credentials) -> SubmitOutcome {
        let Some(in_flight) = self.begin() else {
            debug!(email = %credentials.email, "Login already in progress, ignoring submit");
            return SubmitOutcome::Busy;
        };

        let result = self.auth.authenticate(&credentials).await;

        match result {
            Ok(session) => {
                if let Err(e) = self.store.set(&session) {
                    warn!(error = %e, "Failed to save session");
                }
                self.notifications.success(LOGIN_SUCCESS_MESSAGE);
                self.navigator.navigate(Page::Dashboard.path());
                in_flight.finish(LoginState::Authenticated);
                info!(email = %credentials.email, "Login successful");
                SubmitOutcome::Authenticated
            }
            Err(AuthError::Rejected(message)) => {
                self.notifications.error(message.clone());
                in_flight.finish(LoginState::Idle);
                SubmitOutcome::Rejected(message)
            }
            Err(err @ AuthError::Connection(_)) => {
                self.notifications.error(err.to_string());
                in_flight.finish(LoginState::Idle);
                SubmitOutcome::ConnectionFailed
            }
        }
    }
}
