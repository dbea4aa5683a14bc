//! Application state management for the Posting Agent TUI.
//!
//! This module contains the `App` struct that holds UI state (login form,
//! address prompt, overlays) on top of the `AppShell`, and coordinates the
//! background tasks that talk to the server.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use postagent_core::auth::UserProfile;
use postagent_core::routes::{Navigator, View};
use postagent_core::{AppShell, Config, Credentials, Page, SubmitOutcome};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 16;

/// Maximum length for email input.
const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for a path typed into the address prompt.
const MAX_PATH_LENGTH: usize = 128;

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    EditingPath,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Email,
    Password,
    Button,
}

impl LoginFocus {
    pub fn next(&self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Email,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            LoginFocus::Email => LoginFocus::Button,
            LoginFocus::Password => LoginFocus::Email,
            LoginFocus::Button => LoginFocus::Password,
        }
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Messages sent from spawned tasks back to the UI loop.
enum BackgroundEvent {
    /// A login submission finished (or was turned away as busy)
    LoginFinished { email: String, outcome: SubmitOutcome },
    /// Profile fetched under the given cache key
    UserLoaded { key: String, user: UserProfile },
    /// Profile fetch failed; the message is for the status bar
    UserFailed(String),
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    pub shell: Arc<AppShell>,

    pub state: AppState,

    // Login form state
    pub login_email: String,
    pub login_password: String,
    pub login_focus: LoginFocus,

    // Address prompt
    pub path_input: String,

    pub current_user: Option<UserProfile>,
    pub status_message: Option<String>,

    events_tx: mpsc::Sender<BackgroundEvent>,
    events_rx: mpsc::Receiver<BackgroundEvent>,
}

impl App {
    /// Create a new application instance on top of a ready shell
    pub fn with_shell(shell: Arc<AppShell>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        // Prefill from env vars or config
        let login_email = std::env::var("POSTAGENT_EMAIL")
            .ok()
            .or_else(|| shell.config().last_email.clone())
            .unwrap_or_default();
        let login_password = std::env::var("POSTAGENT_PASSWORD").unwrap_or_default();

        let login_focus = if login_email.is_empty() {
            LoginFocus::Email
        } else {
            LoginFocus::Password
        };

        Self {
            shell,
            state: AppState::Normal,
            login_email,
            login_password,
            login_focus,
            path_input: String::new(),
            current_user: None,
            status_message: None,
            events_tx,
            events_rx,
        }
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn view(&self) -> View {
        self.shell.router().view()
    }

    pub fn location(&self) -> String {
        self.shell.router().location()
    }

    pub fn is_on_login(&self) -> bool {
        self.view() == View::Page(Page::Login)
    }

    pub fn navigate(&mut self, path: &str) {
        self.shell.navigate(path);
        self.status_message = None;
        if self.view() == View::Page(Page::Dashboard) {
            self.load_current_user();
        }
    }

    pub fn next_page(&mut self) {
        let next = self.shell.router().current_page().unwrap_or(Page::Login).next();
        self.navigate(next.path());
    }

    pub fn prev_page(&mut self) {
        let prev = self.shell.router().current_page().unwrap_or(Page::Login).prev();
        self.navigate(prev.path());
    }

    pub fn go_back(&mut self) {
        if !self.shell.router().back() {
            self.status_message = Some("Nothing to go back to".to_string());
        }
    }

    pub fn start_path_input(&mut self) {
        self.path_input = self.location();
        self.state = AppState::EditingPath;
    }

    pub fn submit_path_input(&mut self) {
        let path = std::mem::take(&mut self.path_input);
        self.state = AppState::Normal;
        self.navigate(&path);
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub fn is_authenticated(&self) -> bool {
        self.shell.session().is_some()
    }

    pub fn is_submitting(&self) -> bool {
        self.shell.login_flow().is_submitting()
    }

    /// Submit the login form. The request runs as a background task; the
    /// outcome arrives through `check_background_tasks`.
    pub fn submit_login(&mut self) {
        let flow = self.shell.login_flow();
        let credentials = Credentials::new(self.login_email.clone(), self.login_password.clone());
        let email = credentials.email.clone();
        let tx = self.events_tx.clone();

        tokio::spawn(async move {
            let outcome = flow.submit(credentials).await;
            Self::send_event(&tx, BackgroundEvent::LoginFinished { email, outcome }).await;
        });
    }

    fn on_login_finished(&mut self, email: String, outcome: SubmitOutcome) {
        debug!(?outcome, "Login finished");
        match outcome {
            SubmitOutcome::Authenticated => {
                self.login_password.clear();
                self.login_focus = LoginFocus::Email;

                if let Err(e) = Config::remember_email(&email) {
                    warn!(error = %e, "Failed to save config");
                }

                // The shell already dropped the previous account's cache
                self.current_user = None;
                self.load_current_user();
            }
            SubmitOutcome::Busy => {
                self.status_message = Some("Already signing in...".to_string());
            }
            SubmitOutcome::Rejected(_) | SubmitOutcome::ConnectionFailed => {
                self.login_focus = LoginFocus::Password;
            }
        }
    }

    /// Fetch the signed-in user's profile in the background
    pub fn load_current_user(&mut self) {
        let Some(key) = self.shell.current_user_key() else {
            return;
        };

        let shell = Arc::clone(&self.shell);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match shell.current_user().await {
                Ok(user) => BackgroundEvent::UserLoaded { key, user },
                Err(e) => BackgroundEvent::UserFailed(e.to_string()),
            };
            Self::send_event(&tx, event).await;
        });
    }

    /// Show a fetched profile unless the session changed while it was in flight
    fn on_user_loaded(&mut self, key: String, user: UserProfile) {
        if self.shell.current_user_key().as_deref() != Some(key.as_str()) {
            debug!(user = %user.email, "Dropping profile of a previous session");
            return;
        }
        info!(user = %user.email, "Profile loaded");
        self.current_user = Some(user);
    }

    pub fn reload_current_user(&mut self) {
        self.shell.invalidate_current_user();
        self.load_current_user();
    }

    // =========================================================================
    // Background Tasks
    // =========================================================================

    /// Helper to send background results, logging any channel errors
    async fn send_event(tx: &mpsc::Sender<BackgroundEvent>, event: BackgroundEvent) {
        if tx.send(event).await.is_err() {
            debug!("UI loop gone, dropping background result");
        }
    }

    /// Apply everything background tasks have reported since the last frame
    pub fn check_background_tasks(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                BackgroundEvent::LoginFinished { email, outcome } => {
                    self.on_login_finished(email, outcome);
                }
                BackgroundEvent::UserLoaded { key, user } => {
                    self.on_user_loaded(key, user);
                }
                BackgroundEvent::UserFailed(message) => {
                    warn!(error = %message, "Failed to load profile");
                    if !self.is_authenticated() {
                        // The shell revoked the session
                        self.current_user = None;
                        self.shell.notifications().error("Session expired, please log in again");
                    }
                    self.status_message = Some(message);
                }
            }
        }
    }
}

// ============================================================================
// Input Validation
// ============================================================================

/// Check if a character is valid for text input (printable, non-control)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if an email character should be accepted
pub fn can_add_email_char(current_len: usize, c: char) -> bool {
    current_len < MAX_EMAIL_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

/// Check if an address prompt character should be accepted
pub fn can_add_path_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PATH_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

// ============================================================================
// Tests
// ============================================================================
