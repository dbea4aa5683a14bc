//! Core library for the Posting Agent client.
//!
//! This crate holds everything the front ends share:
//!
//! - `api`: HTTP client for the Posting Agent auth endpoints
//! - `auth`: Session model and the persistent `SessionStore` backends
//! - `notify`: Transient toast notifications
//! - `cache`: The shared request cache handed to every page
//! - `routes`: Route table, route guards and the history-keeping router
//! - `flow`: The login state machine
//! - `shell`: `AppShell`, which wires all of the above together
//! - `config`: On-disk configuration

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod flow;
pub mod notify;
pub mod routes;
pub mod shell;

pub use api::{ApiClient, ApiError, AuthError, Authenticator};
pub use auth::{Credentials, Session, SessionStore};
pub use config::Config;
pub use flow::{LoginFlow, LoginState, SubmitOutcome};
pub use notify::{Notification, NotificationBus, NotificationKind};
pub use routes::{Navigator, Page, RouteTable, Router};
pub use shell::AppShell;
