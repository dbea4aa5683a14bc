//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `Session`: The access token issued by the server, plus issue metadata
//! - `Credentials`: The email/password pair typed into the login form
//! - `SessionStore`: Where the session lives between runs, with file,
//!   OS keychain and in-memory backends
//!
//! Sessions are scoped to the API origin so two servers never share a token.
//! There is no client-side expiry; a session ends when it is revoked.

pub mod keychain;
pub mod session;
pub mod store;

pub use keychain::KeyringSessionStore;
pub use session::{Credentials, Session, UserProfile};
pub use store::{origin_key, FileSessionStore, MemorySessionStore, SessionStore};
