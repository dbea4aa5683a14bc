//! User-facing flows built on the core services.

pub mod login;

pub use login::{LoginFlow, LoginState, SubmitOutcome, LOGIN_SUCCESS_MESSAGE};
