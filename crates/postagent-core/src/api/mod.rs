//! REST API client module for the Posting Agent backend.
//!
//! This module provides the `ApiClient` for the `/api/auth` endpoints and the
//! `Authenticator` seam the login flow is written against.
//!
//! The backend issues bearer tokens from `POST /api/auth/login`; the same token
//! is sent back on every authenticated request.

pub mod client;
pub mod error;

pub use client::{ApiClient, Authenticator, Registration};
pub use error::{ApiError, AuthError};
