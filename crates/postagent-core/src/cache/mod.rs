//! Shared request cache.
//!
//! This module provides the `RequestCache` that pages use to memoize the
//! results of data-fetching requests. The application shell creates exactly
//! one instance and hands the same `Arc` to every page.
//!
//! Entries are keyed by a query key (e.g. `auth/me`) and considered stale
//! after 5 minutes by default.

pub mod request;

pub use request::{CachedData, RequestCache};
