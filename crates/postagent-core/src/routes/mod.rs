//! Client-side routing.
//!
//! - `table`: The static path → page table, including the `/` redirect
//! - `guard`: Route guards attached to individual routes
//! - `router`: The `Navigator` that resolves paths and keeps history
//!
//! Guards are attached where the table is built, never inside pages, so a
//! page can assume its preconditions hold when it renders.

pub mod guard;
pub mod router;
pub mod table;

pub use guard::{GuardDecision, RequireSession, RouteGuard};
pub use router::{Navigator, Router, View};
pub use table::{normalize_path, Page, Resolution, RouteEntry, RouteTable, RouteTarget};
