use crate::auth::Session;

use super::Page;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

/// A check run before a route renders.
pub trait RouteGuard: Send + Sync {
    fn check(&self, page: Page, session: Option<&Session>) -> GuardDecision;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Only render for a caller holding a session; everyone else goes to `/login`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireSession;

impl RouteGuard for RequireSession {
    fn check(&self, _page: Page, session: Option<&Session>) -> GuardDecision {
        match session {
            Some(_) => GuardDecision::Allow,
            None => GuardDecision::Redirect(Page::Login.path().to_string()),
        }
    }

    fn name(&self) -> &'static str {
        "require-session"
    }
}
