use std::sync::Arc;

use tracing::debug;

use crate::auth::Session;

use super::{GuardDecision, RequireSession, RouteGuard};

/// Every page the shell can render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Login,
    Dashboard,
    Posts,
    Schedules,
    Knowledge,
    Accounts,
}

impl Page {
    /// Pages reachable from the navigation bar, in display order
    pub const NAV: [Page; 5] = [
        Page::Dashboard,
        Page::Posts,
        Page::Schedules,
        Page::Knowledge,
        Page::Accounts,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Page::Login => "/login",
            Page::Dashboard => "/dashboard",
            Page::Posts => "/posts",
            Page::Schedules => "/schedules",
            Page::Knowledge => "/knowledge",
            Page::Accounts => "/accounts",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Login => "Login",
            Page::Dashboard => "Dashboard",
            Page::Posts => "Posts",
            Page::Schedules => "Schedules",
            Page::Knowledge => "Knowledge",
            Page::Accounts => "Accounts",
        }
    }

    /// Next navigation page (wrapping around). Login maps to the first page.
    pub fn next(&self) -> Self {
        match self {
            Page::Login => Page::Dashboard,
            Page::Dashboard => Page::Posts,
            Page::Posts => Page::Schedules,
            Page::Schedules => Page::Knowledge,
            Page::Knowledge => Page::Accounts,
            Page::Accounts => Page::Dashboard,
        }
    }

    /// Previous navigation page (wrapping around). Login maps to the last page.
    pub fn prev(&self) -> Self {
        match self {
            Page::Login => Page::Accounts,
            Page::Dashboard => Page::Accounts,
            Page::Posts => Page::Dashboard,
            Page::Schedules => Page::Posts,
            Page::Knowledge => Page::Schedules,
            Page::Accounts => Page::Knowledge,
        }
    }
}

#[derive(Clone)]
pub enum RouteTarget {
    Page(Page),
    Redirect(String),
}

/// One row of the route table
#[derive(Clone)]
pub struct RouteEntry {
    pub path: String,
    pub target: RouteTarget,
    guards: Vec<Arc<dyn RouteGuard>>,
}

impl RouteEntry {
    pub fn page(path: &str, page: Page) -> Self {
        Self {
            path: normalize_path(path),
            target: RouteTarget::Page(page),
            guards: Vec::new(),
        }
    }

    pub fn redirect(from: &str, to: &str) -> Self {
        Self {
            path: normalize_path(from),
            target: RouteTarget::Redirect(normalize_path(to)),
            guards: Vec::new(),
        }
    }

    /// Wrap this route in another guard. Guards run in the order added.
    pub fn guarded(mut self, guard: Arc<dyn RouteGuard>) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn is_guarded(&self) -> bool {
        !self.guards.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Render(Page),
    Redirect(String),
    NotFound(String),
}

/// Declarative path → page table. Built once at startup.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, entry: RouteEntry) -> Self {
        self.routes.push(entry);
        self
    }

    /// All pages reachable by path, with `/` sending visitors to the
    /// dashboard. No route checks for a session.
    pub fn unguarded() -> Self {
        Self::new()
            .with(RouteEntry::page(Page::Login.path(), Page::Login))
            .with(RouteEntry::page(Page::Dashboard.path(), Page::Dashboard))
            .with(RouteEntry::page(Page::Posts.path(), Page::Posts))
            .with(RouteEntry::page(Page::Schedules.path(), Page::Schedules))
            .with(RouteEntry::page(Page::Knowledge.path(), Page::Knowledge))
            .with(RouteEntry::page(Page::Accounts.path(), Page::Accounts))
            .with(RouteEntry::redirect("/", Page::Dashboard.path()))
    }

    /// Same routes as `unguarded`, but every page except Login requires a session.
    pub fn standard() -> Self {
        let require_session: Arc<dyn RouteGuard> = Arc::new(RequireSession);
        let mut table = Self::new().with(RouteEntry::page(Page::Login.path(), Page::Login));
        for page in Page::NAV {
            table = table.with(RouteEntry::page(page.path(), page).guarded(Arc::clone(&require_session)));
        }
        table.with(RouteEntry::redirect("/", Page::Dashboard.path()))
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// Resolve one step: a page to render, a redirect to follow, or nothing.
    pub fn resolve(&self, path: &str, session: Option<&Session>) -> Resolution {
        let path = normalize_path(path);
        let Some(entry) = self.routes.iter().find(|r| r.path == path) else {
            return Resolution::NotFound(path);
        };

        match &entry.target {
            RouteTarget::Redirect(to) => Resolution::Redirect(to.clone()),
            RouteTarget::Page(page) => {
                for guard in &entry.guards {
                    if let GuardDecision::Redirect(to) = guard.check(*page, session) {
                        debug!(guard = guard.name(), from = %path, to = %to, "Route guard redirected");
                        return Resolution::Redirect(normalize_path(&to));
                    }
                }
                Resolution::Render(*page)
            }
        }
    }
}

/// Canonical form used for matching: leading slash, no trailing slash,
/// no query string or fragment.
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default().trim();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("///"), "/");
        assert_eq!(normalize_path("/posts/"), "/posts");
        assert_eq!(normalize_path("posts"), "/posts");
        assert_eq!(normalize_path("/posts?page=2"), "/posts");
        assert_eq!(normalize_path("/posts#top"), "/posts");
    }

    #[test]
    fn test_standard_table_has_six_routes_and_a_redirect() {
        let table = RouteTable::standard();
        let pages = table
            .entries()
            .iter()
            .filter(|e| matches!(e.target, RouteTarget::Page(_)))
            .count();
        assert_eq!(pages, 6);
        assert_eq!(table.resolve("/", None), Resolution::Redirect("/dashboard".to_string()));
    }

    #[test]
    fn test_standard_table_guards_all_but_login() {
        let table = RouteTable::standard();
        for entry in table.entries() {
            match entry.target {
                RouteTarget::Page(Page::Login) => assert!(!entry.is_guarded()),
                RouteTarget::Page(_) => assert!(entry.is_guarded(), "{} should be guarded", entry.path),
                RouteTarget::Redirect(_) => assert!(!entry.is_guarded()),
            }
        }
    }

    #[test]
    fn test_guarded_route_without_session_redirects_to_login() {
        let table = RouteTable::standard();
        assert_eq!(table.resolve("/posts", None), Resolution::Redirect("/login".to_string()));
        assert_eq!(table.resolve("/login", None), Resolution::Render(Page::Login));

        let session = Session::new("tok");
        assert_eq!(table.resolve("/posts", Some(&session)), Resolution::Render(Page::Posts));
    }

    #[test]
    fn test_unguarded_table_renders_without_session() {
        let table = RouteTable::unguarded();
        for page in Page::NAV {
            assert_eq!(table.resolve(page.path(), None), Resolution::Render(page));
        }
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let table = RouteTable::standard();
        assert_eq!(
            table.resolve("/settings?x=1", None),
            Resolution::NotFound("/settings".to_string())
        );
    }

    #[test]
    fn test_page_next_prev() {
        assert_eq!(Page::Dashboard.next(), Page::Posts);
        assert_eq!(Page::Accounts.next(), Page::Dashboard); // Wraps around
        assert_eq!(Page::Dashboard.prev(), Page::Accounts); // Wraps around
        assert_eq!(Page::Knowledge.prev(), Page::Schedules);
        for page in Page::NAV {
            assert_eq!(page.next().prev(), page);
        }
    }
}
