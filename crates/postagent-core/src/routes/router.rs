use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::auth::SessionStore;

use super::{normalize_path, Page, Resolution, RouteTable};

/// Redirect chains longer than this are treated as a loop
const MAX_REDIRECTS: usize = 8;

/// Anything that can move the user to another path.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);

    /// Path currently displayed
    fn location(&self) -> String;
}

impl<T: Navigator + ?Sized> Navigator for Arc<T> {
    fn navigate(&self, path: &str) {
        (**self).navigate(path)
    }

    fn location(&self) -> String {
        (**self).location()
    }
}

/// What the shell should draw for the current location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Page(Page),
    NotFound,
}

struct RouterState {
    location: String,
    view: View,
    history: Vec<String>,
}

/// Resolves paths through the route table, following redirects and guards,
/// and keeps a back stack of the locations actually shown.
pub struct Router {
    table: RouteTable,
    session: Arc<dyn SessionStore>,
    state: Mutex<RouterState>,
}

impl Router {
    /// New router showing `/`, resolved through the table
    pub fn new(table: RouteTable, session: Arc<dyn SessionStore>) -> Self {
        let router = Self {
            table,
            session,
            state: Mutex::new(RouterState {
                location: "/".to_string(),
                view: View::NotFound,
                history: Vec::new(),
            }),
        };
        let (location, view) = router.resolve("/");
        {
            let mut state = router.state();
            state.location = location;
            state.view = view;
        }
        router
    }

    fn state(&self) -> MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Follow redirects from `path` until something renders.
    /// Returns the final location and what to show there.
    pub fn resolve(&self, path: &str) -> (String, View) {
        let session = self.session.get();
        let mut current = normalize_path(path);

        for _ in 0..=MAX_REDIRECTS {
            match self.table.resolve(&current, session.as_ref()) {
                Resolution::Render(page) => return (current, View::Page(page)),
                Resolution::NotFound(path) => return (path, View::NotFound),
                Resolution::Redirect(to) => {
                    debug!(from = %current, to = %to, "Following redirect");
                    current = to;
                }
            }
        }

        warn!(path = %path, "Redirect loop detected");
        (current, View::NotFound)
    }

    pub fn view(&self) -> View {
        self.state().view.clone()
    }

    pub fn current_page(&self) -> Option<Page> {
        match self.view() {
            View::Page(page) => Some(page),
            View::NotFound => None,
        }
    }

    /// Go back to the previous location, re-checking its guards.
    /// Returns false when there is nothing to go back to.
    pub fn back(&self) -> bool {
        let previous = self.state().history.pop();
        match previous {
            Some(path) => {
                let (location, view) = self.resolve(&path);
                let mut state = self.state();
                state.location = location;
                state.view = view;
                true
            }
            None => false,
        }
    }

    /// Re-run resolution for the current location, e.g. after the session changed
    pub fn refresh(&self) {
        let location = self.location();
        let (location, view) = self.resolve(&location);
        let mut state = self.state();
        state.location = location;
        state.view = view;
    }

    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }
}

impl Navigator for Router {
    fn navigate(&self, path: &str) {
        let (location, view) = self.resolve(path);
        debug!(requested = %path, location = %location, ?view, "Navigated");

        let mut state = self.state();
        if state.location != location {
            let previous = std::mem::replace(&mut state.location, location);
            state.history.push(previous);
        }
        state.view = view;
    }

    fn location(&self) -> String {
        self.state().location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemorySessionStore, Session};
    use crate::routes::RouteEntry;

    fn router(table: RouteTable, session: Option<Session>) -> (Router, Arc<MemorySessionStore>) {
        let store = Arc::new(match session {
            Some(s) => MemorySessionStore::with_session(s),
            None => MemorySessionStore::new(),
        });
        let shared: Arc<dyn SessionStore> = store.clone();
        (Router::new(table, shared), store)
    }

    #[test]
    fn test_root_matches_dashboard_without_session() {
        for table in [RouteTable::unguarded(), RouteTable::standard()] {
            let (r, _) = router(table, None);
            r.navigate("/");
            let from_root = (r.location(), r.view());
            r.navigate("/dashboard");
            let direct = (r.location(), r.view());
            assert_eq!(from_root, direct);
        }
    }

    #[test]
    fn test_root_matches_dashboard_with_session() {
        let (r, _) = router(RouteTable::standard(), Some(Session::new("tok")));
        r.navigate("/");
        assert_eq!(r.location(), "/dashboard");
        assert_eq!(r.current_page(), Some(Page::Dashboard));
    }

    #[test]
    fn test_unguarded_root_lands_on_dashboard() {
        let (r, _) = router(RouteTable::unguarded(), None);
        assert_eq!(r.location(), "/dashboard");
        assert_eq!(r.current_page(), Some(Page::Dashboard));
    }

    #[test]
    fn test_guard_sends_anonymous_user_to_login() {
        let (r, _) = router(RouteTable::standard(), None);
        assert_eq!(r.location(), "/login");

        r.navigate("/accounts");
        assert_eq!(r.location(), "/login");
        assert_eq!(r.current_page(), Some(Page::Login));
    }

    #[test]
    fn test_refresh_after_login_and_revoke() {
        let (r, store) = router(RouteTable::standard(), Some(Session::new("tok")));
        r.navigate("/posts");
        assert_eq!(r.current_page(), Some(Page::Posts));

        store.clear().unwrap();
        r.refresh();
        assert_eq!(r.location(), "/login");
    }

    #[test]
    fn test_not_found() {
        let (r, _) = router(RouteTable::unguarded(), None);
        r.navigate("/nope/");
        assert_eq!(r.location(), "/nope");
        assert_eq!(r.view(), View::NotFound);
    }

    #[test]
    fn test_history_and_back() {
        let (r, _) = router(RouteTable::unguarded(), None);
        r.navigate("/posts");
        r.navigate("/posts");
        r.navigate("/schedules");
        assert_eq!(r.history(), vec!["/dashboard", "/posts"]);

        assert!(r.back());
        assert_eq!(r.location(), "/posts");
        assert!(r.back());
        assert_eq!(r.location(), "/dashboard");
        assert!(!r.back());
    }

    #[test]
    fn test_redirect_loop_is_cut() {
        let table = RouteTable::new()
            .with(RouteEntry::redirect("/a", "/b"))
            .with(RouteEntry::redirect("/b", "/a"));
        let (r, _) = router(table, None);
        r.navigate("/a");
        assert_eq!(r.view(), View::NotFound);
    }
}
