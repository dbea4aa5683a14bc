//! The application shell.
//!
//! `AppShell` is built once at startup. It owns the one `RequestCache`, the
//! notification bus, the router and the login flow, and hands them out to the
//! front end. Nothing here is global; tests build their own shell with fakes.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::{FileSessionStore, KeyringSessionStore, Session, SessionStore, UserProfile};
use crate::cache::RequestCache;
use crate::config::{Config, SessionBackend};
use crate::flow::LoginFlow;
use crate::notify::NotificationBus;
use crate::routes::{Navigator, RouteTable, Router, View};

/// Prefix of the request cache key for the signed-in user's profile
pub const ME_QUERY_PREFIX: &str = "auth/me";

/// Cache key for the profile behind `token`. The token itself never ends up
/// in a key, since keys are logged.
pub fn me_query_key(token: &str) -> String {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    format!("{}/{:016x}", ME_QUERY_PREFIX, hasher.finish())
}

/// Session store wrapper that drops all cached page data whenever the
/// session is replaced or removed. Cached responses belong to one account.
struct CacheScopedStore {
    inner: Arc<dyn SessionStore>,
    cache: Arc<RequestCache>,
}

impl SessionStore for CacheScopedStore {
    fn set(&self, session: &Session) -> Result<()> {
        let unchanged = self
            .inner
            .token()
            .is_some_and(|token| token == session.access_token);
        if !unchanged {
            debug!(entries = self.cache.len(), "Session changed, clearing request cache");
            self.cache.clear();
        }
        self.inner.set(session)
    }

    fn get(&self) -> Option<Session> {
        self.inner.get()
    }

    fn clear(&self) -> Result<()> {
        self.cache.clear();
        self.inner.clear()
    }
}

pub type ShellLoginFlow = LoginFlow<ApiClient, Arc<dyn SessionStore>, Arc<Router>>;

/// Everything a page gets when it renders
pub struct PageContext {
    pub view: View,
    pub location: String,
    pub cache: Arc<RequestCache>,
    pub session: Option<Session>,
}

pub struct AppShell {
    config: Config,
    api: ApiClient,
    session: Arc<dyn SessionStore>,
    cache: Arc<RequestCache>,
    notifications: NotificationBus,
    router: Arc<Router>,
    login: Arc<ShellLoginFlow>,
}

impl AppShell {
    pub fn new(config: Config, session: Arc<dyn SessionStore>) -> Result<Self> {
        let api = ApiClient::new(config.api_base_url())?;
        let cache = Arc::new(RequestCache::new());
        let session: Arc<dyn SessionStore> = Arc::new(CacheScopedStore {
            inner: session,
            cache: Arc::clone(&cache),
        });
        let notifications = NotificationBus::new();

        let table = if config.require_session {
            RouteTable::standard()
        } else {
            RouteTable::unguarded()
        };
        let router = Arc::new(Router::new(table, Arc::clone(&session)));

        let login = Arc::new(LoginFlow::new(
            api.clone(),
            Arc::clone(&session),
            notifications.clone(),
            Arc::clone(&router),
        ));

        info!(
            api = %api.base_url(),
            require_session = config.require_session,
            authenticated = session.is_authenticated(),
            "Application shell ready"
        );

        Ok(Self {
            config,
            api,
            session,
            cache,
            notifications,
            router,
            login,
        })
    }

    /// Open the session store the configuration asks for
    pub fn open_session_store(config: &Config) -> Result<Arc<dyn SessionStore>> {
        let base_url = config.api_base_url();
        let store: Arc<dyn SessionStore> = match config.session_backend {
            SessionBackend::File => Arc::new(FileSessionStore::for_origin(&config.cache_dir()?, base_url)?),
            SessionBackend::Keyring => Arc::new(KeyringSessionStore::for_origin(base_url)?),
        };
        debug!(backend = ?config.session_backend, "Session store opened");
        Ok(store)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    pub fn session(&self) -> Option<Session> {
        self.session.get()
    }

    pub fn cache(&self) -> &Arc<RequestCache> {
        &self.cache
    }

    pub fn notifications(&self) -> &NotificationBus {
        &self.notifications
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn login_flow(&self) -> Arc<ShellLoginFlow> {
        Arc::clone(&self.login)
    }

    pub fn navigate(&self, path: &str) {
        self.router.navigate(path);
    }

    /// Context for rendering whatever the router currently shows
    pub fn page_context(&self) -> PageContext {
        PageContext {
            view: self.router.view(),
            location: self.router.location(),
            cache: Arc::clone(&self.cache),
            session: self.session.get(),
        }
    }

    /// Cache key of the current session's profile, if signed in
    pub fn current_user_key(&self) -> Option<String> {
        self.session.token().map(|token| me_query_key(&token))
    }

    /// Forget the cached profile so the next `current_user` asks the server
    pub fn invalidate_current_user(&self) {
        if let Some(key) = self.current_user_key() {
            self.cache.invalidate(&key);
        }
    }

    /// Profile of the signed-in user, memoized in the request cache under a
    /// key derived from the token.
    ///
    /// A 401 means the server no longer honors the token, so the session is
    /// revoked on the spot.
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let Some(token) = self.session.token() else {
            return Err(ApiError::Unauthorized);
        };

        let key = me_query_key(&token);
        let api = self.api.with_token(token);
        let result = self
            .cache
            .get_or_fetch(&key, move || async move { api.current_user().await })
            .await;

        if let Err(ApiError::Unauthorized) = result {
            self.revoke_session();
        }
        result
    }

    /// End the session: forget the token, drop cached page data and re-run
    /// the route guards for the current location.
    pub fn revoke_session(&self) {
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear session");
        }
        self.router.refresh();
        info!("Session revoked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemorySessionStore;
    use crate::routes::Page;

    fn shell(session: Option<Session>, require_session: bool) -> AppShell {
        let store: Arc<dyn SessionStore> = Arc::new(match session {
            Some(s) => MemorySessionStore::with_session(s),
            None => MemorySessionStore::new(),
        });
        let config = Config {
            api_base_url: Some("http://127.0.0.1:1".to_string()),
            require_session,
            ..Config::default()
        };
        AppShell::new(config, store).unwrap()
    }

    #[test]
    fn test_pages_share_one_cache() {
        let shell = shell(Some(Session::new("tok")), true);
        let first = shell.page_context();
        shell.navigate("/posts");
        let second = shell.page_context();

        assert!(Arc::ptr_eq(&first.cache, &second.cache));
        assert_eq!(first.view, View::Page(Page::Dashboard));
        assert_eq!(second.view, View::Page(Page::Posts));
    }

    #[test]
    fn test_anonymous_start_lands_on_login_when_guarded() {
        let shell = shell(None, true);
        assert_eq!(shell.router().location(), "/login");
        assert!(shell.page_context().session.is_none());
    }

    #[test]
    fn test_anonymous_start_lands_on_dashboard_when_unguarded() {
        let shell = shell(None, false);
        assert_eq!(shell.router().location(), "/dashboard");
    }

    #[test]
    fn test_revoke_clears_session_cache_and_reroutes() {
        let shell = shell(Some(Session::new("tok")), true);
        shell.navigate("/knowledge");
        shell.cache().put("knowledge", &vec!["doc"]).unwrap();

        shell.revoke_session();

        assert!(shell.session().is_none());
        assert!(shell.cache().is_empty());
        assert_eq!(shell.router().location(), "/login");
    }

    #[test]
    fn test_new_session_drops_cached_page_data() {
        let shell = shell(Some(Session::new("alice-token")), true);
        shell.cache().put("posts", &vec!["alice's draft"]).unwrap();

        // Writing the same token back keeps the cache
        shell.session_store().set(&Session::new("alice-token")).unwrap();
        assert_eq!(shell.cache().len(), 1);

        shell.session_store().set(&Session::new("bob-token")).unwrap();
        assert!(shell.cache().is_empty());
        assert_eq!(shell.session().map(|s| s.access_token).as_deref(), Some("bob-token"));
    }

    #[test]
    fn test_profile_key_follows_token() {
        let alice = me_query_key("alice-token");
        let bob = me_query_key("bob-token");
        assert_ne!(alice, bob);
        assert_eq!(alice, me_query_key("alice-token"));
        assert!(alice.starts_with(ME_QUERY_PREFIX));
        assert!(!alice.contains("alice-token"));

        let shell = shell(Some(Session::new("alice-token")), true);
        assert_eq!(shell.current_user_key(), Some(alice));
    }

    #[tokio::test]
    async fn test_current_user_without_session() {
        let shell = shell(None, true);
        assert!(matches!(shell.current_user().await, Err(ApiError::Unauthorized)));
    }
}
