use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use reqwest::Url;
use tracing::{debug, warn};

use super::Session;

/// Directory under the cache dir holding one session file per API origin
const SESSIONS_DIR: &str = "sessions";

/// Durable holder of the current session.
///
/// `get` never fails: anything that prevents reading a session is logged and
/// reported as "no session". `set` overwrites and `clear` is a no-op when
/// nothing is stored.
pub trait SessionStore: Send + Sync {
    fn set(&self, session: &Session) -> Result<()>;

    fn get(&self) -> Option<Session>;

    fn clear(&self) -> Result<()>;

    /// The raw access token, if a session exists
    fn token(&self) -> Option<String> {
        self.get().map(|s| s.access_token)
    }

    fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn set(&self, session: &Session) -> Result<()> {
        (**self).set(session)
    }

    fn get(&self) -> Option<Session> {
        (**self).get()
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

impl<T: SessionStore + ?Sized> SessionStore for Box<T> {
    fn set(&self, session: &Session) -> Result<()> {
        (**self).set(session)
    }

    fn get(&self) -> Option<Session> {
        (**self).get()
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// Normalize an API base URL into the origin that scopes its session,
/// e.g. `https://api.example.com:8443/v1` becomes `https://api.example.com:8443`.
pub fn origin_key(base_url: &str) -> Result<String> {
    let url = Url::parse(base_url).with_context(|| format!("Invalid API base URL: {}", base_url))?;
    let origin = url.origin();
    if !origin.is_tuple() {
        anyhow::bail!("API base URL has no origin: {}", base_url);
    }
    Ok(origin.ascii_serialization())
}

/// Turn an origin into something safe to use as a file name
fn origin_slug(origin: &str) -> String {
    let mut slug = String::with_capacity(origin.len());
    for c in origin.chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
            slug.push(c);
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_matches('_').to_string()
}

/// Session persisted as JSON in the cache directory.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store scoped to the origin of `base_url` inside `cache_dir`
    pub fn for_origin(cache_dir: &Path, base_url: &str) -> Result<Self> {
        let origin = origin_key(base_url)?;
        let file_name = format!("{}.json", origin_slug(&origin));
        Ok(Self::new(cache_dir.join(SESSIONS_DIR).join(file_name)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path).context("Failed to read session file")?;
        let session: Session = serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(session))
    }
}

impl SessionStore for FileSessionStore {
    fn set(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        let contents = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, contents).context("Failed to write session file")?;
        debug!(path = ?self.path, "Session saved");
        Ok(())
    }

    fn get(&self) -> Option<Session> {
        match self.load() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, path = ?self.path, "Ignoring unreadable session file");
                None
            }
        }
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove session file")?;
            debug!(path = ?self.path, "Session file removed");
        }
        Ok(())
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        // A panic while holding the lock cannot leave a half-written Option
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn set(&self, session: &Session) -> Result<()> {
        *self.slot() = Some(session.clone());
        Ok(())
    }

    fn get(&self) -> Option<Session> {
        self.slot().clone()
    }

    fn clear(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_origin_key() {
        assert_eq!(origin_key("http://localhost:8000").unwrap(), "http://localhost:8000");
        assert_eq!(
            origin_key("https://api.example.com/v1/base").unwrap(),
            "https://api.example.com"
        );
        // Default ports are dropped
        assert_eq!(origin_key("https://api.example.com:443").unwrap(), "https://api.example.com");
        assert!(origin_key("not a url").is_err());
        assert!(origin_key("data:text/plain,hello").is_err());
    }

    #[test]
    fn test_origin_slug() {
        assert_eq!(origin_slug("http://localhost:8000"), "http_localhost_8000");
        assert_eq!(origin_slug("https://api.example.com"), "https_api.example.com");
    }

    #[test]
    fn test_file_store_set_get_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::for_origin(dir.path(), "http://localhost:8000").unwrap();

        assert!(store.get().is_none());
        assert!(!store.is_authenticated());

        store.set(&Session::new("tok123")).unwrap();
        assert_eq!(store.token().as_deref(), Some("tok123"));

        store.clear().unwrap();
        assert!(store.get().is_none());

        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_set_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::for_origin(dir.path(), "http://localhost:8000").unwrap();

        let session = Session::new("tok123");
        store.set(&session).unwrap();
        store.set(&session).unwrap();
        assert_eq!(store.get(), Some(session));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        FileSessionStore::for_origin(dir.path(), "http://localhost:8000")
            .unwrap()
            .set(&Session::new("persisted"))
            .unwrap();

        let reopened = FileSessionStore::for_origin(dir.path(), "http://localhost:8000/api").unwrap();
        assert_eq!(reopened.token().as_deref(), Some("persisted"));
    }

    #[test]
    fn test_file_store_is_origin_scoped() {
        let dir = TempDir::new().unwrap();
        let local = FileSessionStore::for_origin(dir.path(), "http://localhost:8000").unwrap();
        let remote = FileSessionStore::for_origin(dir.path(), "https://posting.example.com").unwrap();

        local.set(&Session::new("local-token")).unwrap();
        assert!(remote.get().is_none());
        assert_ne!(local.path(), remote.path());
    }

    #[test]
    fn test_file_store_corrupt_file_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.get().is_none());
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySessionStore::new();
        assert!(store.get().is_none());

        store.set(&Session::new("a")).unwrap();
        store.set(&Session::new("b")).unwrap();
        assert_eq!(store.token().as_deref(), Some("b"));

        store.clear().unwrap();
        assert!(store.token().is_none());
    }

    #[test]
    fn test_shared_store_through_arc() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let other = Arc::clone(&store);
        store.set(&Session::new("shared")).unwrap();
        assert_eq!(other.token().as_deref(), Some("shared"));
    }
}
