use anyhow::{Context, Result};
use keyring::Entry;
use tracing::{debug, warn};

use super::store::origin_key;
use super::{Session, SessionStore};

const SERVICE_NAME: &str = "postagent";

/// Session kept in the OS keychain, one entry per API origin.
///
/// The entry holds the same JSON document the file store writes.
pub struct KeyringSessionStore {
    origin: String,
    entry: Entry,
}

impl KeyringSessionStore {
    /// Open the keychain entry for the origin of `base_url`.
    ///
    /// Fails when the platform keystore cannot be reached, so a session is
    /// never handed to a store that would drop it.
    pub fn for_origin(base_url: &str) -> Result<Self> {
        let origin = origin_key(base_url)?;
        let entry = Entry::new(SERVICE_NAME, &origin).context("Failed to create keyring entry")?;

        match entry.get_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => {}
            Err(e) => {
                return Err(e).context(
                    "No usable OS keychain; set \"session_backend\": \"file\" in the config",
                );
            }
        }

        debug!(origin = %origin, "Keychain session store opened");
        Ok(Self { origin, entry })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    fn load(&self) -> Result<Option<Session>> {
        match self.entry.get_password() {
            Ok(json) => {
                let session = serde_json::from_str(&json).context("Failed to parse keychain session")?;
                Ok(Some(session))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve session from keychain"),
        }
    }
}

impl SessionStore for KeyringSessionStore {
    fn set(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string(session)?;
        self.entry
            .set_password(&json)
            .context("Failed to store session in keychain")?;
        debug!(origin = %self.origin, "Session stored in keychain");
        Ok(())
    }

    fn get(&self) -> Option<Session> {
        match self.load() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, origin = %self.origin, "Keychain session unavailable");
                None
            }
        }
    }

    fn clear(&self) -> Result<()> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Origin no real deployment uses, unique per test process
    fn scratch_origin(tag: &str) -> String {
        format!("http://{}-{}.postagent.invalid", tag, std::process::id())
    }

    /// Open a store, or `None` on machines without a keystore (headless CI)
    fn open(base_url: &str) -> Option<KeyringSessionStore> {
        match KeyringSessionStore::for_origin(base_url) {
            Ok(store) => Some(store),
            Err(e) => {
                eprintln!("skipping keychain test, no keystore: {:#}", e);
                None
            }
        }
    }

    #[test]
    fn test_rejects_url_without_origin() {
        assert!(KeyringSessionStore::for_origin("data:text/plain,hello").is_err());
    }

    #[test]
    fn test_round_trip_and_clear() {
        let Some(store) = open(&scratch_origin("roundtrip")) else {
            return;
        };
        store.clear().unwrap();
        assert!(store.get().is_none());

        store.set(&Session::new("tok123").with_email("a@b.com")).unwrap();
        let session = store.get().unwrap();
        assert_eq!(session.access_token, "tok123");
        assert_eq!(session.email.as_deref(), Some("a@b.com"));

        store.clear().unwrap();
        assert!(store.get().is_none());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_session_visible_to_a_fresh_store() {
        let origin = scratch_origin("reopen");
        let Some(writer) = open(&origin) else {
            return;
        };
        writer.set(&Session::new("persisted")).unwrap();

        // A second store builds its own keyring entry for the same origin
        let reader = KeyringSessionStore::for_origin(&format!("{}/api", origin)).unwrap();
        assert_eq!(reader.origin(), writer.origin());
        assert_eq!(reader.token().as_deref(), Some("persisted"));

        reader.clear().unwrap();
        assert!(writer.get().is_none());
    }
}
