use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The account behind a session, as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl UserProfile {
    /// Full name when the account has one, otherwise the username.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// Proof of a successful login.
///
/// The access token is opaque to the client and stored as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: None,
            email: None,
            user: None,
            issued_at: Utc::now(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Minutes since the token was issued (never negative).
    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.issued_at).num_minutes().max(0)
    }

    /// Who the session belongs to, for status lines.
    pub fn principal(&self) -> Option<&str> {
        self.user
            .as_ref()
            .map(|u| u.email.as_str())
            .or(self.email.as_deref())
    }
}

/// Email/password pair for a single submit attempt.
///
/// Nothing is validated or normalized here; the server is the only judge.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_credentials_serialize_unmodified() {
        let creds = Credentials::new("  A@B.com ", "");
        let json = serde_json::to_value(&creds).unwrap();
        assert_eq!(json, serde_json::json!({"email": "  A@B.com ", "password": ""}));
    }

    #[test]
    fn test_session_roundtrips_without_optional_fields() {
        let json = r#"{"access_token":"tok123","issued_at":"2026-01-01T00:00:00Z"}"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert_eq!(session.access_token, "tok123");
        assert!(session.user.is_none());
        assert!(session.principal().is_none());
    }

    #[test]
    fn test_session_principal_prefers_profile() {
        let mut session = Session::new("t").with_email("typed@example.com");
        assert_eq!(session.principal(), Some("typed@example.com"));

        session.user = Some(UserProfile {
            id: 1,
            email: "server@example.com".to_string(),
            username: "sam".to_string(),
            full_name: None,
            is_active: None,
            created_at: None,
        });
        assert_eq!(session.principal(), Some("server@example.com"));
    }

    #[test]
    fn test_session_age_minutes() {
        let mut session = Session::new("t");
        assert_eq!(session.age_minutes(), 0);

        session.issued_at = Utc::now() - Duration::minutes(90);
        assert_eq!(session.age_minutes(), 90);

        // Clock skew
        session.issued_at = Utc::now() + Duration::minutes(5);
        assert_eq!(session.age_minutes(), 0);
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let mut user = UserProfile {
            id: 7,
            email: "a@b.com".to_string(),
            username: "ab".to_string(),
            full_name: Some("  ".to_string()),
            is_active: Some(true),
            created_at: None,
        };
        assert_eq!(user.display_name(), "ab");
        user.full_name = Some("Alex Brown".to_string());
        assert_eq!(user.display_name(), "Alex Brown");
    }
}
