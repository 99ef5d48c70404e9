//! Operator authentication and session context
//!
//! The workflow never looks at ambient login state; callers pass a
//! [`SessionContext`] obtained from a [`CredentialVerifier`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Username/password pair submitted at login.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Capability check for operator credentials.
pub trait CredentialVerifier: Send + Sync {
    fn authenticate(&self, credentials: &Credentials) -> bool;
}

/// Verifier backed by a fixed table of SHA-256 password digests.
///
/// Usernames match case-insensitively; the config loader lowercases map keys.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialVerifier {
    digests: HashMap<String, String>,
}

impl StaticCredentialVerifier {
    /// `digests` maps username to the lowercase hex SHA-256 of the password
    pub fn new(digests: HashMap<String, String>) -> Self {
        let digests = digests
            .into_iter()
            .map(|(user, digest)| {
                (normalize_username(&user), digest.trim().to_ascii_lowercase())
            })
            .collect();
        Self { digests }
    }

    pub fn user_count(&self) -> usize {
        self.digests.len()
    }
}

impl CredentialVerifier for StaticCredentialVerifier {
    fn authenticate(&self, credentials: &Credentials) -> bool {
        match self.digests.get(&normalize_username(&credentials.username)) {
            Some(expected) => *expected == password_digest(&credentials.password),
            None => false,
        }
    }
}

fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Lowercase hex SHA-256 of a password
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// An authenticated operator session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub username: String,
    pub authenticated_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            username: username.into(),
            authenticated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> StaticCredentialVerifier {
        let mut digests = HashMap::new();
        digests.insert("admin".to_string(), password_digest("password123").to_uppercase());
        StaticCredentialVerifier::new(digests)
    }

    fn creds(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_password_digest_is_hex_sha256() {
        assert_eq!(
            password_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_static_verifier() {
        let verifier = verifier();
        assert!(verifier.authenticate(&creds("admin", "password123")));
        assert!(!verifier.authenticate(&creds("admin", "password1")));
        assert!(!verifier.authenticate(&creds("nobody", "password123")));
        assert_eq!(verifier.user_count(), 1);
    }

    #[test]
    fn test_usernames_match_case_insensitively() {
        let mut digests = HashMap::new();
        digests.insert("Operator".to_string(), password_digest("s3cret"));
        let verifier = StaticCredentialVerifier::new(digests);

        assert!(verifier.authenticate(&creds("Operator", "s3cret")));
        assert!(verifier.authenticate(&creds("operator", "s3cret")));
        assert!(verifier.authenticate(&creds("OPERATOR", "s3cret")));
        assert!(!verifier.authenticate(&creds("Operator", "S3CRET")));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let rendered = format!("{:?}", creds("admin", "hunter2"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_sessions_are_distinct() {
        let a = SessionContext::new("admin");
        let b = SessionContext::new("admin");
        assert_ne!(a.session_id, b.session_id);
        assert_eq!(a.username, "admin");
    }
}
