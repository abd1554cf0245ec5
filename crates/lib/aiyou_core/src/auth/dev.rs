//! Development-only escape-hatch identity.
//!
//! Compiled only with the `dev-auth` cargo feature, and then only active
//! when `ALLOW_DEV_AUTH` is set at startup. Tokens whose subject is the
//! escape-hatch username verify as [`super::VerificationOutcome::Elevated`]
//! without a credential store lookup.

use tracing::warn;

/// Operator-configured escape-hatch credentials.
#[derive(Clone)]
pub struct DevAuth {
    username: String,
    password: String,
}

impl std::fmt::Debug for DevAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevAuth")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl DevAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read `ALLOW_DEV_AUTH`, `DEV_AUTH_USERNAME` and `DEV_AUTH_PASSWORD`.
    ///
    /// Returns `None` unless the flag is truthy and both values are non-empty.
    pub fn from_env() -> Option<Self> {
        let enabled = std::env::var("ALLOW_DEV_AUTH")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        if !enabled {
            return None;
        }
        let username = std::env::var("DEV_AUTH_USERNAME").unwrap_or_default();
        let password = std::env::var("DEV_AUTH_PASSWORD").unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            warn!("ALLOW_DEV_AUTH is set but DEV_AUTH_USERNAME/DEV_AUTH_PASSWORD are missing; escape hatch stays off");
            return None;
        }
        warn!(
            username = %username,
            "DEV AUTH ESCAPE HATCH ENABLED: this identity bypasses the credential store. Never run this build in production."
        );
        Some(Self::new(username, password))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn matches_subject(&self, subject: &str) -> bool {
        self.username == subject
    }

    pub fn matches_credentials(&self, email: &str, password: &str) -> bool {
        self.username == email && self.password == password
    }
}
