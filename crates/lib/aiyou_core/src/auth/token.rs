//! Token service: issue, verify and refresh signed, time-limited tokens.
//!
//! A token is valid only while it is the `token` currently stored on its
//! owner's record. Issuing a new token for a user therefore invalidates the
//! previous one (last writer wins), which gives one active session per user
//! without extra bookkeeping.

use std::sync::Arc;

use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
#[cfg(feature = "dev-auth")]
use super::dev::DevAuth;
use super::jwt::{self, TokenClaims};
use super::policy::{self, PermissionSet, VerificationOutcome};
use super::store::CredentialStore;
use super::AuthError;

/// Well-known placeholder meaning "no token supplied".
pub const NULL_TOKEN: &str = "NULL";

/// Token lifetime settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenConfig {
    /// Fixed validity window of a freshly issued token.
    pub lifetime_secs: i64,
    /// Final stretch of validity during which requests auto-refresh.
    pub refresh_window_secs: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            lifetime_secs: 30 * 60,
            refresh_window_secs: 5 * 60,
        }
    }
}

/// Issues, verifies and refreshes tokens against a credential store.
#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn CredentialStore>,
    secret: Arc<[u8]>,
    config: TokenConfig,
    clock: Arc<dyn Clock>,
    #[cfg(feature = "dev-auth")]
    dev_auth: Option<DevAuth>,
}

impl TokenService {
    pub fn new(store: Arc<dyn CredentialStore>, secret: &[u8], config: TokenConfig) -> Self {
        Self {
            store,
            secret: Arc::from(secret),
            config,
            clock: Arc::new(SystemClock),
            #[cfg(feature = "dev-auth")]
            dev_auth: None,
        }
    }

    /// Replace the wall clock (tests drive expiry with a manual clock).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[cfg(feature = "dev-auth")]
    pub fn with_dev_auth(mut self, dev_auth: Option<DevAuth>) -> Self {
        self.dev_auth = dev_auth;
        self
    }

    #[cfg(feature = "dev-auth")]
    pub fn dev_auth(&self) -> Option<&DevAuth> {
        self.dev_auth.as_ref()
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn config(&self) -> TokenConfig {
        self.config
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Sign a fresh token for `email` without storing it.
    pub fn mint(&self, email: &str) -> Result<String, AuthError> {
        let claims = TokenClaims::new(email, self.now(), self.config.lifetime_secs);
        jwt::sign(&claims, &self.secret)
    }

    /// Sign a fresh token and make it the user's single active token.
    pub async fn issue(&self, email: &str) -> Result<String, AuthError> {
        let token = self.mint(email)?;
        if !self.store.set_token(email, &token).await? {
            return Err(AuthError::UserNotFound(email.to_string()));
        }
        debug!(email, "issued token");
        trace!(email, token = %token, "issued token value");
        Ok(token)
    }

    /// Verify a token: signature, escape hatch, store existence, then expiry.
    pub async fn verify(&self, token: &str) -> Result<VerificationOutcome, AuthError> {
        if token == NULL_TOKEN {
            return Ok(VerificationOutcome::Sentinel);
        }

        let claims = jwt::decode_claims(token, &self.secret)?;

        #[cfg(feature = "dev-auth")]
        {
            if let Some(dev) = &self.dev_auth
                && dev.matches_subject(&claims.sub)
            {
                tracing::warn!(subject = %claims.sub, "escape-hatch token accepted");
                return Ok(VerificationOutcome::Elevated);
            }
        }

        let user = self
            .store
            .find_by_token(token)
            .await?
            .ok_or(AuthError::Invalid)?;

        if self.now() > claims.exp {
            return Err(AuthError::Expired);
        }

        Ok(VerificationOutcome::Valid {
            email: user.email,
            expiry: claims.exp,
        })
    }

    /// Permission set for an outcome, evaluated at the current time.
    pub fn permissions(&self, outcome: &VerificationOutcome) -> PermissionSet {
        policy::permissions_for(outcome, self.now(), self.config.refresh_window_secs)
    }

    /// Replace `token` with a newly issued one for the same owner.
    ///
    /// Expiry is not re-checked; callers only refresh after the permission
    /// policy reported the token as refresh-eligible.
    pub async fn refresh(&self, token: &str) -> Result<String, AuthError> {
        let user = self
            .store
            .find_by_token(token)
            .await?
            .ok_or(AuthError::OrphanToken)?;
        self.issue(&user.email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use crate::auth::memory::MemoryCredentialStore;
    use crate::auth::store::UserRecord;

    const START: i64 = 1_700_000_000;

    async fn service_with_user(email: &str) -> (TokenService, Arc<ManualClock>) {
        let store = Arc::new(MemoryCredentialStore::new());
        store
            .create(UserRecord {
                email: email.to_string(),
                password_hash: "hash".into(),
                token: None,
            })
            .await
            .unwrap();
        let clock = Arc::new(ManualClock::new(START));
        let service = TokenService::new(store, b"test-secret", TokenConfig::default())
            .with_clock(clock.clone());
        (service, clock)
    }

    #[tokio::test]
    async fn sentinel_short_circuits() {
        let (service, _) = service_with_user("a@x.com").await;
        assert_eq!(
            service.verify(NULL_TOKEN).await.unwrap(),
            VerificationOutcome::Sentinel
        );
    }

    #[tokio::test]
    async fn issued_token_verifies_as_valid() {
        let (service, _) = service_with_user("a@x.com").await;
        let token = service.issue("a@x.com").await.unwrap();
        let outcome = service.verify(&token).await.unwrap();
        assert_eq!(
            outcome,
            VerificationOutcome::Valid {
                email: "a@x.com".into(),
                expiry: START + 1_800,
            }
        );
        let perms = service.permissions(&outcome);
        assert!(perms.allow_user_calls);
        assert!(!perms.auto_refresh);
    }

    #[tokio::test]
    async fn issue_for_unknown_user_fails() {
        let (service, _) = service_with_user("a@x.com").await;
        let err = service.issue("ghost@x.com").await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn well_signed_but_unstored_token_is_invalid() {
        let (service, _) = service_with_user("a@x.com").await;
        let forged = service.mint("a@x.com").unwrap();
        assert!(matches!(
            service.verify(&forged).await,
            Err(AuthError::Invalid)
        ));
    }

    #[tokio::test]
    async fn superseded_token_is_invalid() {
        let (service, _) = service_with_user("a@x.com").await;
        let first = service.issue("a@x.com").await.unwrap();
        let second = service.issue("a@x.com").await.unwrap();
        assert_ne!(first, second);
        assert!(matches!(service.verify(&first).await, Err(AuthError::Invalid)));
        assert!(service.verify(&second).await.is_ok());
    }

    #[tokio::test]
    async fn stored_token_past_expiry_is_expired() {
        let (service, clock) = service_with_user("a@x.com").await;
        let token = service.issue("a@x.com").await.unwrap();
        clock.advance(1_801);
        assert!(matches!(service.verify(&token).await, Err(AuthError::Expired)));
    }

    #[tokio::test]
    async fn garbage_token_is_malformed() {
        let (service, _) = service_with_user("a@x.com").await;
        assert!(matches!(
            service.verify("garbage").await,
            Err(AuthError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn verify_is_side_effect_free() {
        let (service, _) = service_with_user("a@x.com").await;
        let token = service.issue("a@x.com").await.unwrap();
        let first = service.verify(&token).await.unwrap();
        let second = service.verify(&token).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(service.permissions(&first), service.permissions(&second));
    }

    #[tokio::test]
    async fn auto_refresh_offered_only_in_final_window() {
        let (service, clock) = service_with_user("a@x.com").await;
        let token = service.issue("a@x.com").await.unwrap();

        clock.set(START + 1_800 - 300);
        let outcome = service.verify(&token).await.unwrap();
        assert!(!service.permissions(&outcome).auto_refresh);

        clock.set(START + 1_800 - 299);
        let outcome = service.verify(&token).await.unwrap();
        assert!(service.permissions(&outcome).auto_refresh);

        clock.set(START + 1_800);
        let outcome = service.verify(&token).await.unwrap();
        assert!(service.permissions(&outcome).auto_refresh);
    }

    #[tokio::test]
    async fn refresh_supersedes_old_token() {
        let (service, clock) = service_with_user("a@x.com").await;
        let old = service.issue("a@x.com").await.unwrap();
        clock.advance(1_700);

        let new = service.refresh(&old).await.unwrap();
        assert_ne!(old, new);
        assert!(matches!(service.verify(&old).await, Err(AuthError::Invalid)));
        match service.verify(&new).await.unwrap() {
            VerificationOutcome::Valid { expiry, .. } => assert_eq!(expiry, START + 1_700 + 1_800),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_of_orphan_token_fails() {
        let (service, _) = service_with_user("a@x.com").await;
        let orphan = service.mint("a@x.com").unwrap();
        assert!(matches!(
            service.refresh(&orphan).await,
            Err(AuthError::OrphanToken)
        ));
    }

    #[cfg(feature = "dev-auth")]
    #[tokio::test]
    async fn escape_hatch_subject_is_elevated_without_store_record() {
        let (service, _) = service_with_user("a@x.com").await;
        let service = service.with_dev_auth(Some(DevAuth::new("dev", "devpass")));
        let token = service.mint("dev").unwrap();
        let outcome = service.verify(&token).await.unwrap();
        assert_eq!(outcome, VerificationOutcome::Elevated);
        assert_eq!(service.permissions(&outcome), PermissionSet::ELEVATED);
    }
}
