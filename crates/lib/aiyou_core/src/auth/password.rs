//! Password hashing via bcrypt.

use super::AuthError;

/// bcrypt cost factor used in production.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt at the given cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(password, cost).map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Check a password against a stored hash.
///
/// A hash that bcrypt cannot parse is treated as a mismatch rather than an
/// internal error, so corrupt records simply fail to authenticate.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(ok) => ok,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is unreadable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("p", 4).unwrap();
        assert_ne!(hash, "p");
        assert!(verify_password("p", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn garbage_hash_does_not_verify() {
        assert!(!verify_password("p", "not-a-bcrypt-hash"));
    }
}
