//! Permission policy: verification outcome → capability set.
//!
//! Pure functions only. Permissions are never stored; they are recomputed
//! from the token on every request.

use serde::Serialize;

/// Successful result of verifying a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The "no token supplied" placeholder.
    Sentinel,
    /// The development escape-hatch identity.
    Elevated,
    /// A stored, unexpired user token.
    Valid { email: String, expiry: i64 },
}

/// The four independent capabilities granted to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionSet {
    pub allow_create: bool,
    pub allow_index: bool,
    pub allow_user_calls: bool,
    pub auto_refresh: bool,
}

impl PermissionSet {
    /// Anonymous access: sign-up only.
    pub const NULL: PermissionSet = PermissionSet {
        allow_create: true,
        allow_index: false,
        allow_user_calls: false,
        auto_refresh: false,
    };

    /// Everything except auto-refresh; this tier must re-authenticate.
    pub const ELEVATED: PermissionSet = PermissionSet {
        allow_create: true,
        allow_index: true,
        allow_user_calls: true,
        auto_refresh: false,
    };

    /// A regular user, with auto-refresh decided by expiry proximity.
    pub fn authenticated(auto_refresh: bool) -> Self {
        PermissionSet {
            allow_create: false,
            allow_index: false,
            allow_user_calls: true,
            auto_refresh,
        }
    }
}

/// Sliding-window renewal check.
///
/// Eligible iff `expiry - window < now <= expiry`; an expired token is never
/// eligible and must re-authenticate.
pub fn refresh_eligible(expiry: i64, now: i64, window: i64) -> bool {
    now <= expiry && now > expiry - window
}

/// Map a verification outcome to its permission set.
pub fn permissions_for(outcome: &VerificationOutcome, now: i64, window: i64) -> PermissionSet {
    match outcome {
        VerificationOutcome::Sentinel => PermissionSet::NULL,
        VerificationOutcome::Elevated => PermissionSet::ELEVATED,
        VerificationOutcome::Valid { expiry, .. } => {
            PermissionSet::authenticated(refresh_eligible(*expiry, now, window))
        }
    }
}
