//! Cache types for Moorline API read responses.

use std::hash::{Hash, Hasher};

use moorline_core::OrgId;

use crate::api::types::{
    AdminOrg, AdminUser, BillingStatus, CurrentUserProfile, Invite, Member, OrgRequest,
};

/// Cache key: operation name plus its parameters.
///
/// User-scoped entries are keyed by a token fingerprint rather than the
/// token itself so the secret never sits in a cache key.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Me { token: u64 },
    Billing { org: OrgId },
    Members { org: OrgId },
    Invites { org: OrgId },
    OrgRequests,
    AdminOrgs,
    AdminOrg { org: OrgId },
    AdminUsers,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Me(Box<CurrentUserProfile>),
    Billing(Box<BillingStatus>),
    Members(Vec<Member>),
    Invites(Vec<Invite>),
    OrgRequests(Vec<OrgRequest>),
    AdminOrgs(Vec<AdminOrg>),
    AdminOrg(Box<AdminOrg>),
    AdminUsers(Vec<AdminUser>),
}

/// Non-cryptographic fingerprint of a bearer token, for cache keying only.
#[must_use]
pub fn token_fingerprint(token: &str) -> u64 {
    let mut hasher = std::hash::DefaultHasher::new();
    token.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_fingerprint_is_stable() {
        assert_eq!(token_fingerprint("abc"), token_fingerprint("abc"));
        assert_ne!(token_fingerprint("abc"), token_fingerprint("abd"));
    }

    #[test]
    fn test_cache_key_equality() {
        assert_eq!(
            CacheKey::Billing { org: OrgId::new(1) },
            CacheKey::Billing { org: OrgId::new(1) }
        );
        assert_ne!(
            CacheKey::Billing { org: OrgId::new(1) },
            CacheKey::Members { org: OrgId::new(1) }
        );
    }
}
