//! Wire types for the Moorline REST API.
//!
//! Field names and shapes follow the backend exactly. Everything here is a
//! transient read-through copy; the backend owns all of these entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use moorline_core::{
    BillingOverride, Email, InviteId, MembershipId, MembershipStatus, OrgBilling, OrgId,
    OrgRequestId, OrgRole, RequestStatus, UserId, VesselId,
};

// =============================================================================
// Current user
// =============================================================================

/// A user as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiUser {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub is_super_admin: bool,
}

/// One of the current user's organization memberships.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub org_id: OrgId,
    pub org_name: String,
    pub role: OrgRole,
    pub status: MembershipStatus,
}

/// Response of `GET /api/me`: identity plus memberships.
///
/// The backend creates the user row on the first authenticated call, so
/// this is also the "get or create" entry point after sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUserProfile {
    pub user: ApiUser,
    pub memberships: Vec<Membership>,
}

impl CurrentUserProfile {
    /// Memberships with `ACTIVE` status, the only ones that grant access.
    #[must_use]
    pub fn active_memberships(&self) -> Vec<&Membership> {
        self.memberships
            .iter()
            .filter(|m| m.status.is_active())
            .collect()
    }

    /// The user's active membership in `org`, if any.
    #[must_use]
    pub fn membership_in(&self, org: OrgId) -> Option<&Membership> {
        self.memberships
            .iter()
            .find(|m| m.org_id == org && m.status.is_active())
    }
}

// =============================================================================
// Billing
// =============================================================================

/// Vessel usage block of the billing status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselUsage {
    pub current: u32,
    pub limit: Option<u32>,
}

/// Billing override block of the billing status response.
///
/// `active` is the backend's own evaluation at response time; pages
/// re-derive activity locally from the full override fields where those
/// are available (super-admin views).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideStatus {
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Response of `GET /api/billing/status` (org-scoped, admin only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingStatus {
    pub org_id: OrgId,
    pub org_name: String,
    pub plan: Option<String>,
    pub status: Option<String>,
    pub vessel_limit: Option<u32>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub vessel_usage: VesselUsage,
    pub billing_override: OverrideStatus,
}

impl BillingStatus {
    /// Effective vessel limit: the override expiry is opaque here, so we
    /// trust the backend's `active` flag and the usage block it computed.
    #[must_use]
    pub const fn effective_limit(&self) -> Option<u32> {
        self.vessel_usage.limit
    }
}

/// Response of the checkout-session and portal endpoints: a provider URL
/// to redirect the browser to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSession {
    pub url: String,
}

// =============================================================================
// Organization administration
// =============================================================================

/// A member row of `GET /api/orgs/{org}/members`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub membership_id: MembershipId,
    pub user_id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub role: OrgRole,
    pub status: MembershipStatus,
}

/// A pending or settled invite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    pub id: InviteId,
    pub email: Email,
    pub role: OrgRole,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Invite {
    /// An invite is open while unaccepted, unrevoked, and unexpired.
    #[must_use]
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.accepted_at.is_none() && self.revoked_at.is_none() && self.expires_at > now
    }
}

/// The requester block of an organization request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requester {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
}

/// An organization create/join request under review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgRequest {
    pub id: OrgRequestId,
    pub org_name: String,
    pub requested_by: Requester,
    pub status: RequestStatus,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Super-admin console
// =============================================================================

/// An organization row from the super-admin endpoints, with the raw
/// billing override fields (unlike [`BillingStatus`], which only carries
/// the backend's evaluation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminOrg {
    pub id: OrgId,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub vessel_count: u32,
    pub subscription_plan: Option<String>,
    pub subscription_status: Option<String>,
    pub vessel_limit: Option<u32>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub billing_override_enabled: bool,
    pub billing_override_vessel_limit: Option<u32>,
    pub billing_override_expires_at: Option<DateTime<Utc>>,
    pub billing_override_reason: Option<String>,
}

impl AdminOrg {
    /// The organization's billing override fields as a core predicate input.
    #[must_use]
    pub fn billing_override(&self) -> BillingOverride {
        BillingOverride {
            enabled: self.billing_override_enabled,
            vessel_limit: self.billing_override_vessel_limit,
            expires_at: self.billing_override_expires_at,
            reason: self.billing_override_reason.clone(),
        }
    }

    /// Billing-relevant fields for effective-entitlement resolution.
    #[must_use]
    pub fn billing(&self) -> OrgBilling {
        OrgBilling {
            subscription_status: self.subscription_status.clone(),
            plan_vessel_limit: self.vessel_limit,
            billing_override: self.billing_override(),
        }
    }
}

/// A user row of `GET /api/admin/users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: UserId,
    pub email: Email,
    pub name: Option<String>,
    pub is_super_admin: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Bulk import
// =============================================================================

/// One created row of an import report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedVessel {
    pub id: VesselId,
    pub name: String,
}

/// One failed row of an import report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRowError {
    pub row: u32,
    pub error: String,
}

/// Response of the bulk import endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub success: bool,
    pub created_count: u32,
    pub error_count: u32,
    pub created: Vec<ImportedVessel>,
    pub errors: Vec<ImportRowError>,
}

impl ImportReport {
    /// Report for an import call that failed outright: a single synthetic
    /// row-0 error so the dialog renders something actionable.
    #[must_use]
    pub fn transport_failure(message: String) -> Self {
        Self {
            success: false,
            created_count: 0,
            error_count: 1,
            created: Vec::new(),
            errors: vec![ImportRowError {
                row: 0,
                error: message,
            }],
        }
    }
}

// =============================================================================
// Request bodies
// =============================================================================

/// Body of `PATCH /api/orgs/{org}/members/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateMemberBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<OrgRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MembershipStatus>,
}

/// Body of `POST /api/orgs/{org}/invites`.
#[derive(Debug, Clone, Serialize)]
pub struct InviteBody {
    pub email: Email,
    pub role: OrgRole,
}

/// Body of `POST /api/organization-requests`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrgRequestBody {
    pub org_name: String,
    /// Set on the confirm-duplicate retry path only.
    pub force: bool,
}

/// Body of `POST /api/organization-requests/{id}/review`.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewBody {
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body of `PATCH /api/admin/organizations/{id}/billing-override`.
#[derive(Debug, Clone, Serialize)]
pub struct OverrideUpdateBody {
    pub enabled: bool,
    pub vessel_limit: Option<u32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

/// Body of `POST /api/admin/organizations/{id}/status`.
#[derive(Debug, Clone, Serialize)]
pub struct OrgStatusBody {
    pub is_active: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_billing_status_wire_shape() {
        // Shape as produced by the backend's billing router.
        let json = r#"{
            "org_id": 7,
            "org_name": "Marina Bay",
            "plan": "standard",
            "status": "active",
            "vessel_limit": 5,
            "current_period_end": "2026-09-01T00:00:00Z",
            "vessel_usage": {"current": 3, "limit": 5},
            "billing_override": {"active": false, "expires_at": null}
        }"#;

        let status: BillingStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.org_id, OrgId::new(7));
        assert_eq!(status.vessel_usage.current, 3);
        assert_eq!(status.effective_limit(), Some(5));
        assert!(!status.billing_override.active);
    }

    #[test]
    fn test_membership_lookup() {
        let profile = CurrentUserProfile {
            user: ApiUser {
                id: UserId::new(1),
                email: Email::parse("skipper@example.com").unwrap(),
                name: None,
                is_super_admin: false,
            },
            memberships: vec![
                Membership {
                    id: MembershipId::new(1),
                    org_id: OrgId::new(1),
                    org_name: "Marina Bay".to_string(),
                    role: OrgRole::Admin,
                    status: MembershipStatus::Active,
                },
                Membership {
                    id: MembershipId::new(2),
                    org_id: OrgId::new(2),
                    org_name: "Harbor West".to_string(),
                    role: OrgRole::Tech,
                    status: MembershipStatus::Disabled,
                },
            ],
        };

        assert_eq!(profile.active_memberships().len(), 1);
        assert!(profile.membership_in(OrgId::new(1)).is_some());
        // Disabled memberships grant nothing.
        assert!(profile.membership_in(OrgId::new(2)).is_none());
    }

    #[test]
    fn test_admin_org_override_bridge() {
        let now = Utc::now();
        let org = AdminOrg {
            id: OrgId::new(3),
            name: "Marina Bay".to_string(),
            is_active: true,
            created_at: now,
            vessel_count: 12,
            subscription_plan: Some("pro".to_string()),
            subscription_status: Some("active".to_string()),
            vessel_limit: Some(10),
            current_period_end: None,
            billing_override_enabled: true,
            billing_override_vessel_limit: Some(50),
            billing_override_expires_at: Some(now + TimeDelta::days(7)),
            billing_override_reason: Some("migration grace period".to_string()),
        };

        let entitlement = moorline_core::effective_entitlement(&org.billing(), now);
        assert!(entitlement.is_active);
        assert_eq!(entitlement.vessel_limit, Some(50));
    }

    #[test]
    fn test_import_transport_failure_report() {
        let report = ImportReport::transport_failure("connection reset".to_string());
        assert!(!report.success);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.errors.first().map(|e| e.row), Some(0));
    }

    #[test]
    fn test_invite_open_window() {
        let now = Utc::now();
        let invite = Invite {
            id: InviteId::new(1),
            email: Email::parse("new@example.com").unwrap(),
            role: OrgRole::Tech,
            expires_at: now + TimeDelta::days(7),
            accepted_at: None,
            revoked_at: None,
            created_at: now,
        };
        assert!(invite.is_open(now));

        let expired = Invite {
            expires_at: now - TimeDelta::seconds(1),
            ..invite
        };
        assert!(!expired.is_open(now));
    }
}
