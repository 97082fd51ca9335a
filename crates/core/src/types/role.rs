//! Role and status enums for organization memberships and join requests.
//!
//! Wire values match the backend's stored strings (upper-case).

use serde::{Deserialize, Serialize};

/// Role a user holds within one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrgRole {
    /// Full control over the organization, members, and billing.
    Admin,
    /// Can manage vessels, inventory, and maintenance schedules.
    Manager,
    /// Day-to-day technician access.
    #[default]
    Tech,
}

impl OrgRole {
    /// Whether this role can administer the organization (members, billing).
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Human-readable label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Manager => "Manager",
            Self::Tech => "Tech",
        }
    }

    /// All roles, in descending privilege order. Used for role selectors.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Admin, Self::Manager, Self::Tech]
    }

    /// The backend's stored string for this role.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Manager => "MANAGER",
            Self::Tech => "TECH",
        }
    }
}

impl std::fmt::Display for OrgRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl std::str::FromStr for OrgRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "MANAGER" => Ok(Self::Manager),
            "TECH" => Ok(Self::Tech),
            _ => Err(format!("invalid org role: {s}")),
        }
    }
}

/// Status of a user's membership in an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipStatus {
    #[default]
    Active,
    Disabled,
}

impl MembershipStatus {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Status of an organization join/create request.
///
/// Transitions `Pending -> Approved | Rejected` exactly once; terminal
/// states never transition again. The backend enforces this; the client
/// only renders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Human-readable label for display.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_string(&OrgRole::Admin).unwrap(), "\"ADMIN\"");
        let role: OrgRole = serde_json::from_str("\"TECH\"").unwrap();
        assert_eq!(role, OrgRole::Tech);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("MANAGER".parse::<OrgRole>().unwrap(), OrgRole::Manager);
        assert!("manager".parse::<OrgRole>().is_err());
    }

    #[test]
    fn test_only_admin_is_admin() {
        assert!(OrgRole::Admin.is_admin());
        assert!(!OrgRole::Manager.is_admin());
        assert!(!OrgRole::Tech.is_admin());
    }

    #[test]
    fn test_membership_status() {
        assert!(MembershipStatus::Active.is_active());
        assert!(!MembershipStatus::Disabled.is_active());
    }

    #[test]
    fn test_request_status_wire_format() {
        let status: RequestStatus = serde_json::from_str("\"PENDING\"").unwrap();
        assert!(status.is_pending());
        assert_eq!(
            serde_json::to_string(&RequestStatus::Rejected).unwrap(),
            "\"REJECTED\""
        );
    }
}
