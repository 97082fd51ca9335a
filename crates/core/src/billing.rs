//! Billing override and plan entitlement predicates.
//!
//! These are the only pieces of real domain logic in the client: they are
//! evaluated in several pages (org billing view, super-admin org editor)
//! and must stay numerically and temporally consistent everywhere. Callers
//! always pass a live `Utc::now()` so the "active" state is re-derived at
//! render time, never from a cached timestamp.
//!
//! The resolution order mirrors the backend's entitlement logic exactly:
//! active override, then active/trialing subscription, then inactive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Billing override
// =============================================================================

/// Administrator-set exception to standard plan limits, optionally
/// time-bounded. Stored per organization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BillingOverride {
    /// Whether the override is switched on at all.
    pub enabled: bool,
    /// Vessel-count ceiling while the override is active. `None` = unlimited.
    pub vessel_limit: Option<u32>,
    /// When the override stops applying. `None` = no expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Free-text justification entered by the super-admin.
    pub reason: Option<String>,
}

impl BillingOverride {
    /// Whether the override applies at `now`.
    ///
    /// An override is active iff it is enabled and either has no expiry or
    /// the expiry is strictly in the future. An expiry exactly equal to
    /// `now` counts as expired.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.expires_at.is_none_or(|expires| expires > now)
    }
}

// =============================================================================
// Effective entitlement
// =============================================================================

/// Subscription statuses that grant access. Matches the backend's check.
const ACTIVE_SUBSCRIPTION_STATUSES: &[&str] = &["active", "trialing"];

/// Whether a subscription status string grants access on its own.
#[must_use]
pub fn subscription_is_active(status: Option<&str>) -> bool {
    status.is_some_and(|s| ACTIVE_SUBSCRIPTION_STATUSES.contains(&s))
}

/// Billing-relevant fields of an organization, as read from the API.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrgBilling {
    /// Stripe subscription status ("active", "trialing", "past_due", ...).
    pub subscription_status: Option<String>,
    /// Vessel limit from the subscribed plan. `None` = unlimited.
    pub plan_vessel_limit: Option<u32>,
    /// The organization's billing override, if any fields are set.
    pub billing_override: BillingOverride,
}

/// Effective entitlement for an organization after override precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entitlement {
    /// Whether the organization may use the product at all.
    pub is_active: bool,
    /// Vessel-count ceiling actually enforced. `None` = unlimited.
    pub vessel_limit: Option<u32>,
}

/// Resolve the effective entitlement for an organization at `now`.
///
/// Priority order:
/// 1. Billing override (if enabled and not expired)
/// 2. Subscription (if active/trialing)
/// 3. Otherwise: inactive
#[must_use]
pub fn effective_entitlement(billing: &OrgBilling, now: DateTime<Utc>) -> Entitlement {
    if billing.billing_override.is_active(now) {
        return Entitlement {
            is_active: true,
            vessel_limit: billing.billing_override.vessel_limit,
        };
    }

    if subscription_is_active(billing.subscription_status.as_deref()) {
        return Entitlement {
            is_active: true,
            vessel_limit: billing.plan_vessel_limit,
        };
    }

    Entitlement {
        is_active: false,
        vessel_limit: None,
    }
}

// =============================================================================
// Plan catalog
// =============================================================================

/// Identifier of a subscription plan. Wire format is the lower-case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    Starter,
    Standard,
    Pro,
    Unlimited,
}

impl PlanId {
    /// Wire name of the plan, as the backend and checkout endpoint expect.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Standard => "standard",
            Self::Pro => "pro",
            Self::Unlimited => "unlimited",
        }
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlanId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starter" => Ok(Self::Starter),
            "standard" => Ok(Self::Standard),
            "pro" => Ok(Self::Pro),
            "unlimited" => Ok(Self::Unlimited),
            _ => Err(format!("invalid plan: {s}")),
        }
    }
}

/// A subscription plan as displayed in the plan picker.
///
/// This catalog is client-embedded and display-only. The authoritative
/// limit check happens server-side; nothing here enforces anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub id: PlanId,
    pub name: &'static str,
    /// Vessel limit of the plan. `None` = unlimited.
    pub vessel_limit: Option<u32>,
    /// Monthly price in whole USD.
    pub monthly_price_usd: u32,
}

/// All purchasable plans, in ascending order.
pub const PLANS: [Plan; 4] = [
    Plan {
        id: PlanId::Starter,
        name: "Starter",
        vessel_limit: Some(3),
        monthly_price_usd: 19,
    },
    Plan {
        id: PlanId::Standard,
        name: "Standard",
        vessel_limit: Some(5),
        monthly_price_usd: 49,
    },
    Plan {
        id: PlanId::Pro,
        name: "Pro",
        vessel_limit: Some(10),
        monthly_price_usd: 99,
    },
    Plan {
        id: PlanId::Unlimited,
        name: "Unlimited",
        vessel_limit: None,
        monthly_price_usd: 199,
    },
];

impl Plan {
    /// Look up a plan by its identifier.
    #[must_use]
    pub fn by_id(id: PlanId) -> Self {
        // PLANS covers every PlanId variant.
        PLANS
            .iter()
            .copied()
            .find(|p| p.id == id)
            .unwrap_or(PLANS[0])
    }
}

/// How a listed plan relates to the organization's current subscription.
///
/// Drives button labels only ("Current Plan" / "Upgrade" / "Change Plan").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFit {
    /// This is the organization's current plan.
    Current,
    /// Strictly more capacity than the current effective limit.
    Upgrade,
    /// Lateral move or downgrade.
    Other,
}

/// Classify `plan` against the current plan and the current effective limit.
///
/// `Current` iff identifiers match. `Upgrade` if the plan is the unlimited
/// tier and is not current, or its finite limit exceeds the current
/// effective limit. Anything else is `Other`.
#[must_use]
pub fn classify_plan(
    plan: &Plan,
    current: Option<PlanId>,
    effective_limit: Option<u32>,
) -> PlanFit {
    if current == Some(plan.id) {
        return PlanFit::Current;
    }

    match (plan.vessel_limit, effective_limit) {
        // Unlimited tier is an upgrade whenever it is not current.
        (None, _) => PlanFit::Upgrade,
        // A finite plan never upgrades an unlimited entitlement.
        (Some(_), None) => PlanFit::Other,
        (Some(plan_limit), Some(current_limit)) if plan_limit > current_limit => PlanFit::Upgrade,
        _ => PlanFit::Other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn override_with(enabled: bool, expires_at: Option<DateTime<Utc>>) -> BillingOverride {
        BillingOverride {
            enabled,
            vessel_limit: Some(25),
            expires_at,
            reason: None,
        }
    }

    #[test]
    fn test_override_active_no_expiry() {
        let now = Utc::now();
        assert!(override_with(true, None).is_active(now));
    }

    #[test]
    fn test_override_active_future_expiry() {
        let now = Utc::now();
        let future = now + TimeDelta::hours(1);
        assert!(override_with(true, Some(future)).is_active(now));
    }

    #[test]
    fn test_override_inactive_past_expiry() {
        let now = Utc::now();
        let past = now - TimeDelta::hours(1);
        assert!(!override_with(true, Some(past)).is_active(now));
    }

    #[test]
    fn test_override_inactive_at_boundary_instant() {
        // Expiry exactly equal to now is inactive, not active.
        let now = Utc::now();
        assert!(!override_with(true, Some(now)).is_active(now));
    }

    #[test]
    fn test_override_disabled_never_active() {
        let now = Utc::now();
        let future = now + TimeDelta::days(30);
        assert!(!override_with(false, Some(future)).is_active(now));
        assert!(!override_with(false, None).is_active(now));
    }

    #[test]
    fn test_subscription_is_active() {
        assert!(subscription_is_active(Some("active")));
        assert!(subscription_is_active(Some("trialing")));
        assert!(!subscription_is_active(Some("past_due")));
        assert!(!subscription_is_active(Some("canceled")));
        assert!(!subscription_is_active(None));
    }

    #[test]
    fn test_entitlement_override_beats_subscription() {
        let now = Utc::now();
        let billing = OrgBilling {
            subscription_status: Some("active".to_owned()),
            plan_vessel_limit: Some(5),
            billing_override: BillingOverride {
                enabled: true,
                vessel_limit: Some(25),
                expires_at: None,
                reason: Some("pilot program".to_owned()),
            },
        };

        let entitlement = effective_entitlement(&billing, now);
        assert!(entitlement.is_active);
        assert_eq!(entitlement.vessel_limit, Some(25));
    }

    #[test]
    fn test_entitlement_active_override_unlimited() {
        let now = Utc::now();
        let billing = OrgBilling {
            subscription_status: None,
            plan_vessel_limit: None,
            billing_override: BillingOverride {
                enabled: true,
                vessel_limit: None,
                expires_at: None,
                reason: None,
            },
        };

        let entitlement = effective_entitlement(&billing, now);
        assert!(entitlement.is_active);
        assert_eq!(entitlement.vessel_limit, None);
    }

    #[test]
    fn test_entitlement_expired_override_falls_back_to_plan() {
        let now = Utc::now();
        let billing = OrgBilling {
            subscription_status: Some("trialing".to_owned()),
            plan_vessel_limit: Some(10),
            billing_override: BillingOverride {
                enabled: true,
                vessel_limit: Some(25),
                expires_at: Some(now - TimeDelta::minutes(1)),
                reason: None,
            },
        };

        let entitlement = effective_entitlement(&billing, now);
        assert!(entitlement.is_active);
        assert_eq!(entitlement.vessel_limit, Some(10));
    }

    #[test]
    fn test_entitlement_inactive_without_override_or_subscription() {
        let billing = OrgBilling {
            subscription_status: Some("canceled".to_owned()),
            plan_vessel_limit: Some(5),
            billing_override: BillingOverride::default(),
        };

        let entitlement = effective_entitlement(&billing, Utc::now());
        assert!(!entitlement.is_active);
        assert_eq!(entitlement.vessel_limit, None);
    }

    #[test]
    fn test_plan_id_roundtrip() {
        for plan in PLANS {
            let parsed: PlanId = plan.id.as_str().parse().unwrap();
            assert_eq!(parsed, plan.id);
        }
        assert!("platinum".parse::<PlanId>().is_err());
    }

    #[test]
    fn test_classify_current_iff_ids_match() {
        for plan in &PLANS {
            assert_eq!(
                classify_plan(plan, Some(plan.id), plan.vessel_limit),
                PlanFit::Current
            );
        }
    }

    #[test]
    fn test_classify_unlimited_is_upgrade_when_not_current() {
        let unlimited = Plan::by_id(PlanId::Unlimited);
        assert_eq!(
            classify_plan(&unlimited, Some(PlanId::Starter), Some(3)),
            PlanFit::Upgrade
        );
        assert_eq!(classify_plan(&unlimited, None, None), PlanFit::Upgrade);
    }

    #[test]
    fn test_classify_bigger_limit_is_upgrade() {
        let pro = Plan::by_id(PlanId::Pro);
        assert_eq!(
            classify_plan(&pro, Some(PlanId::Standard), Some(5)),
            PlanFit::Upgrade
        );
    }

    #[test]
    fn test_classify_smaller_limit_is_other() {
        let starter = Plan::by_id(PlanId::Starter);
        assert_eq!(
            classify_plan(&starter, Some(PlanId::Pro), Some(10)),
            PlanFit::Other
        );
    }

    #[test]
    fn test_classify_finite_never_upgrades_unlimited() {
        let pro = Plan::by_id(PlanId::Pro);
        assert_eq!(
            classify_plan(&pro, Some(PlanId::Unlimited), None),
            PlanFit::Other
        );
    }

    #[test]
    fn test_classify_against_override_raised_limit() {
        // An active override can raise the effective limit past every
        // finite plan, leaving only the unlimited tier as an upgrade.
        let pro = Plan::by_id(PlanId::Pro);
        assert_eq!(
            classify_plan(&pro, Some(PlanId::Starter), Some(25)),
            PlanFit::Other
        );
    }
}
