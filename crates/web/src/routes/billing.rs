//! Billing status page, plan selection, and subscription portal.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use moorline_core::{PLANS, PlanFit, PlanId, classify_plan};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{PageShell, fetch_profile, require_org_admin};
use crate::api::{ApiError, BillingStatus};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{OrgSelection, RequireAuth};
use crate::models::{Toast, push_toast};
use crate::state::AppState;

/// Billing summary display data.
#[derive(Clone)]
pub struct BillingView {
    pub org_name: String,
    pub plan_name: String,
    pub status_label: String,
    pub usage: String,
    pub renews_on: Option<String>,
    pub override_active: bool,
    pub override_expires: Option<String>,
}

/// One plan card in the grid.
#[derive(Clone)]
pub struct PlanCard {
    pub id: &'static str,
    pub name: &'static str,
    pub price: String,
    pub limit_label: String,
    pub is_current: bool,
    pub action_label: &'static str,
}

/// Billing page template.
#[derive(Template, WebTemplate)]
#[template(path = "billing/show.html")]
pub struct BillingTemplate {
    pub shell: PageShell,
    pub billing: BillingView,
    pub plans: Vec<PlanCard>,
    pub has_subscription: bool,
}

fn format_limit(limit: Option<u32>) -> String {
    limit.map_or_else(|| "Unlimited".to_string(), |n| n.to_string())
}

fn format_date(at: DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

impl From<&BillingStatus> for BillingView {
    fn from(status: &BillingStatus) -> Self {
        let status_label = match status.status.as_deref() {
            Some("active") => "Active".to_string(),
            Some("trialing") => "Trial".to_string(),
            Some(other) => {
                let mut label = other.replace('_', " ");
                if let Some(first) = label.get_mut(..1) {
                    first.make_ascii_uppercase();
                }
                label
            }
            None => "No subscription".to_string(),
        };

        Self {
            org_name: status.org_name.clone(),
            plan_name: status
                .plan
                .as_deref()
                .and_then(|p| p.parse::<PlanId>().ok())
                .map_or_else(
                    || "No plan".to_string(),
                    |p| moorline_core::Plan::by_id(p).name.to_string(),
                ),
            status_label,
            usage: format!(
                "{} / {}",
                status.vessel_usage.current,
                format_limit(status.vessel_usage.limit)
            ),
            renews_on: status.current_period_end.map(format_date),
            override_active: status.billing_override.active,
            override_expires: status.billing_override.expires_at.map(format_date),
        }
    }
}

fn plan_cards(status: &BillingStatus) -> Vec<PlanCard> {
    let current = status.plan.as_deref().and_then(|p| p.parse::<PlanId>().ok());

    // Without an active entitlement the org can hold zero vessels, so every
    // plan is an upgrade. A None usage limit means unlimited, not absent.
    let entitled = moorline_core::subscription_is_active(status.status.as_deref())
        || status.billing_override.active;
    let effective_limit = if entitled {
        status.effective_limit()
    } else {
        Some(0)
    };

    PLANS
        .iter()
        .map(|plan| {
            let fit = classify_plan(plan, current, effective_limit);
            PlanCard {
                id: plan.id.as_str(),
                name: plan.name,
                price: format!("${}/mo", plan.monthly_price_usd),
                limit_label: format!("{} vessels", format_limit(plan.vessel_limit)),
                is_current: fit == PlanFit::Current,
                action_label: match fit {
                    PlanFit::Current => "Current Plan",
                    PlanFit::Upgrade => "Upgrade",
                    PlanFit::Other => "Change Plan",
                },
            }
        })
        .collect()
}

/// Billing page query parameters (checkout round-trip flags).
#[derive(Debug, Deserialize)]
pub struct BillingQuery {
    pub success: Option<String>,
    pub canceled: Option<String>,
}

/// Display the billing page.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    OrgSelection(selection): OrgSelection,
    Query(query): Query<BillingQuery>,
) -> Response {
    let profile = match fetch_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(response) => return response,
    };

    let org = match require_org_admin(&session, &user, &profile, selection, "/settings/billing")
        .await
    {
        Ok(org) => org,
        Err(response) => return response,
    };

    // Back from a completed checkout: the cached status predates the new
    // subscription.
    if query.success.is_some() {
        state.api().invalidate_billing(org.id).await;
    }

    let status = match state.api().billing_status(&user.api_token, org.id).await {
        Ok(status) => status,
        Err(error) => return AppError::from(error).into_response(),
    };

    let mut shell = match PageShell::build(&session, &user, Some(org.name)).await {
        Ok(shell) => shell,
        Err(error) => return error.into_response(),
    };

    // Checkout round-trip flags from the payment provider redirect.
    if query.success.is_some() {
        shell.toasts.push(Toast::success(
            "Your subscription is being set up. It may take a moment to appear.",
        ));
    } else if query.canceled.is_some() {
        shell.toasts.push(Toast::info("Checkout canceled."));
    }

    let plans = plan_cards(&status);
    let has_subscription = status.status.is_some();

    BillingTemplate {
        shell,
        billing: BillingView::from(&status),
        plans,
        has_subscription,
    }
    .into_response()
}

/// Checkout form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub plan: String,
}

/// Start a payment-provider checkout session and redirect to it.
#[instrument(skip(state, session, user, form))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    OrgSelection(selection): OrgSelection,
    Form(form): Form<CheckoutForm>,
) -> Result<Response, AppError> {
    let profile = match fetch_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(response) => return Ok(response),
    };

    let org = match require_org_admin(&session, &user, &profile, selection, "/settings/billing")
        .await
    {
        Ok(org) => org,
        Err(response) => return Ok(response),
    };

    let plan: PlanId = form.plan.parse().map_err(AppError::BadRequest)?;

    match state
        .api()
        .checkout_session(&user.api_token, org.id, plan)
        .await
    {
        Ok(checkout) => Ok(Redirect::to(&checkout.url).into_response()),
        Err(error) => {
            push_toast(&session, Toast::error(error.toast_message())).await?;
            Ok(Redirect::to("/settings/billing").into_response())
        }
    }
}

/// Open the payment-provider subscription portal.
#[instrument(skip(state, session, user))]
pub async fn portal(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    OrgSelection(selection): OrgSelection,
) -> Result<Response, AppError> {
    let profile = match fetch_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(response) => return Ok(response),
    };

    let org = match require_org_admin(&session, &user, &profile, selection, "/settings/billing")
        .await
    {
        Ok(org) => org,
        Err(response) => return Ok(response),
    };

    match state.api().portal_session(&user.api_token, org.id).await {
        Ok(portal) => Ok(Redirect::to(&portal.url).into_response()),
        Err(ApiError::NotFound(_)) => {
            // No provider customer yet: the org has never subscribed.
            push_toast(
                &session,
                Toast::info("Pick a plan first to set up billing."),
            )
            .await?;
            Ok(Redirect::to("/settings/billing").into_response())
        }
        Err(error) => {
            push_toast(&session, Toast::error(error.toast_message())).await?;
            Ok(Redirect::to("/settings/billing").into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{OverrideStatus, VesselUsage};
    use moorline_core::OrgId;

    fn status(plan: Option<&str>, state: Option<&str>, limit: Option<u32>) -> BillingStatus {
        BillingStatus {
            org_id: OrgId::new(1),
            org_name: "Marina Bay".to_string(),
            plan: plan.map(String::from),
            status: state.map(String::from),
            vessel_limit: limit,
            current_period_end: None,
            vessel_usage: VesselUsage { current: 2, limit },
            billing_override: OverrideStatus {
                active: false,
                expires_at: None,
            },
        }
    }

    #[test]
    fn test_billing_view_formatting() {
        let view = BillingView::from(&status(Some("standard"), Some("active"), Some(5)));
        assert_eq!(view.plan_name, "Standard");
        assert_eq!(view.status_label, "Active");
        assert_eq!(view.usage, "2 / 5");

        let view = BillingView::from(&status(None, None, None));
        assert_eq!(view.plan_name, "No plan");
        assert_eq!(view.status_label, "No subscription");
        assert_eq!(view.usage, "2 / Unlimited");
    }

    #[test]
    fn test_plan_cards_mark_current_and_upgrades() {
        let cards = plan_cards(&status(Some("standard"), Some("active"), Some(5)));
        let labels: Vec<_> = cards.iter().map(|c| (c.id, c.action_label)).collect();
        assert_eq!(
            labels,
            vec![
                ("starter", "Change Plan"),
                ("standard", "Current Plan"),
                ("pro", "Upgrade"),
                ("unlimited", "Upgrade"),
            ]
        );
    }

    #[test]
    fn test_plan_cards_without_subscription_all_upgrades() {
        let cards = plan_cards(&status(None, None, None));
        assert!(cards.iter().all(|c| c.action_label == "Upgrade"));
    }
}
