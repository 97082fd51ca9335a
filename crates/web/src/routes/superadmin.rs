//! Super-admin console: all organizations and users, billing overrides,
//! and enabling or disabling organizations.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use moorline_core::{OrgId, effective_entitlement};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{PageShell, fetch_profile, local_redirect};
use crate::api::{AdminOrg, AdminUser, OverrideUpdateBody};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Toast, push_toast};
use crate::state::AppState;

/// Organization row display data.
#[derive(Clone)]
pub struct OrgRow {
    pub id: OrgId,
    pub name: String,
    pub is_active: bool,
    pub plan_label: String,
    pub entitlement_label: String,
    pub vessels: String,
    pub created_on: String,
}

/// User row display data.
#[derive(Clone)]
pub struct UserRow {
    pub email: String,
    pub name: Option<String>,
    pub is_super_admin: bool,
    pub created_on: String,
}

/// Console index template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminIndexTemplate {
    pub shell: PageShell,
    pub orgs: Vec<OrgRow>,
    pub users: Vec<UserRow>,
    pub search: String,
}

/// Org detail template with the override form.
#[derive(Template, WebTemplate)]
#[template(path = "admin/org_detail.html")]
pub struct AdminOrgTemplate {
    pub shell: PageShell,
    pub org: OrgDetailView,
}

/// Org detail display data, raw override fields included.
#[derive(Clone)]
pub struct OrgDetailView {
    pub id: OrgId,
    pub name: String,
    pub is_active: bool,
    pub plan_label: String,
    pub subscription_status: String,
    pub entitlement_label: String,
    pub vessels: String,
    pub period_end: Option<String>,
    pub override_enabled: bool,
    pub override_limit: String,
    pub override_expires: String,
    pub override_reason: String,
}

fn format_limit(limit: Option<u32>) -> String {
    limit.map_or_else(|| "Unlimited".to_string(), |n| n.to_string())
}

fn entitlement_label(org: &AdminOrg, now: DateTime<Utc>) -> String {
    let entitlement = effective_entitlement(&org.billing(), now);
    if !entitlement.is_active {
        return "Inactive".to_string();
    }
    if org.billing_override().is_active(now) {
        format!("Active (override, {})", format_limit(entitlement.vessel_limit))
    } else {
        format!("Active ({})", format_limit(entitlement.vessel_limit))
    }
}

fn org_row(org: &AdminOrg, now: DateTime<Utc>) -> OrgRow {
    OrgRow {
        id: org.id,
        name: org.name.clone(),
        is_active: org.is_active,
        plan_label: org
            .subscription_plan
            .clone()
            .unwrap_or_else(|| "none".to_string()),
        entitlement_label: entitlement_label(org, now),
        vessels: org.vessel_count.to_string(),
        created_on: org.created_at.format("%Y-%m-%d").to_string(),
    }
}

fn org_detail_view(org: &AdminOrg, now: DateTime<Utc>) -> OrgDetailView {
    OrgDetailView {
        id: org.id,
        name: org.name.clone(),
        is_active: org.is_active,
        plan_label: org
            .subscription_plan
            .clone()
            .unwrap_or_else(|| "none".to_string()),
        subscription_status: org
            .subscription_status
            .clone()
            .unwrap_or_else(|| "none".to_string()),
        entitlement_label: entitlement_label(org, now),
        vessels: format!("{} / {}", org.vessel_count, format_limit(org.vessel_limit)),
        period_end: org
            .current_period_end
            .map(|at| at.format("%B %-d, %Y").to_string()),
        override_enabled: org.billing_override_enabled,
        override_limit: org
            .billing_override_vessel_limit
            .map(|n| n.to_string())
            .unwrap_or_default(),
        // datetime-local form value format
        override_expires: org
            .billing_override_expires_at
            .map(|at| at.format("%Y-%m-%dT%H:%M").to_string())
            .unwrap_or_default(),
        override_reason: org.billing_override_reason.clone().unwrap_or_default(),
    }
}

/// Bounce non-super-admins to the dashboard.
async fn require_super_admin(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), Response> {
    if user.is_super_admin {
        return Ok(());
    }
    match push_toast(session, Toast::error("That page is for Moorline staff.")).await {
        Ok(()) => Err(Redirect::to("/").into_response()),
        Err(error) => Err(AppError::from(error).into_response()),
    }
}

/// Console index query parameters.
#[derive(Debug, Deserialize)]
pub struct AdminIndexQuery {
    pub search: Option<String>,
}

/// Display the console: all organizations and users.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<AdminIndexQuery>,
) -> Response {
    if let Err(response) = require_super_admin(&session, &user).await {
        return response;
    }
    // Drop the cached profile so a just-revoked super-admin flag takes
    // effect before any admin API call.
    state.api().invalidate_current_user(&user.api_token).await;
    let profile = match fetch_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(response) => return response,
    };
    if !profile.user.is_super_admin {
        return Redirect::to("/").into_response();
    }

    let search = query
        .search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let token = &user.api_token;
    let orgs = match state.api().admin_list_orgs(token, search.as_deref()).await {
        Ok(orgs) => orgs,
        Err(error) => return AppError::from(error).into_response(),
    };
    // The user table degrades to empty rather than failing the page.
    let mut card_toasts = Vec::new();
    let users = match state.api().admin_list_users(token).await {
        Ok(users) => users,
        Err(error) => {
            tracing::warn!(error = %error, "User list unavailable");
            card_toasts.push(Toast::error("The user list is unavailable right now."));
            Vec::new()
        }
    };

    let mut shell = match PageShell::build(&session, &user, None).await {
        Ok(shell) => shell,
        Err(error) => return error.into_response(),
    };
    shell.toasts.extend(card_toasts);

    let now = Utc::now();
    AdminIndexTemplate {
        shell,
        orgs: orgs.iter().map(|org| org_row(org, now)).collect(),
        users: users.iter().map(user_row).collect(),
        search: search.unwrap_or_default(),
    }
    .into_response()
}

fn user_row(user: &AdminUser) -> UserRow {
    UserRow {
        email: user.email.as_str().to_string(),
        name: user.name.clone(),
        is_super_admin: user.is_super_admin,
        created_on: user.created_at.format("%Y-%m-%d").to_string(),
    }
}

/// Display one organization with its override form.
#[instrument(skip(state, session, user))]
pub async fn org_detail(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(org): Path<i32>,
) -> Response {
    if let Err(response) = require_super_admin(&session, &user).await {
        return response;
    }

    let found = match state
        .api()
        .admin_get_org(&user.api_token, OrgId::new(org))
        .await
    {
        Ok(found) => found,
        Err(error) => return AppError::from(error).into_response(),
    };

    let shell = match PageShell::build(&session, &user, None).await {
        Ok(shell) => shell,
        Err(error) => return error.into_response(),
    };

    AdminOrgTemplate {
        shell,
        org: org_detail_view(&found, Utc::now()),
    }
    .into_response()
}

/// Override form data.
#[derive(Debug, Deserialize)]
pub struct OverrideForm {
    /// Checkbox, present when checked.
    pub enabled: Option<String>,
    pub vessel_limit: Option<String>,
    pub expires_at: Option<String>,
    pub reason: Option<String>,
}

/// Update an organization's billing override.
#[instrument(skip(state, session, user, form))]
pub async fn update_override(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(org): Path<i32>,
    Form(form): Form<OverrideForm>,
) -> Result<Response, AppError> {
    if let Err(response) = require_super_admin(&session, &user).await {
        return Ok(response);
    }

    let org = OrgId::new(org);
    let vessel_limit = match form.vessel_limit.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<u32>().map_err(|_| {
            AppError::BadRequest(format!("Invalid vessel limit: {raw}"))
        })?),
    };
    let expires_at = match form.expires_at.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_datetime_local(raw)?),
    };

    let body = OverrideUpdateBody {
        enabled: form.enabled.is_some(),
        vessel_limit,
        expires_at,
        reason: form.reason.filter(|r| !r.trim().is_empty()),
    };

    match state
        .api()
        .admin_update_override(&user.api_token, org, &body)
        .await
    {
        Ok(updated) => {
            push_toast(
                &session,
                Toast::success(format!(
                    "Billing override for \"{}\" saved.",
                    updated.name
                )),
            )
            .await?;
        }
        Err(error) => {
            push_toast(&session, Toast::error(error.toast_message())).await?;
        }
    }

    Ok(Redirect::to(&format!("/admin/organizations/{org}")).into_response())
}

/// Status form data.
#[derive(Debug, Deserialize)]
pub struct OrgStatusForm {
    pub active: String,
    /// Path to return to, defaults to the console index.
    pub next: Option<String>,
}

/// Enable or disable an organization.
#[instrument(skip(state, session, user, form))]
pub async fn set_org_status(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(org): Path<i32>,
    Form(form): Form<OrgStatusForm>,
) -> Result<Response, AppError> {
    if let Err(response) = require_super_admin(&session, &user).await {
        return Ok(response);
    }

    let org = OrgId::new(org);
    let active = form.active == "true";

    match state
        .api()
        .admin_set_org_active(&user.api_token, org, active)
        .await
    {
        Ok(updated) => {
            let verb = if updated.is_active { "enabled" } else { "disabled" };
            push_toast(
                &session,
                Toast::success(format!(
                    "Organization \"{}\" has been {verb}.",
                    updated.name
                )),
            )
            .await?;
        }
        Err(error) => {
            push_toast(&session, Toast::error(error.toast_message())).await?;
        }
    }

    Ok(Redirect::to(&local_redirect(form.next, "/admin")).into_response())
}

/// Parse an HTML `datetime-local` value as UTC.
fn parse_datetime_local(raw: &str) -> Result<DateTime<Utc>, AppError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .map(|naive| naive.and_utc())
        .map_err(|_| AppError::BadRequest(format!("Invalid expiry timestamp: {raw}")))
}
