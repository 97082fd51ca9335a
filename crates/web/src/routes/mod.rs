//! HTTP route handlers for the web app.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Dashboard (org overview)
//! GET  /health                 - Health check
//! POST /org/select             - Switch the selected organization
//!
//! # Auth
//! GET  /auth/sign-in           - Sign-in page (links to the identity provider)
//! GET  /auth/callback          - Provider redirect target
//! POST /auth/sign-out          - Sign out
//!
//! # Billing (org admins)
//! GET  /settings/billing       - Billing status and plan grid
//! POST /settings/billing/checkout - Start a checkout session
//! POST /settings/billing/portal   - Open the subscription portal
//! GET  /billing                - Legacy path, redirects to /settings/billing
//!
//! # Organization (org admins)
//! GET  /settings/organization  - Members, invites, join requests
//! POST /settings/organization/members/{id}          - Change role or status
//! POST /settings/organization/invites               - Send an invite
//! POST /settings/organization/invites/{id}/revoke   - Revoke an invite
//! POST /settings/organization/requests/{id}/review  - Approve or reject
//!
//! # Onboarding and invites
//! GET  /onboarding             - Request a new organization
//! POST /onboarding             - Submit the request (force on duplicate confirm)
//! GET  /invites/{token}        - Invite landing page
//! POST /invites/{token}/accept - Accept the invite
//!
//! # Bulk import (org admins)
//! GET  /settings/vessels/import  - Upload form
//! POST /settings/vessels/import  - Upload and show the report
//!
//! # Super-admin console
//! GET  /admin                              - Organizations and users
//! GET  /admin/organizations/{id}           - Org detail with override form
//! POST /admin/organizations/{id}/billing-override - Update the override
//! POST /admin/organizations/{id}/status    - Enable or disable the org
//! ```

pub mod auth;
pub mod billing;
pub mod home;
pub mod imports;
pub mod invites;
pub mod onboarding;
pub mod org_admin;
pub mod superadmin;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use moorline_core::{OrgId, OrgRole};
use tower_sessions::Session;

use crate::api::{ApiError, CurrentUserProfile};
use crate::error::AppError;
use crate::filters;
use crate::models::{CurrentUser, Toast, take_toasts};
use crate::state::AppState;

/// Create all routes for the web app.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::dashboard))
        .route("/health", get(health))
        .route("/org/select", post(home::select_org))
        .nest("/auth", auth_routes())
        .route(
            "/settings/billing",
            get(billing::show),
        )
        .route("/settings/billing/checkout", post(billing::checkout))
        .route("/settings/billing/portal", post(billing::portal))
        // Old bookmarked path from before billing moved under settings.
        .route("/billing", get(|| async { Redirect::permanent("/settings/billing") }))
        .route("/settings/organization", get(org_admin::show))
        .route(
            "/settings/organization/members/{id}",
            post(org_admin::update_member),
        )
        .route(
            "/settings/organization/invites",
            post(org_admin::invite),
        )
        .route(
            "/settings/organization/invites/{id}/revoke",
            post(org_admin::revoke_invite),
        )
        .route(
            "/settings/organization/requests/{id}/review",
            post(org_admin::review_request),
        )
        .route(
            "/onboarding",
            get(onboarding::show).post(onboarding::submit),
        )
        .route("/invites/{token}", get(invites::show))
        .route("/invites/{token}/accept", post(invites::accept))
        .route(
            "/settings/vessels/import",
            get(imports::form).post(imports::upload),
        )
        .route("/admin", get(superadmin::index))
        .route("/admin/organizations/{id}", get(superadmin::org_detail))
        .route(
            "/admin/organizations/{id}/billing-override",
            post(superadmin::update_override),
        )
        .route(
            "/admin/organizations/{id}/status",
            post(superadmin::set_org_status),
        )
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/sign-in", get(auth::sign_in_page))
        .route("/callback", get(auth::callback))
        .route("/sign-out", post(auth::sign_out))
}

/// Health check endpoint.
async fn health() -> &'static str {
    "OK"
}

// =============================================================================
// Shared page scaffolding
// =============================================================================

/// Fields every page hands to the base layout: identity for the nav and
/// drained flash toasts.
#[derive(Clone)]
pub struct PageShell {
    pub user_name: String,
    pub is_super_admin: bool,
    pub org_name: Option<String>,
    pub toasts: Vec<Toast>,
}

impl PageShell {
    /// Build the shell, draining any pending toasts from the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn build(
        session: &Session,
        user: &CurrentUser,
        org_name: Option<String>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            user_name: user.display_name().to_string(),
            is_super_admin: user.is_super_admin,
            org_name,
            toasts: take_toasts(session).await?,
        })
    }
}

/// The organization a gated page operates on.
pub struct ActiveOrg {
    pub id: OrgId,
    pub name: String,
    pub role: OrgRole,
}

/// Resolve the org the page should act on from the session selection.
///
/// A missing selection falls back to the single active membership when
/// there is exactly one. The selection is only honored when the user still
/// has an active membership in that org.
#[must_use]
pub fn resolve_org(profile: &CurrentUserProfile, selection: Option<OrgId>) -> Option<ActiveOrg> {
    let membership = match selection {
        Some(org) => profile.membership_in(org),
        None => {
            let active = profile.active_memberships();
            match active.as_slice() {
                [only] => Some(*only),
                _ => None,
            }
        }
    }?;

    Some(ActiveOrg {
        id: membership.org_id,
        name: membership.org_name.clone(),
        role: membership.role,
    })
}

/// "Pick an organization" placeholder, shown when a gated page has no
/// usable org selection.
#[derive(Template, WebTemplate)]
#[template(path = "shared/select_org.html")]
pub struct SelectOrgTemplate {
    pub shell: PageShell,
    pub orgs: Vec<OrgChoice>,
    pub next: String,
}

/// One selectable organization.
#[derive(Clone)]
pub struct OrgChoice {
    pub id: OrgId,
    pub name: String,
    pub role_label: &'static str,
}

/// "You need the admin role" placeholder.
#[derive(Template, WebTemplate)]
#[template(path = "shared/access_denied.html")]
pub struct AccessDeniedTemplate {
    pub shell: PageShell,
    pub org_name: String,
}

/// Fetch the signed-in user's profile, bouncing to sign-in when the
/// backend no longer accepts the session's token.
pub(crate) async fn fetch_profile(
    state: &AppState,
    user: &CurrentUser,
) -> Result<CurrentUserProfile, Response> {
    match state.api().current_user(&user.api_token).await {
        Ok(profile) => Ok(profile),
        Err(ApiError::Unauthorized) => {
            Err(Redirect::to("/auth/sign-in?expired=1").into_response())
        }
        Err(error) => Err(AppError::from(error).into_response()),
    }
}

/// Resolve an org and require an admin membership, rendering the
/// select-org or access-denied placeholder otherwise.
pub(crate) async fn require_org_admin(
    session: &Session,
    user: &CurrentUser,
    profile: &CurrentUserProfile,
    selection: Option<OrgId>,
    next: &str,
) -> Result<ActiveOrg, Response> {
    let Some(org) = resolve_org(profile, selection) else {
        let shell = match PageShell::build(session, user, None).await {
            Ok(shell) => shell,
            Err(error) => return Err(error.into_response()),
        };
        return Err(SelectOrgTemplate {
            shell,
            orgs: org_choices(profile),
            next: next.to_string(),
        }
        .into_response());
    };

    if !org.role.is_admin() {
        let shell = match PageShell::build(session, user, Some(org.name.clone())).await {
            Ok(shell) => shell,
            Err(error) => return Err(error.into_response()),
        };
        return Err(AccessDeniedTemplate {
            shell,
            org_name: org.name,
        }
        .into_response());
    }

    Ok(org)
}

/// Active memberships as selectable choices.
#[must_use]
pub fn org_choices(profile: &CurrentUserProfile) -> Vec<OrgChoice> {
    profile
        .active_memberships()
        .into_iter()
        .map(|m| OrgChoice {
            id: m.org_id,
            name: m.org_name.clone(),
            role_label: m.role.label(),
        })
        .collect()
}

/// Sanitize a form-supplied return path. Only local targets are allowed;
/// anything else falls back to `fallback`.
#[must_use]
pub fn local_redirect(next: Option<String>, fallback: &str) -> String {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//"))
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::{ApiUser, Membership};
    use moorline_core::{Email, MembershipId, MembershipStatus, UserId};

    fn profile(memberships: Vec<Membership>) -> CurrentUserProfile {
        CurrentUserProfile {
            user: ApiUser {
                id: UserId::new(1),
                email: Email::parse("skipper@example.com").unwrap(),
                name: None,
                is_super_admin: false,
            },
            memberships,
        }
    }

    fn membership(org: i32, role: OrgRole, status: MembershipStatus) -> Membership {
        Membership {
            id: MembershipId::new(org),
            org_id: OrgId::new(org),
            org_name: format!("Org {org}"),
            role,
            status,
        }
    }

    #[test]
    fn test_resolve_org_single_membership_fallback() {
        let profile = profile(vec![membership(1, OrgRole::Admin, MembershipStatus::Active)]);
        let org = resolve_org(&profile, None).unwrap();
        assert_eq!(org.id, OrgId::new(1));
        assert_eq!(org.role, OrgRole::Admin);
    }

    #[test]
    fn test_resolve_org_ambiguous_without_selection() {
        let profile = profile(vec![
            membership(1, OrgRole::Admin, MembershipStatus::Active),
            membership(2, OrgRole::Tech, MembershipStatus::Active),
        ]);
        assert!(resolve_org(&profile, None).is_none());
        assert!(resolve_org(&profile, Some(OrgId::new(2))).is_some());
    }

    #[test]
    fn test_resolve_org_ignores_stale_selection() {
        let profile = profile(vec![membership(1, OrgRole::Admin, MembershipStatus::Active)]);
        assert!(resolve_org(&profile, Some(OrgId::new(9))).is_none());
    }

    #[test]
    fn test_resolve_org_ignores_disabled_membership() {
        let profile = profile(vec![membership(
            1,
            OrgRole::Admin,
            MembershipStatus::Disabled,
        )]);
        assert!(resolve_org(&profile, None).is_none());
        assert!(resolve_org(&profile, Some(OrgId::new(1))).is_none());
    }

    #[test]
    fn test_local_redirect_keeps_local_paths() {
        assert_eq!(
            local_redirect(Some("/admin".to_string()), "/"),
            "/admin"
        );
        assert_eq!(
            local_redirect(Some("/admin/organizations/7".to_string()), "/admin"),
            "/admin/organizations/7"
        );
    }

    #[test]
    fn test_local_redirect_rejects_external_targets() {
        assert_eq!(
            local_redirect(Some("https://evil.example".to_string()), "/"),
            "/"
        );
        assert_eq!(local_redirect(Some("//evil.example".to_string()), "/"), "/");
        assert_eq!(local_redirect(None, "/admin"), "/admin");
    }
}
