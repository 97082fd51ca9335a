//! Dashboard and organization selection.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use moorline_core::OrgId;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{PageShell, fetch_profile, local_redirect, resolve_org};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{OrgSelection, RequireAuth};
use crate::models::{Toast, push_toast, session_keys};
use crate::state::AppState;

/// One membership card on the dashboard.
#[derive(Clone)]
pub struct MembershipCard {
    pub org_id: OrgId,
    pub org_name: String,
    pub role_label: &'static str,
    pub is_admin: bool,
    pub is_selected: bool,
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "home/dashboard.html")]
pub struct DashboardTemplate {
    pub shell: PageShell,
    pub cards: Vec<MembershipCard>,
}

/// Display the dashboard.
///
/// Users with no active membership are sent to onboarding to request an
/// organization.
#[instrument(skip(state, session, user))]
pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    OrgSelection(selection): OrgSelection,
) -> Response {
    let profile = match fetch_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(response) => return response,
    };

    if profile.active_memberships().is_empty() {
        return Redirect::to("/onboarding").into_response();
    }

    let selected = resolve_org(&profile, selection);
    let selected_id = selected.as_ref().map(|org| org.id);

    let cards = profile
        .active_memberships()
        .into_iter()
        .map(|m| MembershipCard {
            org_id: m.org_id,
            org_name: m.org_name.clone(),
            role_label: m.role.label(),
            is_admin: m.role.is_admin(),
            is_selected: Some(m.org_id) == selected_id,
        })
        .collect();

    let shell = match PageShell::build(
        &session,
        &user,
        selected.map(|org| org.name),
    )
    .await
    {
        Ok(shell) => shell,
        Err(error) => return error.into_response(),
    };

    DashboardTemplate { shell, cards }.into_response()
}

/// Org selection form data.
#[derive(Debug, Deserialize)]
pub struct SelectOrgForm {
    pub org_id: i32,
    /// Path to return to after switching, defaults to the dashboard.
    pub next: Option<String>,
}

/// Switch the selected organization.
///
/// The selection is rejected unless the user has an active membership in
/// the target org.
#[instrument(skip(state, session, user, form))]
pub async fn select_org(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<SelectOrgForm>,
) -> Result<Response, AppError> {
    let profile = match fetch_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(response) => return Ok(response),
    };

    let org = OrgId::new(form.org_id);
    let Some(membership) = profile.membership_in(org) else {
        push_toast(
            &session,
            Toast::error("You are not a member of that organization."),
        )
        .await?;
        return Ok(Redirect::to("/").into_response());
    };

    session.insert(session_keys::SELECTED_ORG, org).await?;
    push_toast(
        &session,
        Toast::info(format!("Switched to {}.", membership.org_name)),
    )
    .await?;

    Ok(Redirect::to(&local_redirect(form.next, "/")).into_response())
}
