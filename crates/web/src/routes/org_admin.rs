//! Organization administration: members, invites, and join requests.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use moorline_core::{
    Email, InviteId, MembershipId, MembershipStatus, OrgRequestId, OrgRole, RequestStatus,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{PageShell, fetch_profile, require_org_admin};
use crate::api::{Invite, Member, OrgRequest, UpdateMemberBody};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{OrgSelection, RequireAuth};
use crate::models::{Toast, push_toast};
use crate::state::AppState;

const ORG_PAGE: &str = "/settings/organization";

/// Member row display data.
#[derive(Clone)]
pub struct MemberRow {
    pub membership_id: MembershipId,
    pub email: String,
    pub name: Option<String>,
    pub role: OrgRole,
    pub role_label: &'static str,
    pub is_active: bool,
    pub is_self: bool,
}

/// Invite row display data.
#[derive(Clone)]
pub struct InviteRow {
    pub id: InviteId,
    pub email: String,
    pub role_label: &'static str,
    pub status_label: &'static str,
    pub expires_on: String,
    pub is_open: bool,
}

/// Join request row display data.
#[derive(Clone)]
pub struct RequestRow {
    pub id: OrgRequestId,
    pub org_name: String,
    pub requester: String,
    pub submitted_on: String,
}

/// Organization admin page template.
#[derive(Template, WebTemplate)]
#[template(path = "org/admin.html")]
pub struct OrgAdminTemplate {
    pub shell: PageShell,
    pub members: Vec<MemberRow>,
    pub invites: Vec<InviteRow>,
    pub requests: Vec<RequestRow>,
    pub roles: Vec<(&'static str, &'static str)>,
}

fn member_row(member: &Member, self_id: moorline_core::UserId) -> MemberRow {
    MemberRow {
        membership_id: member.membership_id,
        email: member.email.as_str().to_string(),
        name: member.name.clone(),
        role: member.role,
        role_label: member.role.label(),
        is_active: member.status.is_active(),
        is_self: member.user_id == self_id,
    }
}

fn invite_row(invite: &Invite) -> InviteRow {
    let now = Utc::now();
    let status_label = if invite.accepted_at.is_some() {
        "Accepted"
    } else if invite.revoked_at.is_some() {
        "Revoked"
    } else if invite.expires_at <= now {
        "Expired"
    } else {
        "Pending"
    };

    InviteRow {
        id: invite.id,
        email: invite.email.as_str().to_string(),
        role_label: invite.role.label(),
        status_label,
        expires_on: invite.expires_at.format("%B %-d, %Y").to_string(),
        is_open: invite.is_open(now),
    }
}

fn request_row(request: &OrgRequest) -> RequestRow {
    RequestRow {
        id: request.id,
        org_name: request.org_name.clone(),
        requester: request
            .requested_by
            .name
            .clone()
            .unwrap_or_else(|| request.requested_by.email.as_str().to_string()),
        submitted_on: request.created_at.format("%B %-d, %Y").to_string(),
    }
}

/// Display the organization admin page.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    OrgSelection(selection): OrgSelection,
) -> Response {
    let profile = match fetch_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(response) => return response,
    };

    let org = match require_org_admin(&session, &user, &profile, selection, ORG_PAGE).await {
        Ok(org) => org,
        Err(response) => return response,
    };

    let token = &user.api_token;
    let members = match state.api().list_members(token, org.id).await {
        Ok(members) => members,
        Err(error) => return AppError::from(error).into_response(),
    };

    // The secondary cards degrade to empty rather than failing the page.
    let mut card_toasts = Vec::new();
    let invites = match state.api().list_invites(token, org.id).await {
        Ok(invites) => invites,
        Err(error) => {
            tracing::warn!(error = %error, "Invite list unavailable");
            card_toasts.push(Toast::error("Invites are unavailable right now."));
            Vec::new()
        }
    };
    let requests = match state.api().list_org_requests(token).await {
        Ok(requests) => requests,
        Err(error) => {
            tracing::warn!(error = %error, "Request list unavailable");
            card_toasts.push(Toast::error("Join requests are unavailable right now."));
            Vec::new()
        }
    };

    let mut shell = match PageShell::build(&session, &user, Some(org.name)).await {
        Ok(shell) => shell,
        Err(error) => return error.into_response(),
    };
    shell.toasts.extend(card_toasts);

    OrgAdminTemplate {
        shell,
        members: members.iter().map(|m| member_row(m, user.id)).collect(),
        invites: invites.iter().map(invite_row).collect(),
        requests: requests
            .iter()
            .filter(|r| r.status.is_pending())
            .map(request_row)
            .collect(),
        roles: OrgRole::all()
            .iter()
            .map(|r| (r.wire_name(), r.label()))
            .collect(),
    }
    .into_response()
}

/// Member update form data. Exactly one of the fields is set per submit.
#[derive(Debug, Deserialize)]
pub struct MemberForm {
    pub role: Option<String>,
    pub status: Option<String>,
}

/// Change a member's role or active status.
#[instrument(skip(state, session, user, form))]
pub async fn update_member(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    OrgSelection(selection): OrgSelection,
    Path(member): Path<i32>,
    Form(form): Form<MemberForm>,
) -> Result<Response, AppError> {
    let profile = match fetch_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(response) => return Ok(response),
    };
    let org = match require_org_admin(&session, &user, &profile, selection, ORG_PAGE).await {
        Ok(org) => org,
        Err(response) => return Ok(response),
    };

    let role = match form.role.as_deref() {
        Some(raw) => Some(
            raw.parse::<OrgRole>()
                .map_err(AppError::BadRequest)?,
        ),
        None => None,
    };
    let status = match form.status.as_deref() {
        Some("ACTIVE") => Some(MembershipStatus::Active),
        Some("DISABLED") => Some(MembershipStatus::Disabled),
        Some(other) => {
            return Err(AppError::BadRequest(format!("Unknown status: {other}")));
        }
        None => None,
    };

    if role.is_none() && status.is_none() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }

    let body = UpdateMemberBody { role, status };
    match state
        .api()
        .update_member(&user.api_token, org.id, MembershipId::new(member), &body)
        .await
    {
        Ok(updated) => {
            push_toast(
                &session,
                Toast::success(format!("Updated {}.", updated.email.as_str())),
            )
            .await?;
        }
        Err(error) => {
            push_toast(&session, Toast::error(error.toast_message())).await?;
        }
    }

    Ok(Redirect::to(ORG_PAGE).into_response())
}

/// Invite form data.
#[derive(Debug, Deserialize)]
pub struct InviteForm {
    pub email: String,
    pub role: String,
}

/// Send an invite.
#[instrument(skip(state, session, user, form))]
pub async fn invite(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    OrgSelection(selection): OrgSelection,
    Form(form): Form<InviteForm>,
) -> Result<Response, AppError> {
    let profile = match fetch_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(response) => return Ok(response),
    };
    let org = match require_org_admin(&session, &user, &profile, selection, ORG_PAGE).await {
        Ok(org) => org,
        Err(response) => return Ok(response),
    };

    let email = match Email::parse(&form.email) {
        Ok(email) => email,
        Err(_) => {
            push_toast(
                &session,
                Toast::error("That doesn't look like a valid email address."),
            )
            .await?;
            return Ok(Redirect::to(ORG_PAGE).into_response());
        }
    };
    let role: OrgRole = form.role.parse().map_err(AppError::BadRequest)?;

    let body = crate::api::InviteBody { email, role };
    match state.api().invite_member(&user.api_token, org.id, &body).await {
        Ok(sent) => {
            push_toast(
                &session,
                Toast::success(format!("Invite sent to {}.", sent.email.as_str())),
            )
            .await?;
        }
        Err(error) => {
            push_toast(&session, Toast::error(error.toast_message())).await?;
        }
    }

    Ok(Redirect::to(ORG_PAGE).into_response())
}

/// Revoke an open invite.
#[instrument(skip(state, session, user))]
pub async fn revoke_invite(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    OrgSelection(selection): OrgSelection,
    Path(invite): Path<i32>,
) -> Result<Response, AppError> {
    let profile = match fetch_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(response) => return Ok(response),
    };
    let org = match require_org_admin(&session, &user, &profile, selection, ORG_PAGE).await {
        Ok(org) => org,
        Err(response) => return Ok(response),
    };

    match state
        .api()
        .revoke_invite(&user.api_token, org.id, InviteId::new(invite))
        .await
    {
        Ok(revoked) => {
            push_toast(
                &session,
                Toast::success(format!("Invite to {} revoked.", revoked.email.as_str())),
            )
            .await?;
        }
        Err(error) => {
            push_toast(&session, Toast::error(error.toast_message())).await?;
        }
    }

    Ok(Redirect::to(ORG_PAGE).into_response())
}

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub decision: String,
    pub notes: Option<String>,
}

/// Approve or reject a join request.
#[instrument(skip(state, session, user, form))]
pub async fn review_request(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    OrgSelection(selection): OrgSelection,
    Path(request): Path<i32>,
    Form(form): Form<ReviewForm>,
) -> Result<Response, AppError> {
    let profile = match fetch_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(response) => return Ok(response),
    };
    if require_org_admin(&session, &user, &profile, selection, ORG_PAGE)
        .await
        .is_err()
    {
        return Ok(Redirect::to(ORG_PAGE).into_response());
    }

    let status = match form.decision.as_str() {
        "approve" => RequestStatus::Approved,
        "reject" => RequestStatus::Rejected,
        other => {
            return Err(AppError::BadRequest(format!("Unknown decision: {other}")));
        }
    };

    let notes = form.notes.filter(|n| !n.trim().is_empty());
    match state
        .api()
        .review_org_request(&user.api_token, OrgRequestId::new(request), status, notes)
        .await
    {
        Ok(reviewed) => {
            let verb = match reviewed.status {
                RequestStatus::Approved => "approved",
                RequestStatus::Rejected => "rejected",
                RequestStatus::Pending => "left pending",
            };
            push_toast(
                &session,
                Toast::success(format!("Request for \"{}\" {verb}.", reviewed.org_name)),
            )
            .await?;
        }
        Err(error) => {
            push_toast(&session, Toast::error(error.toast_message())).await?;
        }
    }

    Ok(Redirect::to(ORG_PAGE).into_response())
}
