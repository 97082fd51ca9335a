//! Invite landing and acceptance.
//!
//! The emailed link carries an opaque token. Accepting joins the signed-in
//! user to the inviting organization; the backend checks expiry, revocation,
//! and that the token's email matches the signed-in account.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use super::PageShell;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{Toast, push_toast, session_keys};
use crate::state::AppState;

/// Invite landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "invites/show.html")]
pub struct InviteTemplate {
    pub shell: PageShell,
    pub invite_token: String,
}

/// Display the invite landing page.
///
/// The token is only validated on accept, so this page renders for any
/// well-formed link.
#[instrument(skip(session, user))]
pub async fn show(
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(token): Path<String>,
) -> Result<InviteTemplate, AppError> {
    let shell = PageShell::build(&session, &user, None).await?;
    Ok(InviteTemplate {
        shell,
        invite_token: token,
    })
}

/// Accept the invite and switch to the joined organization.
#[instrument(skip(state, session, user, token))]
pub async fn accept(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    match state.api().accept_invite(&user.api_token, &token).await {
        Ok(membership) => {
            session
                .insert(session_keys::SELECTED_ORG, membership.org_id)
                .await?;
            push_toast(
                &session,
                Toast::success(format!("Welcome to {}!", membership.org_name)),
            )
            .await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(error) => {
            push_toast(&session, Toast::error(error.toast_message())).await?;
            Ok(Redirect::to("/").into_response())
        }
    }
}
