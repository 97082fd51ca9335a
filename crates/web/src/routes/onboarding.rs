//! Onboarding: request a new organization.
//!
//! A name collision comes back from the API as a 409. Instead of a terminal
//! error the form re-renders with a confirmation step; submitting again
//! with `force` set sends the request through for review anyway.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{PageShell, fetch_profile};
use crate::api::{ApiError, CreateOrgRequestBody};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::{Toast, push_toast};
use crate::state::AppState;

/// Onboarding page template.
#[derive(Template, WebTemplate)]
#[template(path = "onboarding/index.html")]
pub struct OnboardingTemplate {
    pub shell: PageShell,
    pub has_orgs: bool,
    /// Set after a 409: the submitted name plus the backend's message.
    pub duplicate: Option<DuplicatePrompt>,
}

/// Data for the duplicate-name confirmation step.
#[derive(Clone)]
pub struct DuplicatePrompt {
    pub org_name: String,
    pub message: String,
}

/// Display the onboarding form.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Response {
    let profile = match fetch_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(response) => return response,
    };

    let shell = match PageShell::build(&session, &user, None).await {
        Ok(shell) => shell,
        Err(error) => return error.into_response(),
    };

    OnboardingTemplate {
        shell,
        has_orgs: !profile.active_memberships().is_empty(),
        duplicate: None,
    }
    .into_response()
}

/// Onboarding form data.
#[derive(Debug, Deserialize)]
pub struct OnboardingForm {
    pub org_name: String,
    /// Present only on the confirm-duplicate resubmit.
    pub force: Option<String>,
}

/// Submit an organization request.
#[instrument(skip(state, session, user, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<OnboardingForm>,
) -> Result<Response, AppError> {
    let profile = match fetch_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(response) => return Ok(response),
    };

    let org_name = form.org_name.trim().to_string();
    if org_name.is_empty() {
        push_toast(&session, Toast::error("Enter an organization name.")).await?;
        return Ok(Redirect::to("/onboarding").into_response());
    }

    let body = CreateOrgRequestBody {
        org_name: org_name.clone(),
        force: form.force.is_some(),
    };

    match state.api().create_org_request(&user.api_token, &body).await {
        Ok(created) => {
            push_toast(
                &session,
                Toast::success(format!(
                    "Request for \"{}\" submitted. You'll get access once it's approved.",
                    created.org_name
                )),
            )
            .await?;
            let target = if profile.active_memberships().is_empty() {
                "/onboarding"
            } else {
                "/"
            };
            Ok(Redirect::to(target).into_response())
        }
        Err(ApiError::Conflict(message)) => {
            // Re-render with the confirmation step instead of bouncing.
            let shell = PageShell::build(&session, &user, None).await?;
            Ok(OnboardingTemplate {
                shell,
                has_orgs: !profile.active_memberships().is_empty(),
                duplicate: Some(DuplicatePrompt {
                    org_name,
                    message: if message.is_empty() {
                        "An organization with this name already exists.".to_string()
                    } else {
                        message
                    },
                }),
            }
            .into_response())
        }
        Err(error) => {
            push_toast(&session, Toast::error(error.toast_message())).await?;
            Ok(Redirect::to("/onboarding").into_response())
        }
    }
}
