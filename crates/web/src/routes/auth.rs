//! Sign-in, provider callback, and sign-out.
//!
//! Sign-in is fully delegated to the hosted identity provider. The provider
//! redirects back to `/auth/callback` with a bearer token; the first API
//! call with that token creates the Moorline user row if needed.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::ApiError;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{clear_session, set_current_user};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Sign-in page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/sign_in.html")]
pub struct SignInTemplate {
    pub authorize_url: String,
    pub expired: bool,
}

/// Sign-in failure template, with a retry link.
#[derive(Template, WebTemplate)]
#[template(path = "auth/error.html")]
pub struct AuthErrorTemplate {
    pub message: String,
}

/// Sign-in page query parameters.
#[derive(Debug, Deserialize)]
pub struct SignInQuery {
    pub return_to: Option<String>,
    pub expired: Option<String>,
}

/// Display the sign-in page.
///
/// Remembers `return_to` in the session so the callback can land the user
/// back where they started.
#[instrument(skip(state, session))]
pub async fn sign_in_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<SignInQuery>,
) -> Result<SignInTemplate, AppError> {
    if let Some(return_to) = query
        .return_to
        .filter(|r| r.starts_with('/') && !r.starts_with("//"))
    {
        session.insert(session_keys::RETURN_TO, return_to).await?;
    }

    Ok(SignInTemplate {
        authorize_url: state.config().auth.authorize_url.clone(),
        expired: query.expired.is_some(),
    })
}

/// Callback query parameters from the identity provider.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub token: String,
}

/// Handle the provider redirect.
///
/// Exchanges the token for a profile (which creates the user on first
/// sign-in) and establishes the session. Failures render a page with a
/// retry link instead of a bare error, since first-sign-in races are
/// usually transient.
#[instrument(skip(state, session, query))]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let profile = match state.api().current_user(&query.token).await {
        Ok(profile) => profile,
        Err(ApiError::Unauthorized) => {
            return AuthErrorTemplate {
                message: "The sign-in could not be verified.".to_string(),
            }
            .into_response();
        }
        Err(error) => {
            tracing::warn!(error = %error, "Sign-in profile fetch failed");
            return AuthErrorTemplate {
                message: "We could not finish signing you in.".to_string(),
            }
            .into_response();
        }
    };

    let user = CurrentUser {
        id: profile.user.id,
        email: profile.user.email.clone(),
        name: profile.user.name.clone(),
        is_super_admin: profile.user.is_super_admin,
        api_token: query.token,
    };

    if let Err(error) = set_current_user(&session, &user).await {
        return AppError::from(error).into_response();
    }

    set_sentry_user(&user.id, Some(user.email.as_str()));

    let return_to = session
        .remove::<String>(session_keys::RETURN_TO)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| "/".to_string());

    Redirect::to(&return_to).into_response()
}

/// Sign out and clear the session.
#[instrument(skip(session))]
pub async fn sign_out(session: Session) -> Result<Redirect, AppError> {
    clear_session(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/auth/sign-in"))
}
