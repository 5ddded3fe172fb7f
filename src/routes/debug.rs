//! Diagnostic pages for inspecting the mirrored session, role, and
//! preference rows without a database console.

use askama::Template;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::error::AppResult;
use crate::extractors::{MaybeUser, Session};
use crate::models::UserRoleRow;
use crate::preferences;
use crate::routes::home::Html;
use crate::session::SessionState;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/debug", get(debug_page))
        .route("/debug-role", get(debug_role_page))
}

#[derive(Template)]
#[template(path = "pages/debug.html")]
pub struct DebugTemplate {
    pub signed_in: bool,
    pub backend_url: String,
    pub user_id: String,
    pub email: String,
    pub preferences_json: String,
    pub onboarding: String,
    pub error: String,
}

/// GET /debug — raw preference row and onboarding status
pub async fn debug_page(State(state): State<AppState>, maybe_user: MaybeUser) -> AppResult<Response> {
    let backend_url = state.config.backend.url.clone();

    let Some(user) = maybe_user.0 else {
        return Ok(Html(DebugTemplate {
            signed_in: false,
            backend_url,
            user_id: String::new(),
            email: String::new(),
            preferences_json: String::new(),
            onboarding: String::new(),
            error: String::new(),
        })
        .into_response());
    };

    let (preferences_json, onboarding, error) =
        match preferences::get(&state.backend, &user.id).await {
            Ok(prefs) => {
                let onboarding = if preferences::is_complete(prefs.as_ref()) {
                    "Yes"
                } else {
                    "No"
                };
                let json = match &prefs {
                    Some(p) => serde_json::to_string_pretty(p)?,
                    None => "null".to_string(),
                };
                (json, onboarding.to_string(), String::new())
            }
            Err(err) => (String::new(), "Unknown".to_string(), err.to_string()),
        };

    Ok(Html(DebugTemplate {
        signed_in: true,
        backend_url,
        user_id: user.id,
        email: user.email.unwrap_or_default(),
        preferences_json,
        onboarding,
        error,
    })
    .into_response())
}

#[derive(Template)]
#[template(path = "pages/debug_role.html")]
pub struct DebugRoleTemplate {
    pub state_name: String,
    pub user_id: String,
    pub email: String,
    pub role: String,
    pub is_publisher: bool,
    pub role_rows_json: String,
    pub error: String,
}

/// GET /debug-role — mirrored role state plus a direct role-table query
pub async fn debug_role_page(
    State(state): State<AppState>,
    session: Session,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    let state_name = match &session.0 {
        SessionState::SignedOut => "signed-out",
        SessionState::Initializing => "initializing",
        SessionState::Authenticated(_) => "authenticated",
        SessionState::Error { .. } => "error",
    }
    .to_string();

    let Some(user) = maybe_user.0 else {
        return Ok(Html(DebugRoleTemplate {
            state_name,
            user_id: "Not logged in".to_string(),
            email: "Not logged in".to_string(),
            role: "No role found".to_string(),
            is_publisher: false,
            role_rows_json: String::new(),
            error: String::new(),
        })
        .into_response());
    };

    // Bypass the mirror and ask the table directly, to expose drift.
    let (role_rows_json, error) = match state
        .backend
        .table("user_roles")
        .eq("user_id", &user.id)
        .select::<UserRoleRow>()
        .await
    {
        Ok(rows) => (serde_json::to_string_pretty(&rows)?, String::new()),
        Err(err) => (String::new(), err.to_string()),
    };

    Ok(Html(DebugRoleTemplate {
        state_name,
        user_id: user.id.clone(),
        email: user.email.clone().unwrap_or_default(),
        role: user
            .role
            .map(|r| r.as_str().to_string())
            .unwrap_or_else(|| "No role found".to_string()),
        is_publisher: user.is_publisher(),
        role_rows_json,
        error,
    })
    .into_response())
}
