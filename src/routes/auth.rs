use askama::Template;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::error::AppResult;
use crate::models::{ProfileMetadata, Role};
use crate::routes::home::Html;
use crate::state::AppState;

/// Passwords shorter than this are rejected at the form.
const MIN_PASSWORD_LEN: usize = 6;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signin", get(signin_page).post(signin_submit))
        .route("/signup", get(signup_page).post(signup_submit))
        .route("/signout", post(signout))
}

// -- Templates --

#[derive(Template)]
#[template(path = "pages/signin.html")]
pub struct SigninTemplate {
    pub error: String,
    pub created: bool,
}

#[derive(Template)]
#[template(path = "pages/signup.html")]
pub struct SignupTemplate {
    pub error: String,
}

// -- Request types --

#[derive(Deserialize)]
pub struct SigninQuery {
    pub created: Option<String>,
}

#[derive(Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignUpForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: String,
}

// -- Handlers --

/// GET /signin — render the sign-in form
pub async fn signin_page(Query(query): Query<SigninQuery>) -> AppResult<Response> {
    Ok(Html(SigninTemplate {
        error: String::new(),
        created: query.created.is_some(),
    })
    .into_response())
}

/// POST /signin — password sign-in; on success the root dispatcher sends
/// the user onward based on onboarding state
pub async fn signin_submit(
    State(state): State<AppState>,
    Form(form): Form<SignInForm>,
) -> AppResult<Response> {
    match state.session.sign_in(&form.email, &form.password).await {
        Ok(()) => Ok(Redirect::to("/").into_response()),
        Err(err) => {
            tracing::warn!(error = %err, "sign-in failed");
            Ok(Html(SigninTemplate {
                error: err.to_string(),
                created: false,
            })
            .into_response())
        }
    }
}

/// GET /signup — render the sign-up form
pub async fn signup_page() -> AppResult<Response> {
    Ok(Html(SignupTemplate {
        error: String::new(),
    })
    .into_response())
}

/// POST /signup — create an account with a role choice, then send the user
/// to sign in
pub async fn signup_submit(
    State(state): State<AppState>,
    Form(form): Form<SignUpForm>,
) -> AppResult<Response> {
    if let Some(message) = validate_signup(&form) {
        return Ok(Html(SignupTemplate {
            error: message.to_string(),
        })
        .into_response());
    }

    let metadata = ProfileMetadata {
        first_name: Some(form.first_name.trim().to_string()),
        last_name: Some(form.last_name.trim().to_string()),
    };
    let role = match form.role.as_str() {
        "publisher" => Role::Publisher,
        _ => Role::Reader,
    };

    match state
        .session
        .sign_up(&form.email, &form.password, metadata, role)
        .await
    {
        Ok(()) => Ok(Redirect::to("/signin?created=1").into_response()),
        Err(err) => {
            tracing::warn!(error = %err, "sign-up failed");
            Ok(Html(SignupTemplate {
                error: err.to_string(),
            })
            .into_response())
        }
    }
}

fn validate_signup(form: &SignUpForm) -> Option<&'static str> {
    if form.password != form.confirm_password {
        return Some("Passwords do not match");
    }
    if form.password.len() < MIN_PASSWORD_LEN {
        return Some("Password must be at least 6 characters");
    }
    if form.first_name.trim().is_empty() || form.last_name.trim().is_empty() {
        return Some("First name and last name are required");
    }
    None
}

/// POST /signout — end the session and return to sign-in. A failed remote
/// sign-out still lands on sign-in; there is nothing useful to do with it.
pub async fn signout(State(state): State<AppState>) -> AppResult<Response> {
    if let Err(err) = state.session.sign_out().await {
        tracing::error!(error = %err, "sign-out failed");
    }
    Ok(Redirect::to("/signin").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> SignUpForm {
        SignUpForm {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            role: "reader".into(),
        }
    }

    #[test]
    fn valid_form_passes() {
        assert!(validate_signup(&form()).is_none());
    }

    #[test]
    fn mismatched_passwords_are_rejected() {
        let mut form = form();
        form.confirm_password = "other1".into();
        assert_eq!(validate_signup(&form), Some("Passwords do not match"));
    }

    #[test]
    fn short_passwords_are_rejected() {
        let mut form = form();
        form.password = "abc".into();
        form.confirm_password = "abc".into();
        assert_eq!(
            validate_signup(&form),
            Some("Password must be at least 6 characters")
        );
    }

    #[test]
    fn blank_names_are_rejected() {
        let mut form = form();
        form.first_name = "   ".into();
        assert_eq!(
            validate_signup(&form),
            Some("First name and last name are required")
        );
    }
}
