use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};

use crate::error::AppResult;
use crate::extractors::Session;
use crate::session::SessionState;

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate;

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// GET / — dispatch to the right place for the current session state
pub async fn index(session: Session) -> AppResult<Response> {
    match session.0 {
        SessionState::Authenticated(_) => Ok(Redirect::to("/feeds").into_response()),
        SessionState::Error { .. } => Ok(Redirect::to("/signin").into_response()),
        SessionState::SignedOut | SessionState::Initializing => {
            Ok(Html(HomeTemplate).into_response())
        }
    }
}
