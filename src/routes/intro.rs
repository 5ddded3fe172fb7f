use askama::Template;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;

use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::routes::home::Html;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/intro", get(intro_page))
}

#[derive(Template)]
#[template(path = "pages/intro.html")]
pub struct IntroTemplate {
    pub greeting_name: String,
}

/// GET /intro — welcome screen shown after account creation
pub async fn intro_page(maybe_user: MaybeUser) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(Redirect::to("/signin").into_response());
    };

    let greeting_name = user
        .first_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "friend".to_string());

    Ok(Html(IntroTemplate { greeting_name }).into_response())
}
