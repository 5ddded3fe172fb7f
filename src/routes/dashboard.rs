use askama::Template;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;

use crate::catalog;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::preferences;
use crate::routes::home::Html;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard_page))
}

#[derive(Template)]
#[template(path = "pages/dashboard.html")]
pub struct DashboardTemplate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub user_id: String,
    pub created_date: String,
    pub category_names: Vec<String>,
    pub has_categories: bool,
    pub prefs_error: String,
    pub is_publisher: bool,
}

/// GET /dashboard — account overview with the selected categories
pub async fn dashboard_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(Redirect::to("/signin").into_response());
    };

    let (category_names, prefs_error) = match preferences::get(&state.backend, &user.id).await {
        Ok(prefs) => {
            let ids = prefs.map(|p| p.selected_categories).unwrap_or_default();
            (catalog::display_names(&ids), String::new())
        }
        Err(err) => {
            tracing::error!(error = %err, "could not fetch preferences");
            (
                Vec::new(),
                "Could not load your selected categories.".to_string(),
            )
        }
    };

    Ok(Html(DashboardTemplate {
        first_name: user.first_name.clone().unwrap_or_default(),
        last_name: user.last_name.clone().unwrap_or_default(),
        email: user.email.clone().unwrap_or_default(),
        user_id: user.id.clone(),
        created_date: user
            .created_at
            .map(|t| t.format("%b %d, %Y").to_string())
            .unwrap_or_default(),
        has_categories: !category_names.is_empty(),
        category_names,
        prefs_error,
        is_publisher: user.is_publisher(),
    })
    .into_response())
}
