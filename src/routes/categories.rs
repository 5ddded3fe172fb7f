use askama::Template;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;

use crate::catalog::BUILTIN_CATEGORIES;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::preferences::{self, ONBOARDING_CATEGORY_COUNT};
use crate::routes::home::Html;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/categories", get(categories_page).post(categories_submit))
}

#[derive(Template)]
#[template(path = "pages/categories.html")]
pub struct CategoriesTemplate {
    pub tiles: Vec<CategoryTile>,
    pub selected_count: usize,
    pub target_count: usize,
    pub selected_csv: String,
    pub can_continue: bool,
    pub error: String,
}

pub struct CategoryTile {
    pub name: String,
    pub description: String,
    pub selected: bool,
    /// Link that toggles this tile in the current selection.
    pub toggle_href: String,
}

#[derive(Deserialize)]
pub struct CategoriesQuery {
    pub selected: Option<String>,
    pub toggle: Option<String>,
}

#[derive(Deserialize)]
pub struct CategoriesForm {
    pub selected: String,
}

fn parse_selection(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        // Only ids the catalog knows about can be selected.
        .filter(|s| BUILTIN_CATEGORIES.iter().any(|c| c.id == *s))
        .map(str::to_string)
        .collect()
}

fn build_page(selection: Vec<String>, error: String) -> CategoriesTemplate {
    let selected_csv = selection.join(",");
    let tiles = BUILTIN_CATEGORIES
        .iter()
        .map(|c| CategoryTile {
            name: c.name.to_string(),
            description: c.description.to_string(),
            selected: selection.iter().any(|s| s == c.id),
            toggle_href: format!("/categories?selected={}&toggle={}", selected_csv, c.id),
        })
        .collect();

    CategoriesTemplate {
        selected_count: selection.len(),
        target_count: ONBOARDING_CATEGORY_COUNT,
        can_continue: selection.len() == ONBOARDING_CATEGORY_COUNT,
        selected_csv,
        tiles,
        error,
    }
}

/// GET /categories — onboarding category picker. Tiles are links that
/// toggle the selection server-side; picking a third category when two are
/// already chosen changes nothing.
pub async fn categories_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Query(query): Query<CategoriesQuery>,
) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(Redirect::to("/signin").into_response());
    };

    // Someone who already finished onboarding goes straight to the
    // dashboard; a failed check only logs, the picker still renders.
    match preferences::onboarding_complete(&state.backend, &user.id).await {
        Ok(true) => return Ok(Redirect::to("/dashboard").into_response()),
        Ok(false) => {}
        Err(err) => {
            tracing::error!(error = %err, "could not check onboarding status");
        }
    }

    let mut selection = parse_selection(query.selected.as_deref().unwrap_or(""));
    if let Some(toggle) = &query.toggle {
        selection = preferences::toggle_category(selection, toggle);
    }

    Ok(Html(build_page(selection, String::new())).into_response())
}

/// POST /categories — persist the selection as a full-replace upsert
pub async fn categories_submit(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Form(form): Form<CategoriesForm>,
) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(Redirect::to("/signin").into_response());
    };

    let selection = parse_selection(&form.selected);
    if selection.len() != ONBOARDING_CATEGORY_COUNT {
        let error = format!(
            "Please select exactly {} categories",
            ONBOARDING_CATEGORY_COUNT
        );
        return Ok(Html(build_page(selection, error)).into_response());
    }

    match preferences::save(&state.backend, &user.id, &selection).await {
        Ok(()) => Ok(Redirect::to("/dashboard").into_response()),
        Err(err) => {
            tracing::error!(error = %err, "could not save preferences");
            let error = "Failed to save preferences. Please try again.".to_string();
            Ok(Html(build_page(selection, error)).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_selection_drops_unknown_ids() {
        let selection = parse_selection("physical-activity,not-a-category,relationships");
        assert_eq!(selection, vec!["physical-activity", "relationships"]);
    }

    #[test]
    fn parse_selection_handles_empty_input() {
        assert!(parse_selection("").is_empty());
        assert!(parse_selection(" , ,").is_empty());
    }

    #[test]
    fn build_page_marks_selected_tiles() {
        let page = build_page(vec!["relationships".to_string()], String::new());
        let selected: Vec<_> = page.tiles.iter().filter(|t| t.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "Relationships");
        assert_eq!(page.selected_count, 1);
        assert!(!page.can_continue);
    }

    #[test]
    fn build_page_allows_continue_at_target_count() {
        let page = build_page(
            vec!["relationships".to_string(), "physical-activity".to_string()],
            String::new(),
        );
        assert!(page.can_continue);
        assert_eq!(page.selected_csv, "relationships,physical-activity");
    }
}
