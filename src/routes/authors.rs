//! Author list and add-author endpoints backing the author picker on the
//! post form.

use std::time::Duration;

use askama::Template;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::Deserialize;

use crate::backend::{retry_with_backoff, Backend, BackendError};
use crate::error::AppResult;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::models::{Author, NewAuthor};
use crate::routes::home::Html;
use crate::state::AppState;

pub const AUTHOR_FETCH_ATTEMPTS: u32 = 3;
pub const AUTHOR_FETCH_BASE_DELAY: Duration = Duration::from_secs(1);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/authors/search", get(search))
        .route("/authors/new", get(new_author_page).post(create_author))
}

/// Author list fetch with exponential backoff; the author table is the one
/// list that has historically needed retries.
pub async fn fetch_authors_with_backoff(backend: &Backend) -> Result<Vec<Author>, BackendError> {
    retry_with_backoff(AUTHOR_FETCH_ATTEMPTS, AUTHOR_FETCH_BASE_DELAY, |_attempt| {
        let backend = backend.clone();
        async move {
            backend
                .table("authors")
                .order_asc("name")
                .select::<Author>()
                .await
        }
    })
    .await
}

/// Case-insensitive name filter for the picker's search box.
pub(crate) fn filter_authors(authors: Vec<Author>, term: &str) -> Vec<Author> {
    if term.is_empty() {
        return authors;
    }
    let term = term.to_lowercase();
    authors
        .into_iter()
        .filter(|a| a.name.to_lowercase().contains(&term))
        .collect()
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /authors/search?q= — author options for the picker
pub async fn search(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<Author>>> {
    let authors = fetch_authors_with_backoff(&state.backend).await?;
    Ok(Json(filter_authors(authors, query.q.trim())))
}

#[derive(Template)]
#[template(path = "pages/add_author.html")]
pub struct AddAuthorTemplate {
    pub error: String,
    pub name: String,
    pub avatar_url: String,
}

#[derive(Deserialize)]
pub struct AddAuthorForm {
    pub name: String,
    #[serde(default)]
    pub avatar_url: String,
}

/// GET /authors/new — add-author form, reached from the post form
pub async fn new_author_page(maybe_user: MaybeUser) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(Redirect::to("/signin").into_response());
    };
    if !user.is_publisher() {
        return Ok(Redirect::to("/feeds").into_response());
    }

    Ok(Html(AddAuthorTemplate {
        error: String::new(),
        name: String::new(),
        avatar_url: String::new(),
    })
    .into_response())
}

/// POST /authors/new — create the author, then return to the post form
/// with the new author preselected
pub async fn create_author(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Form(form): Form<AddAuthorForm>,
) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(Redirect::to("/signin").into_response());
    };
    if !user.is_publisher() {
        return Ok(Redirect::to("/feeds").into_response());
    }

    let name = form.name.trim().to_string();
    if name.is_empty() {
        return Ok(Html(AddAuthorTemplate {
            error: "Author name is required".to_string(),
            name: String::new(),
            avatar_url: form.avatar_url,
        })
        .into_response());
    }

    let avatar_url = form.avatar_url.trim().to_string();
    let row = NewAuthor {
        name: name.clone(),
        avatar_url: (!avatar_url.is_empty()).then_some(avatar_url.clone()),
    };

    match state
        .backend
        .table("authors")
        .insert::<_, Author>(&row)
        .await
    {
        Ok(author) => Ok(Redirect::to(&format!("/create-post?author={}", author.id)).into_response()),
        Err(err) => {
            tracing::error!(error = %err, "could not create author");
            Ok(Html(AddAuthorTemplate {
                error: "Failed to create author".to_string(),
                name,
                avatar_url,
            })
            .into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(name: &str) -> Author {
        Author {
            id: format!("a-{}", name),
            name: name.to_string(),
            avatar_url: None,
            created_at: None,
        }
    }

    #[test]
    fn empty_term_returns_everything() {
        let authors = vec![author("Grace"), author("Alan")];
        assert_eq!(filter_authors(authors, "").len(), 2);
    }

    #[test]
    fn filter_is_case_insensitive() {
        let authors = vec![author("Grace Hopper"), author("Alan Turing")];
        let found = filter_authors(authors, "gRaCe");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Grace Hopper");
    }

    #[test]
    fn filter_matches_substrings() {
        let authors = vec![author("Grace Hopper"), author("Alan Turing")];
        let found = filter_authors(authors, "uring");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Alan Turing");
    }
}
