use std::collections::HashMap;

use askama::Template;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;

use crate::catalog;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::models::{Author, Post};
use crate::preferences;
use crate::routes::home::Html;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/feeds", get(feeds_page))
}

#[derive(Template)]
#[template(path = "pages/feeds.html")]
pub struct FeedsTemplate {
    pub cards: Vec<PostCard>,
    pub no_categories: bool,
    pub error: String,
    pub is_publisher: bool,
    pub role_warning: String,
}

pub struct PostCard {
    pub title: String,
    pub content: String,
    pub author_name: String,
    pub author_initial: String,
    pub author_avatar: String,
    pub thumbnail_url: String,
    pub category_name: String,
    pub created_date: String,
}

pub(crate) fn post_card(post: &Post, authors: &HashMap<String, Author>) -> PostCard {
    let (author_name, author_avatar) = match authors.get(&post.author_id) {
        Some(author) => (
            author.name.clone(),
            author.avatar_url.clone().unwrap_or_default(),
        ),
        None => ("Unknown author".to_string(), String::new()),
    };
    let author_initial = author_name
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_default();

    PostCard {
        title: post.title.clone(),
        content: post.content.clone(),
        author_name,
        author_initial,
        author_avatar,
        thumbnail_url: post.thumbnail_url.clone().unwrap_or_default(),
        category_name: catalog::display_name(&post.category_id).to_string(),
        created_date: post.created_at.format("%b %d, %Y").to_string(),
    }
}

/// Byline records keyed by id. Failure degrades to "Unknown author" rather
/// than taking the whole feed down.
pub(crate) async fn author_index(state: &AppState) -> HashMap<String, Author> {
    match state
        .backend
        .table("authors")
        .select::<Author>()
        .await
    {
        Ok(authors) => authors.into_iter().map(|a| (a.id.clone(), a)).collect(),
        Err(err) => {
            tracing::error!(error = %err, "could not fetch authors for the feed");
            HashMap::new()
        }
    }
}

/// GET /feeds — posts from the reader's selected categories, newest first
pub async fn feeds_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(Redirect::to("/signin").into_response());
    };

    let is_publisher = user.is_publisher();
    let role_warning = user.role_warning.clone().unwrap_or_default();

    let prefs = match preferences::get(&state.backend, &user.id).await {
        Ok(prefs) => prefs,
        Err(err) => {
            tracing::error!(error = %err, "could not fetch preferences");
            return Ok(Html(FeedsTemplate {
                cards: Vec::new(),
                no_categories: false,
                error: "Could not load your preferences.".to_string(),
                is_publisher,
                role_warning,
            })
            .into_response());
        }
    };

    if !preferences::has_feed_categories(prefs.as_ref()) {
        return Ok(Html(FeedsTemplate {
            cards: Vec::new(),
            no_categories: true,
            error: String::new(),
            is_publisher,
            role_warning,
        })
        .into_response());
    }

    let selected = prefs
        .map(|p| p.selected_categories)
        .unwrap_or_default();

    let posts: Vec<Post> = match state
        .backend
        .table("posts")
        .in_list("category_id", &selected)
        .order_desc("created_at")
        .select()
        .await
    {
        Ok(posts) => posts,
        Err(err) => {
            tracing::error!(error = %err, "could not fetch posts");
            return Ok(Html(FeedsTemplate {
                cards: Vec::new(),
                no_categories: false,
                error: "Could not load posts.".to_string(),
                is_publisher,
                role_warning,
            })
            .into_response());
        }
    };

    let authors = author_index(&state).await;
    let cards = posts.iter().map(|p| post_card(p, &authors)).collect();

    Ok(Html(FeedsTemplate {
        cards,
        no_categories: false,
        error: String::new(),
        is_publisher,
        role_warning,
    })
    .into_response())
}
