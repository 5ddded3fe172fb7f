use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{Duration, Utc};

use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::models::Post;
use crate::routes::feeds::{author_index, post_card, PostCard};
use crate::routes::home::Html;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/publisher-dashboard", get(publisher_dashboard))
        .route("/posts/{id}/delete", post(delete_post))
}

#[derive(Template)]
#[template(path = "pages/publisher_dashboard.html")]
pub struct PublisherDashboardTemplate {
    pub total_posts: usize,
    pub recent_posts: usize,
    pub cards: Vec<PublisherPostCard>,
    pub error: String,
}

pub struct PublisherPostCard {
    pub id: String,
    pub card: PostCard,
}

/// Posts from the last seven days count as recent.
pub(crate) fn recent_count(posts: &[Post], now: chrono::DateTime<Utc>) -> usize {
    let week_ago = now - Duration::days(7);
    posts.iter().filter(|p| p.created_at > week_ago).count()
}

/// GET /publisher-dashboard — the publisher's own posts with stats
pub async fn publisher_dashboard(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(Redirect::to("/signin").into_response());
    };
    if !user.is_publisher() {
        return Ok(Redirect::to("/feeds").into_response());
    }

    let posts: Vec<Post> = match state
        .backend
        .table("posts")
        .eq("publisher_id", &user.id)
        .order_desc("created_at")
        .select()
        .await
    {
        Ok(posts) => posts,
        Err(err) => {
            tracing::error!(error = %err, "could not fetch publisher posts");
            return Ok(Html(PublisherDashboardTemplate {
                total_posts: 0,
                recent_posts: 0,
                cards: Vec::new(),
                error: "Could not load your posts.".to_string(),
            })
            .into_response());
        }
    };

    let authors = author_index(&state).await;
    let cards = posts
        .iter()
        .map(|p| PublisherPostCard {
            id: p.id.clone(),
            card: post_card(p, &authors),
        })
        .collect();

    Ok(Html(PublisherDashboardTemplate {
        total_posts: posts.len(),
        recent_posts: recent_count(&posts, Utc::now()),
        cards,
        error: String::new(),
    })
    .into_response())
}

/// POST /posts/{id}/delete — delete one of the publisher's own posts.
/// The filter pins both the post id and the owning publisher, so one
/// publisher cannot delete another's post.
pub async fn delete_post(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(Redirect::to("/signin").into_response());
    };
    if !user.is_publisher() {
        return Ok(Redirect::to("/feeds").into_response());
    }

    if let Err(err) = state
        .backend
        .table("posts")
        .eq("id", &id)
        .eq("publisher_id", &user.id)
        .delete()
        .await
    {
        tracing::error!(error = %err, post_id = %id, "could not delete post");
    }

    Ok(Redirect::to("/publisher-dashboard").into_response())
}
