use askama::Template;
use axum::extract::multipart::Multipart;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use serde::Deserialize;

use crate::backend::storage::{validate_thumbnail, MAX_THUMBNAIL_BYTES};
use crate::error::{AppError, AppResult};
use crate::extractors::MaybeUser;
use crate::models::{Category, NewPost};
use crate::routes::authors::fetch_authors_with_backoff;
use crate::routes::home::Html;
use crate::state::AppState;

/// Body cap for the post form: the thumbnail limit plus room for the text
/// fields and multipart framing.
const FORM_BODY_LIMIT: usize = MAX_THUMBNAIL_BYTES + 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-post", get(create_post_page).post(create_post_submit))
        .layer(DefaultBodyLimit::max(FORM_BODY_LIMIT))
}

#[derive(Template)]
#[template(path = "pages/create_post.html")]
pub struct CreatePostTemplate {
    pub categories: Vec<Category>,
    pub authors: Vec<AuthorOption>,
    pub error: String,
    pub author_error: String,
}

pub struct AuthorOption {
    pub id: String,
    pub name: String,
    pub selected: bool,
}

#[derive(Deserialize)]
pub struct CreatePostQuery {
    /// Author id to preselect, set after inline author creation.
    pub author: Option<String>,
}

async fn build_form(
    state: &AppState,
    selected_author: Option<&str>,
    error: String,
) -> CreatePostTemplate {
    let categories = state.catalog.authoring_list().await;

    let (authors, author_error) = match fetch_authors_with_backoff(&state.backend).await {
        Ok(authors) => (authors, String::new()),
        Err(err) => {
            tracing::error!(error = %err, "could not fetch authors");
            (
                Vec::new(),
                "Failed to load authors. Please try again.".to_string(),
            )
        }
    };
    let authors = authors
        .into_iter()
        .map(|a| AuthorOption {
            selected: selected_author == Some(a.id.as_str()),
            id: a.id,
            name: a.name,
        })
        .collect();

    CreatePostTemplate {
        categories,
        authors,
        error,
        author_error,
    }
}

/// GET /create-post — post form; publisher only
pub async fn create_post_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Query(query): Query<CreatePostQuery>,
) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(Redirect::to("/signin").into_response());
    };
    if !user.is_publisher() {
        return Ok(Redirect::to("/feeds").into_response());
    }

    // Authoring needs the remote category ids; a failed refresh falls back
    // to the last snapshot (or the built-in catalog).
    if let Err(err) = state.catalog.refresh().await {
        tracing::warn!(error = %err, "could not refresh categories");
    }

    let form = build_form(&state, query.author.as_deref(), String::new()).await;
    Ok(Html(form).into_response())
}

#[derive(Default)]
struct SubmittedPost {
    title: String,
    content: String,
    category_id: String,
    author_id: String,
    thumbnail_url: String,
    file_name: String,
    file_content_type: Option<String>,
    file_data: Bytes,
}

async fn read_form(mut multipart: Multipart) -> AppResult<SubmittedPost> {
    let mut post = SubmittedPost::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => post.title = read_text(field).await?,
            "content" => post.content = read_text(field).await?,
            "category_id" => post.category_id = read_text(field).await?,
            "author_id" => post.author_id = read_text(field).await?,
            "thumbnail_url" => post.thumbnail_url = read_text(field).await?,
            "thumbnail" => {
                post.file_name = field.file_name().unwrap_or_default().to_string();
                post.file_content_type = field.content_type().map(str::to_string);
                post.file_data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid upload: {}", e)))?;
            }
            _ => {}
        }
    }

    Ok(post)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map(|s| s.trim().to_string())
        .map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))
}

/// POST /create-post — validate, upload the thumbnail when one was
/// attached, insert the row, and land on the feed
pub async fn create_post_submit(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let Some(user) = maybe_user.0 else {
        return Ok(Redirect::to("/signin").into_response());
    };
    if !user.is_publisher() {
        return Ok(Redirect::to("/feeds").into_response());
    }

    let post = read_form(multipart).await?;
    let selected_author = post.author_id.clone();

    if post.title.is_empty()
        || post.content.is_empty()
        || post.category_id.is_empty()
        || post.author_id.is_empty()
    {
        let error = "Title, content, category and author are required".to_string();
        let form = build_form(&state, Some(&selected_author), error).await;
        return Ok(Html(form).into_response());
    }

    // An uploaded file wins over a pasted URL; both are optional.
    let thumbnail_url = if !post.file_data.is_empty() {
        let content_type = match validate_thumbnail(
            &post.file_name,
            post.file_content_type.as_deref(),
            post.file_data.len(),
        ) {
            Ok(content_type) => content_type,
            Err(err) => {
                let form = build_form(&state, Some(&selected_author), err.to_string()).await;
                return Ok(Html(form).into_response());
            }
        };

        let extension = post
            .file_name
            .rsplit('.')
            .next()
            .unwrap_or("img")
            .to_string();
        let path = format!(
            "thumbnails/{}-{}.{}",
            user.id,
            uuid::Uuid::now_v7(),
            extension
        );

        match state
            .backend
            .upload_post_image(&path, &content_type, post.file_data.clone())
            .await
        {
            Ok(()) => Some(state.backend.public_image_url(&path)?),
            Err(err) => {
                tracing::error!(error = %err, "thumbnail upload failed");
                let error = format!("Failed to upload image: {}", err);
                let form = build_form(&state, Some(&selected_author), error).await;
                return Ok(Html(form).into_response());
            }
        }
    } else if !post.thumbnail_url.is_empty() {
        Some(post.thumbnail_url.clone())
    } else {
        None
    };

    let row = NewPost {
        title: post.title,
        content: post.content,
        category_id: post.category_id,
        author_id: post.author_id,
        publisher_id: user.id.clone(),
        thumbnail_url,
    };

    match state.backend.table("posts").insert_only(&row).await {
        Ok(()) => Ok(Redirect::to("/feeds").into_response()),
        Err(err) => {
            tracing::error!(error = %err, "could not create post");
            let error = "Failed to create post".to_string();
            let form = build_form(&state, Some(&selected_author), error).await;
            Ok(Html(form).into_response())
        }
    }
}
