//! Integration tests that run the client against an in-process stub of the
//! hosted platform (auth + table endpoints served by a local router).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use filo::backend::auth::AuthSession;
use filo::backend::{Backend, BackendError};
use filo::config::BackendConfig;
use filo::models::{Post, ProfileMetadata, RemoteUser, Role};
use filo::preferences;
use filo::session::token_cache::TokenCache;
use filo::session::{SessionContext, SessionState};

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn backend_for(addr: SocketAddr) -> Backend {
    Backend::new(&BackendConfig {
        url: format!("http://{}", addr),
        api_key: "test-key".to_string(),
    })
    .unwrap()
}

fn user_json() -> Value {
    json!({
        "id": "u-1",
        "email": "ada@example.com",
        "user_metadata": { "first_name": "Ada", "last_name": "Lovelace" },
        "created_at": "2025-01-01T00:00:00Z"
    })
}

fn session_json() -> Value {
    json!({
        "access_token": "access-1",
        "refresh_token": "refresh-1",
        "expires_in": 3600,
        "user": user_json()
    })
}

fn cached_session(expires_at: i64) -> AuthSession {
    AuthSession {
        access_token: "access-0".into(),
        refresh_token: "refresh-0".into(),
        expires_at,
        user: RemoteUser {
            id: "u-1".into(),
            email: Some("ada@example.com".into()),
            user_metadata: ProfileMetadata::default(),
            created_at: None,
        },
    }
}

#[tokio::test]
async fn sign_up_writes_the_chosen_role() {
    let recorded: Arc<Mutex<Vec<Value>>> = Arc::default();
    let rec = recorded.clone();

    let app = Router::new()
        .route(
            "/auth/v1/signup",
            post(|| async { Json(user_json()) }),
        )
        .route(
            "/rest/v1/user_roles",
            post(move |Json(body): Json<Value>| {
                let rec = rec.clone();
                async move {
                    rec.lock().unwrap().push(body);
                    StatusCode::CREATED
                }
            }),
        );
    let addr = serve(app).await;

    let tmp = tempfile::tempdir().unwrap();
    let ctx = SessionContext::new(backend_for(addr), TokenCache::new(tmp.path()));

    ctx.sign_up(
        "ada@example.com",
        "secret1",
        ProfileMetadata {
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
        },
        Role::Publisher,
    )
    .await
    .unwrap();

    let rows = recorded.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user_id"], "u-1");
    assert_eq!(rows[0]["role"], "publisher");
}

#[tokio::test]
async fn failed_role_write_at_sign_up_self_heals_to_reader() {
    let inserts = Arc::new(AtomicU32::new(0));
    let recorded: Arc<Mutex<Vec<Value>>> = Arc::default();

    let inserts_post = inserts.clone();
    let rec = recorded.clone();
    let inserts_get = inserts.clone();

    let app = Router::new()
        .route("/auth/v1/signup", post(|| async { Json(user_json()) }))
        .route(
            "/auth/v1/token",
            post(|| async { Json(session_json()) }),
        )
        .route(
            "/rest/v1/user_roles",
            get(move |_q: Query<HashMap<String, String>>| {
                let inserts = inserts_get.clone();
                async move {
                    if inserts.load(Ordering::SeqCst) < 2 {
                        // No role row yet.
                        (
                            StatusCode::NOT_ACCEPTABLE,
                            Json(json!({ "code": "PGRST116", "message": "no rows" })),
                        )
                            .into_response()
                    } else {
                        Json(json!({ "user_id": "u-1", "role": "reader" })).into_response()
                    }
                }
            })
            .post(move |Json(body): Json<Value>| {
                let inserts = inserts_post.clone();
                let rec = rec.clone();
                async move {
                    // The first write (during sign-up) fails; later writes
                    // (the lazy default) succeed.
                    if inserts.fetch_add(1, Ordering::SeqCst) == 0 {
                        StatusCode::INTERNAL_SERVER_ERROR.into_response()
                    } else {
                        rec.lock().unwrap().push(body);
                        StatusCode::CREATED.into_response()
                    }
                }
            }),
        );
    let addr = serve(app).await;

    let tmp = tempfile::tempdir().unwrap();
    let ctx = SessionContext::new(backend_for(addr), TokenCache::new(tmp.path()));

    // Sign-up succeeds even though the role write fails.
    ctx.sign_up(
        "ada@example.com",
        "secret1",
        ProfileMetadata::default(),
        Role::Publisher,
    )
    .await
    .unwrap();

    // The next sign-in finds no role row and creates the reader default.
    ctx.sign_in("ada@example.com", "secret1").await.unwrap();

    match ctx.state().await {
        SessionState::Authenticated(session) => {
            assert_eq!(session.role, Some(Role::Reader));
            assert!(session.role_warning.is_none());
        }
        other => panic!("expected authenticated session, got {:?}", other),
    }
    let rows = recorded.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["role"], "reader");
}

#[tokio::test]
async fn role_fetch_retries_through_transient_failures() {
    let attempts = Arc::new(AtomicU32::new(0));
    let attempts_get = attempts.clone();

    let app = Router::new()
        .route("/auth/v1/token", post(|| async { Json(session_json()) }))
        .route(
            "/rest/v1/user_roles",
            get(move |_q: Query<HashMap<String, String>>| {
                let attempts = attempts_get.clone();
                async move {
                    // Two transient failures, then success.
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "message": "transient" })),
                        )
                            .into_response()
                    } else {
                        Json(json!({ "user_id": "u-1", "role": "publisher" })).into_response()
                    }
                }
            }),
        );
    let addr = serve(app).await;

    let tmp = tempfile::tempdir().unwrap();
    let ctx = SessionContext::new(backend_for(addr), TokenCache::new(tmp.path()));

    ctx.sign_in("ada@example.com", "secret1").await.unwrap();

    match ctx.state().await {
        SessionState::Authenticated(session) => {
            assert_eq!(session.role, Some(Role::Publisher));
            assert!(session.is_publisher());
        }
        other => panic!("expected authenticated session, got {:?}", other),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_role_retries_leave_a_null_role_and_a_warning() {
    let attempts = Arc::new(AtomicU32::new(0));
    let attempts_get = attempts.clone();

    let app = Router::new()
        .route("/auth/v1/token", post(|| async { Json(session_json()) }))
        .route(
            "/rest/v1/user_roles",
            get(move |_q: Query<HashMap<String, String>>| {
                let attempts = attempts_get.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "message": "down" })),
                    )
                }
            }),
        );
    let addr = serve(app).await;

    let tmp = tempfile::tempdir().unwrap();
    let ctx = SessionContext::new(backend_for(addr), TokenCache::new(tmp.path()));

    // Sign-in itself succeeds; only the role stays unresolved.
    ctx.sign_in("ada@example.com", "secret1").await.unwrap();

    match ctx.state().await {
        SessionState::Authenticated(session) => {
            assert_eq!(session.role, None);
            assert!(!session.is_publisher());
            assert!(session.role_warning.is_some());
        }
        other => panic!("expected authenticated session, got {:?}", other),
    }
    // At most three attempts were made.
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn preference_save_round_trips_through_the_stub() {
    let stored: Arc<Mutex<Option<Value>>> = Arc::default();
    let stored_post = stored.clone();
    let stored_get = stored.clone();

    let app = Router::new().route(
        "/rest/v1/user_preferences",
        get(move |_q: Query<HashMap<String, String>>| {
            let stored = stored_get.clone();
            async move {
                match stored.lock().unwrap().clone() {
                    Some(row) => Json(row).into_response(),
                    None => (
                        StatusCode::NOT_ACCEPTABLE,
                        Json(json!({ "code": "PGRST116", "message": "no rows" })),
                    )
                        .into_response(),
                }
            }
        })
        .post(move |Json(body): Json<Value>| {
            let stored = stored_post.clone();
            async move {
                *stored.lock().unwrap() = Some(body);
                StatusCode::CREATED
            }
        }),
    );
    let addr = serve(app).await;
    let backend = backend_for(addr);

    let selected = vec![
        "relationships".to_string(),
        "physical-activity".to_string(),
    ];
    preferences::save(&backend, "u-1", &selected).await.unwrap();

    let read = preferences::get(&backend, "u-1").await.unwrap().unwrap();
    assert_eq!(read.selected_categories, selected);
    assert!(preferences::is_complete(Some(&read)));
    assert!(preferences::onboarding_complete(&backend, "u-1")
        .await
        .unwrap());
}

#[derive(Clone, Default)]
struct PostsStore(Arc<Mutex<Vec<Value>>>);

fn posts_router(store: PostsStore) -> Router {
    let store_post = store.clone();
    let store_get = store.clone();
    Router::new().route(
        "/rest/v1/posts",
        post(move |Json(body): Json<Value>| {
            let store = store_post.clone();
            async move {
                let mut rows = store.0.lock().unwrap();
                let n = rows.len();
                let mut row = body;
                row["id"] = json!(format!("p-{}", n));
                row["created_at"] = json!(format!("2025-01-01T00:00:{:02}Z", n));
                rows.push(row);
                StatusCode::CREATED
            }
        })
        .get(move |Query(q): Query<HashMap<String, String>>| {
            let store = store_get.clone();
            async move {
                let mut rows = store.0.lock().unwrap().clone();
                if let Some(filter) = q.get("category_id") {
                    if let Some(ids) = filter
                        .strip_prefix("in.(")
                        .and_then(|s| s.strip_suffix(')'))
                    {
                        let ids: Vec<&str> = ids.split(',').collect();
                        rows.retain(|r| {
                            ids.contains(&r["category_id"].as_str().unwrap_or_default())
                        });
                    }
                }
                if q.get("order").map(String::as_str) == Some("created_at.desc") {
                    rows.sort_by(|a, b| {
                        b["created_at"]
                            .as_str()
                            .unwrap_or_default()
                            .cmp(a["created_at"].as_str().unwrap_or_default())
                    });
                }
                Json(rows)
            }
        }),
    )
}

#[tokio::test]
async fn new_post_appears_first_in_its_category_feed() {
    let store = PostsStore::default();
    let addr = serve(posts_router(store)).await;
    let backend = backend_for(addr);

    let older = filo::models::NewPost {
        title: "Older".into(),
        content: "old".into(),
        category_id: "physical-activity".into(),
        author_id: "a-0".into(),
        publisher_id: "u-9".into(),
        thumbnail_url: None,
    };
    backend.table("posts").insert_only(&older).await.unwrap();

    let other_category = filo::models::NewPost {
        title: "Elsewhere".into(),
        content: "other".into(),
        category_id: "relationships".into(),
        author_id: "a-0".into(),
        publisher_id: "u-9".into(),
        thumbnail_url: None,
    };
    backend
        .table("posts")
        .insert_only(&other_category)
        .await
        .unwrap();

    let target = filo::models::NewPost {
        title: "T".into(),
        content: "C".into(),
        category_id: "physical-activity".into(),
        author_id: "a-1".into(),
        publisher_id: "u-1".into(),
        thumbnail_url: None,
    };
    backend.table("posts").insert_only(&target).await.unwrap();

    let feed: Vec<Post> = backend
        .table("posts")
        .in_list("category_id", &["physical-activity".to_string()])
        .order_desc("created_at")
        .select()
        .await
        .unwrap();

    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0].title, "T");
    assert_eq!(feed[0].content, "C");
    assert_eq!(feed[0].category_id, "physical-activity");
    assert_eq!(feed[0].author_id, "a-1");
    assert_eq!(feed[1].title, "Older");
}

#[tokio::test]
async fn rejected_refresh_token_clears_auth_data_and_reports_expiry() {
    let app = Router::new()
        .route(
            "/auth/v1/token",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "invalid_grant",
                        "error_description": "Invalid Refresh Token: Already Used"
                    })),
                )
            }),
        )
        .route("/auth/v1/logout", post(|| async { StatusCode::NO_CONTENT }));
    let addr = serve(app).await;

    let tmp = tempfile::tempdir().unwrap();
    let cache = TokenCache::new(tmp.path());
    // A stale cached session forces the refresh path.
    cache.store(&cached_session(1_000)).unwrap();

    let ctx = SessionContext::new(backend_for(addr), cache);
    ctx.initialize().await;

    match ctx.state().await {
        SessionState::Error { message } => {
            assert!(message.contains("expired"));
        }
        other => panic!("expected error state, got {:?}", other),
    }
    // The cached session was swept.
    assert!(TokenCache::new(tmp.path()).load().is_none());
}

#[tokio::test]
async fn restore_validates_a_fresh_cached_session() {
    let app = Router::new()
        .route("/auth/v1/user", get(|| async { Json(user_json()) }))
        .route(
            "/rest/v1/user_roles",
            get(|_q: Query<HashMap<String, String>>| async {
                Json(json!({ "user_id": "u-1", "role": "reader" }))
            }),
        );
    let addr = serve(app).await;

    let tmp = tempfile::tempdir().unwrap();
    let cache = TokenCache::new(tmp.path());
    let far_future = chrono::Utc::now().timestamp() + 3600;
    cache.store(&cached_session(far_future)).unwrap();

    let ctx = SessionContext::new(backend_for(addr), cache);
    ctx.initialize().await;

    match ctx.state().await {
        SessionState::Authenticated(session) => {
            assert_eq!(session.user.id, "u-1");
            assert_eq!(session.role, Some(Role::Reader));
        }
        other => panic!("expected authenticated session, got {:?}", other),
    }
}

#[tokio::test]
async fn sign_in_surfaces_the_backend_message() {
    let app = Router::new().route(
        "/auth/v1/token",
        post(|| async {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error_code": "invalid_credentials", "msg": "Invalid login credentials" })),
            )
        }),
    );
    let addr = serve(app).await;

    let tmp = tempfile::tempdir().unwrap();
    let ctx = SessionContext::new(backend_for(addr), TokenCache::new(tmp.path()));

    let err = ctx
        .sign_in("ada@example.com", "wrong")
        .await
        .expect_err("sign-in should fail");
    match err {
        BackendError::Api { status, message, .. } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid login credentials");
        }
        other => panic!("expected api error, got {:?}", other),
    }
    assert!(matches!(ctx.state().await, SessionState::SignedOut));
}
