pub mod auth;
pub mod error;
pub mod storage;
pub mod tables;

pub use error::BackendError;
pub use tables::TableQuery;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use url::Url;

use crate::config::BackendConfig;

/// Default deadline applied to every backend call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tighter deadline for the session-verification call: a slow verification
/// must not hold up accepting or rejecting an auth event.
pub const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Auth state changes emitted by the client, in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A cached session was restored at startup.
    InitialSession { user_id: String },
    SignedIn { user_id: String },
    SignedOut,
    TokenRefreshed { user_id: String },
}

/// Typed client for the hosted platform: row operations, credential
/// operations, and object storage. Holds the current access token; all
/// other session state lives in [`crate::session::SessionContext`].
#[derive(Clone)]
pub struct Backend {
    http: reqwest::Client,
    base: Url,
    api_key: String,
    access_token: Arc<RwLock<Option<String>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl Backend {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let base = Url::parse(&config.url)?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let (events, _) = broadcast::channel(32);

        Ok(Self {
            http,
            base,
            api_key: config.api_key.clone(),
            access_token: Arc::new(RwLock::new(None)),
            events,
        })
    }

    /// Subscribe to auth events. Only events emitted after the call are
    /// delivered.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: AuthEvent) {
        // Send only fails when nobody is listening, which is fine.
        let _ = self.events.send(event);
    }

    pub(crate) async fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().await = token;
    }

    pub(crate) async fn access_token(&self) -> Option<String> {
        self.access_token.read().await.clone()
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base.join(path).map_err(|e| BackendError::Api {
            status: 0,
            code: None,
            message: format!("Invalid endpoint path {}: {}", path, e),
        })
    }

    /// Base request with the project API key and, when present, the current
    /// bearer token.
    pub(crate) async fn request(
        &self,
        method: reqwest::Method,
        url: Url,
    ) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .header("apikey", &self.api_key);
        if let Some(token) = self.access_token().await {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

/// Run `op` up to `attempts` times, sleeping `base_delay * attempt` between
/// failures. The closure receives the 1-based attempt number.
pub async fn retry_with_backoff<T, F, Fut>(
    attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T, BackendError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts => {
                tracing::warn!(attempt, error = %err, "backend call failed, retrying");
                tokio::time::sleep(base_delay * attempt).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
