//! Process-wide mirror of the remote session.
//!
//! The app is single-user, so one mirrored session is the whole auth state.
//! All transitions go through [`SessionContext`], which owns the state
//! behind one lock: the event loop, the refresh task, and the credential
//! operations are all methods on the same context, so there is exactly one
//! logical writer.

pub mod token_cache;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::backend::{retry_with_backoff, AuthEvent, Backend, BackendError};
use crate::models::{ProfileMetadata, RemoteUser, Role, UserRoleRow};
use crate::session::token_cache::TokenCache;

pub const ROLE_FETCH_ATTEMPTS: u32 = 3;
pub const ROLE_FETCH_BASE_DELAY: Duration = Duration::from_millis(500);

/// Refresh the access token this long before it expires.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);
/// Pause between refresh-task polls when signed out or after a transient
/// refresh failure.
const REFRESH_RETRY_DELAY: Duration = Duration::from_secs(30);

const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please sign in again.";
const ROLE_WARNING: &str =
    "Could not determine your account role; publisher features are disabled.";

/// Session lifecycle as explicit states. A null role inside
/// `Authenticated` means "role unknown, treat as not publisher".
#[derive(Debug, Clone)]
pub enum SessionState {
    SignedOut,
    Initializing,
    Authenticated(AuthenticatedSession),
    Error { message: String },
}

#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: RemoteUser,
    pub role: Option<Role>,
    /// Set when role resolution gave up; shown as a banner.
    pub role_warning: Option<String>,
}

impl AuthenticatedSession {
    pub fn is_publisher(&self) -> bool {
        matches!(self.role, Some(Role::Publisher))
    }
}

#[derive(Clone)]
pub struct SessionContext {
    backend: Backend,
    cache: Arc<TokenCache>,
    state: Arc<RwLock<SessionState>>,
}

impl SessionContext {
    pub fn new(backend: Backend, cache: TokenCache) -> Self {
        Self {
            backend,
            cache: Arc::new(cache),
            state: Arc::new(RwLock::new(SessionState::SignedOut)),
        }
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// The mirrored session, when authenticated.
    pub async fn current(&self) -> Option<AuthenticatedSession> {
        match &*self.state.read().await {
            SessionState::Authenticated(session) => Some(session.clone()),
            _ => None,
        }
    }

    /// One explicit startup step. Runs to completion *before* the event
    /// loop subscribes, so the initial session fetch and the first emitted
    /// event can never interleave or duplicate work.
    pub async fn initialize(&self) {
        *self.state.write().await = SessionState::Initializing;

        let Some(cached) = self.cache.load() else {
            *self.state.write().await = SessionState::SignedOut;
            return;
        };

        match self.backend.restore_session(cached).await {
            Ok(session) => {
                if let Err(err) = self.cache.store(&session) {
                    tracing::warn!(error = %err, "could not cache restored session");
                }
                let (role, role_warning) = self.resolve_role(&session.user.id).await;
                *self.state.write().await = SessionState::Authenticated(AuthenticatedSession {
                    user: session.user,
                    role,
                    role_warning,
                });
            }
            Err(BackendError::ExpiredToken) => {
                tracing::info!("cached session is no longer valid, clearing auth data");
                self.clear_auth_data().await;
                *self.state.write().await = SessionState::Error {
                    message: SESSION_EXPIRED_MESSAGE.to_string(),
                };
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not restore cached session");
                *self.state.write().await = SessionState::SignedOut;
            }
        }
    }

    /// Start consuming auth events. Call after [`Self::initialize`]; only
    /// events emitted after this point are observed.
    pub fn spawn_event_loop(&self) -> JoinHandle<()> {
        let ctx = self.clone();
        let mut events = self.backend.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => ctx.handle_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "auth event loop lagged behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Keep the mirrored session fresh: sleep until shortly before expiry,
    /// refresh, persist. A rejected refresh token ends in forced cleanup.
    pub fn spawn_refresh_task(&self) -> JoinHandle<()> {
        let ctx = self.clone();
        tokio::spawn(async move {
            loop {
                let Some(cached) = ctx.cache.load() else {
                    tokio::time::sleep(REFRESH_RETRY_DELAY).await;
                    continue;
                };

                let until_expiry = (cached.expires_at - Utc::now().timestamp()).max(0) as u64;
                let wait = Duration::from_secs(until_expiry).saturating_sub(REFRESH_MARGIN);
                tokio::time::sleep(wait).await;

                // The user may have signed out while we slept.
                let Some(cached) = ctx.cache.load() else {
                    continue;
                };

                match ctx.backend.refresh_session(&cached.refresh_token).await {
                    Ok(session) => {
                        if let Err(err) = ctx.cache.store(&session) {
                            tracing::warn!(error = %err, "could not cache refreshed session");
                        }
                    }
                    Err(BackendError::ExpiredToken) => {
                        tracing::info!("refresh token rejected, clearing auth data");
                        ctx.clear_auth_data().await;
                        *ctx.state.write().await = SessionState::Error {
                            message: SESSION_EXPIRED_MESSAGE.to_string(),
                        };
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "session refresh failed, will retry");
                        tokio::time::sleep(REFRESH_RETRY_DELAY).await;
                    }
                }
            }
        })
    }

    /// Apply one auth event. Events are handled in emission order by the
    /// event loop task.
    pub async fn handle_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedOut => {
                self.cache.clear();
                let mut state = self.state.write().await;
                // An explicit error (session expired) already implies
                // signed-out; keep its message visible.
                if !matches!(&*state, SessionState::Error { .. }) {
                    *state = SessionState::SignedOut;
                }
            }
            AuthEvent::TokenRefreshed { user_id } => {
                // A refresh may follow a role change; re-derive it.
                let (role, role_warning) = self.resolve_role(&user_id).await;
                let mut state = self.state.write().await;
                if let SessionState::Authenticated(session) = &mut *state {
                    if session.user.id == user_id {
                        session.role = role;
                        session.role_warning = role_warning;
                    }
                }
            }
            AuthEvent::SignedIn { user_id } | AuthEvent::InitialSession { user_id } => {
                // Already mirrored; accepting again would only repeat the
                // role lookup.
                if let SessionState::Authenticated(session) = &*self.state.read().await {
                    if session.user.id == user_id {
                        return;
                    }
                }
                self.accept_session(&user_id).await;
            }
        }
    }

    /// Validate an announced session before mirroring it: local expiry
    /// check first, then a verification call bounded by the 10-second
    /// guard. A session that fails either check is not accepted.
    async fn accept_session(&self, user_id: &str) {
        tracing::debug!(user_id, "validating announced session");

        let Some(cached) = self.cache.load() else {
            *self.state.write().await = SessionState::SignedOut;
            return;
        };
        if cached.is_expired(Utc::now().timestamp()) {
            tracing::info!("announced session is already past its expiry, ignoring");
            *self.state.write().await = SessionState::SignedOut;
            return;
        }

        match self.backend.verify_user().await {
            Ok(user) => {
                let (role, role_warning) = self.resolve_role(&user.id).await;
                *self.state.write().await = SessionState::Authenticated(AuthenticatedSession {
                    user,
                    role,
                    role_warning,
                });
            }
            Err(err) => {
                tracing::warn!(error = %err, "session verification failed");
                *self.state.write().await = SessionState::SignedOut;
            }
        }
    }

    /// Look up the user's role, creating a default reader row when none
    /// exists. Transient failures are retried with growing delay; after the
    /// last attempt the user proceeds with no role (rendered everywhere as
    /// "not publisher") and a visible warning.
    async fn resolve_role(&self, user_id: &str) -> (Option<Role>, Option<String>) {
        let backend = self.backend.clone();
        let result = retry_with_backoff(ROLE_FETCH_ATTEMPTS, ROLE_FETCH_BASE_DELAY, |attempt| {
            let backend = backend.clone();
            let user_id = user_id.to_string();
            async move {
                match backend
                    .table("user_roles")
                    .eq("user_id", &user_id)
                    .select_single::<UserRoleRow>()
                    .await
                {
                    Ok(row) => Ok(row.role),
                    Err(BackendError::NotFound) => {
                        tracing::info!(attempt, "no role row found, creating default reader");
                        backend
                            .table("user_roles")
                            .insert_only(&UserRoleRow {
                                user_id: user_id.clone(),
                                role: Role::Reader,
                            })
                            .await?;
                        Ok(Role::Reader)
                    }
                    Err(err) => Err(err),
                }
            }
        })
        .await;

        match result {
            Ok(role) => (Some(role), None),
            Err(err) => {
                tracing::error!(
                    error = %err,
                    attempts = ROLE_FETCH_ATTEMPTS,
                    "role lookup exhausted its retries"
                );
                (None, Some(ROLE_WARNING.to_string()))
            }
        }
    }

    /// Password sign-in, then role resolution.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), BackendError> {
        let session = self.backend.sign_in(email, password).await?;
        if let Err(err) = self.cache.store(&session) {
            tracing::warn!(error = %err, "could not cache session");
        }

        let (role, role_warning) = self.resolve_role(&session.user.id).await;
        *self.state.write().await = SessionState::Authenticated(AuthenticatedSession {
            user: session.user,
            role,
            role_warning,
        });
        Ok(())
    }

    /// Create an account and write the chosen role. A failed role write is
    /// logged, not fatal: the account exists, and the next role fetch
    /// self-heals to reader.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: ProfileMetadata,
        role: Role,
    ) -> Result<(), BackendError> {
        let user = self.backend.sign_up(email, password, &metadata).await?;

        let row = UserRoleRow {
            user_id: user.id.clone(),
            role,
        };
        match self.backend.table("user_roles").insert_only(&row).await {
            Ok(()) => {
                tracing::info!(user_id = %user.id, role = role.as_str(), "role record created");
            }
            Err(err) => {
                tracing::error!(user_id = %user.id, error = %err, "could not create role record");
            }
        }
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<(), BackendError> {
        self.backend.sign_out().await?;
        self.cache.clear();
        *self.state.write().await = SessionState::SignedOut;
        Ok(())
    }

    /// Forced local reset, used when the refresh token is beyond recovery:
    /// best-effort remote sign-out, sweep cached auth keys, reset state.
    pub async fn clear_auth_data(&self) {
        if let Err(err) = self.backend.sign_out().await {
            tracing::debug!(error = %err, "remote sign-out during cleanup failed");
        }
        let removed = self.cache.sweep_auth_keys();
        tracing::info!(removed, "cleared local auth data");
        *self.state.write().await = SessionState::SignedOut;
    }
}
