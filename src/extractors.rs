use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::Role;
use crate::session::{AuthenticatedSession, SessionState};
use crate::state::AppState;

/// View of the mirrored session for request handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub role: Option<Role>,
    pub role_warning: Option<String>,
}

impl CurrentUser {
    pub fn is_publisher(&self) -> bool {
        matches!(self.role, Some(Role::Publisher))
    }

    fn from_session(session: AuthenticatedSession) -> Self {
        Self {
            id: session.user.id,
            email: session.user.email,
            first_name: session.user.user_metadata.first_name,
            last_name: session.user.user_metadata.last_name,
            created_at: session.user.created_at,
            role: session.role,
            role_warning: session.role_warning,
        }
    }
}

/// Extractor that requires an authenticated session. Returns 401 when the
/// process-wide session is anything but `Authenticated`; pages that prefer
/// a redirect use [`MaybeUser`] and branch themselves.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match state.session.current().await {
            Some(session) => Ok(CurrentUser::from_session(session)),
            None => Err(AppError::Unauthorized),
        }
    }
}

/// Optional user extractor — never rejects.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = state
            .session
            .current()
            .await
            .map(CurrentUser::from_session);
        Ok(MaybeUser(user))
    }
}

/// The full session state, for pages that render differently while
/// initialization is still running or after a session-expired error.
pub struct Session(pub SessionState);

impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Session(state.session.state().await))
    }
}
