//! Credential operations against the hosted auth service. Password checks,
//! token issuance, and session invalidation are all owned by the platform;
//! this module only moves requests and mirrors the results.

use chrono::Utc;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::classify;
use super::{AuthEvent, Backend, BackendError, VERIFY_TIMEOUT};
use crate::models::{ProfileMetadata, RemoteUser};

/// A mirrored copy of the remote session, cached locally so a restart can
/// resume without prompting for credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp after which the access token is stale.
    pub expires_at: i64,
    pub user: RemoteUser,
}

impl AuthSession {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: RemoteUser,
}

impl TokenResponse {
    fn into_session(self) -> AuthSession {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp() + self.expires_in.unwrap_or(3600));
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

impl Backend {
    /// Password sign-in. On success the access token is installed for
    /// subsequent row operations.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let url = self.endpoint("auth/v1/token")?;
        let response = self
            .request(Method::POST, url)
            .await
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let session = parse_token_response(response).await?;

        self.set_access_token(Some(session.access_token.clone()))
            .await;
        self.emit(AuthEvent::SignedIn {
            user_id: session.user.id.clone(),
        });
        Ok(session)
    }

    /// Create an account with profile metadata. Depending on the project's
    /// email-confirmation setting the response carries either a bare user or
    /// a full session; only the user record is needed here, since the flow
    /// sends new accounts to sign-in either way.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &ProfileMetadata,
    ) -> Result<RemoteUser, BackendError> {
        let url = self.endpoint("auth/v1/signup")?;
        let response = self
            .request(Method::POST, url)
            .await
            .json(&json!({
                "email": email,
                "password": password,
                "data": {
                    "first_name": metadata.first_name,
                    "last_name": metadata.last_name,
                },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, &body));
        }

        let body: serde_json::Value = response.json().await?;
        let user_value = match body.get("user") {
            Some(user) if !user.is_null() => user.clone(),
            _ => body,
        };
        serde_json::from_value(user_value).map_err(|e| BackendError::Api {
            status: 0,
            code: None,
            message: format!("Malformed sign-up response: {}", e),
        })
    }

    /// Invalidate the remote session and drop the local access token.
    pub async fn sign_out(&self) -> Result<(), BackendError> {
        let url = self.endpoint("auth/v1/logout")?;
        let response = self.request(Method::POST, url).await.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, &body));
        }

        self.set_access_token(None).await;
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    /// Exchange a refresh token for a fresh session.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let url = self.endpoint("auth/v1/token")?;
        let response = self
            .request(Method::POST, url)
            .await
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let session = parse_token_response(response).await?;

        self.set_access_token(Some(session.access_token.clone()))
            .await;
        self.emit(AuthEvent::TokenRefreshed {
            user_id: session.user.id.clone(),
        });
        Ok(session)
    }

    /// Ask the auth service who the current token belongs to. Bounded by
    /// [`VERIFY_TIMEOUT`] so a stalled verification cannot wedge event
    /// handling.
    pub async fn verify_user(&self) -> Result<RemoteUser, BackendError> {
        let url = self.endpoint("auth/v1/user")?;
        let response = self
            .request(Method::GET, url)
            .await
            .timeout(VERIFY_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(classify(status, &body));
        }
        Ok(response.json().await?)
    }

    /// Bring a cached session back to life: reuse it when still fresh
    /// (after verifying the token is actually accepted), refresh it when
    /// stale. Either way an `InitialSession` event is emitted.
    pub async fn restore_session(&self, cached: AuthSession) -> Result<AuthSession, BackendError> {
        let session = if cached.is_expired(Utc::now().timestamp()) {
            self.refresh_session(&cached.refresh_token).await?
        } else {
            self.set_access_token(Some(cached.access_token.clone()))
                .await;
            self.verify_user().await?;
            cached
        };

        self.emit(AuthEvent::InitialSession {
            user_id: session.user.id.clone(),
        });
        Ok(session)
    }
}

async fn parse_token_response(response: reqwest::Response) -> Result<AuthSession, BackendError> {
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(classify(status, &body));
    }
    let token: TokenResponse = response.json().await?;
    Ok(token.into_session())
}
