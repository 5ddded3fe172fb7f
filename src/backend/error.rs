use serde::Deserialize;

/// Failure kinds for remote backend calls.
///
/// Classification is derived from HTTP status codes and the machine-readable
/// error codes the platform puts in response bodies; human-readable messages
/// are carried along for display but never branched on.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The refresh token is invalid or missing; the local session must be
    /// discarded and the user sent back to sign-in.
    #[error("Session expired. Please sign in again.")]
    ExpiredToken,

    /// A single-row lookup matched no rows.
    #[error("Not found")]
    NotFound,

    /// The request exceeded its deadline.
    #[error("The request timed out")]
    Timeout,

    /// The backend rejected the request.
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(reqwest::Error),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Network(err)
        }
    }
}

/// Error body shapes used by the auth and table services. The auth service
/// reports `error`/`error_code`, the table service reports `code`; both
/// carry a human-readable message under varying keys.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_code: Option<String>,
    error_description: Option<String>,
    code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

/// Auth-service codes that mean the refresh token is gone for good.
const EXPIRED_TOKEN_CODES: &[&str] = &[
    "invalid_grant",
    "refresh_token_not_found",
    "refresh_token_already_used",
    "session_not_found",
];

/// Table-service code for "zero rows where exactly one was requested".
const ROW_NOT_FOUND_CODE: &str = "PGRST116";

/// Classify a non-success response into a typed error.
pub(crate) fn classify(status: u16, body: &str) -> BackendError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let code = parsed
        .error_code
        .as_deref()
        .or(parsed.error.as_deref())
        .or(parsed.code.as_deref());

    if let Some(code) = code {
        if (status == 400 || status == 401) && EXPIRED_TOKEN_CODES.contains(&code) {
            return BackendError::ExpiredToken;
        }
        if code == ROW_NOT_FOUND_CODE {
            return BackendError::NotFound;
        }
    }

    // A single-object request that matched nothing comes back as 406.
    if status == 406 {
        return BackendError::NotFound;
    }

    let message = parsed
        .message
        .or(parsed.msg)
        .or(parsed.error_description)
        .unwrap_or_else(|| format!("Backend request failed with status {}", status));

    BackendError::Api {
        status,
        code: code.map(str::to_string),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_grant_is_expired_token() {
        let err = classify(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid Refresh Token: Already Used"}"#,
        );
        assert!(matches!(err, BackendError::ExpiredToken));
    }

    #[test]
    fn refresh_token_not_found_is_expired_token() {
        let err = classify(401, r#"{"error_code":"refresh_token_not_found","msg":"gone"}"#);
        assert!(matches!(err, BackendError::ExpiredToken));
    }

    #[test]
    fn pgrst_single_row_miss_is_not_found() {
        let err = classify(
            406,
            r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned"}"#,
        );
        assert!(matches!(err, BackendError::NotFound));
    }

    #[test]
    fn unknown_code_is_api_error_with_message() {
        let err = classify(500, r#"{"code":"XX000","message":"internal"}"#);
        match err {
            BackendError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 500);
                assert_eq!(code.as_deref(), Some("XX000"));
                assert_eq!(message, "internal");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn unparseable_body_still_classifies_by_status() {
        let err = classify(503, "<html>bad gateway</html>");
        match err {
            BackendError::Api { status, code, .. } => {
                assert_eq!(status, 503);
                assert!(code.is_none());
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn expired_codes_only_apply_to_auth_statuses() {
        // The same code on a 500 is a plain API failure, not a session drop.
        let err = classify(500, r#"{"error":"invalid_grant"}"#);
        assert!(matches!(err, BackendError::Api { .. }));
    }
}
