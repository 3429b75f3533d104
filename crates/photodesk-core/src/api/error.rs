use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Carries the server's reason, e.g. `Incorrect email or password`;
    /// empty when the server gave none.
    #[error("Unauthorized: {}", unauthorized_reason(.0))]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rejected: {0}")]
    Validation(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

fn unauthorized_reason(detail: &str) -> &str {
    if detail.is_empty() {
        "session is missing, expired or invalid"
    } else {
        detail
    }
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Human readable message from an error body. The server reports
    /// `{"detail": "..."}`, or for rejected payloads
    /// `{"detail": [{"loc": [...], "msg": "..."}]}`.
    pub fn extract_detail(body: &str) -> String {
        let detail = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("detail").cloned());

        match detail {
            Some(Value::String(s)) => s,
            Some(Value::Array(items)) => {
                let messages: Vec<String> = items
                    .iter()
                    .filter_map(|item| {
                        let msg = item.get("msg")?.as_str()?;
                        let field = item
                            .get("loc")
                            .and_then(Value::as_array)
                            .and_then(|loc| loc.last())
                            .and_then(Value::as_str);
                        Some(match field {
                            Some(field) => format!("{}: {}", field, msg),
                            None => msg.to_string(),
                        })
                    })
                    .collect();
                if messages.is_empty() {
                    Self::truncate_body(body)
                } else {
                    messages.join("; ")
                }
            }
            _ => Self::truncate_body(body.trim()),
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = Self::extract_detail(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(detail),
            403 => ApiError::Forbidden(detail),
            404 | 410 => ApiError::NotFound(detail),
            400 | 409 | 422 => ApiError::Validation(detail),
            code @ 500..=599 => ApiError::ServerError {
                status: code,
                message: detail,
            },
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, detail)),
        }
    }

    /// Only this classification invalidates the session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Whether the caller may reasonably try again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::ServerError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_classification() {
        assert!(matches!(ApiError::from_status(StatusCode::UNAUTHORIZED, ""), ApiError::Unauthorized(_)));
        assert!(matches!(ApiError::from_status(StatusCode::FORBIDDEN, ""), ApiError::Forbidden(_)));
        assert!(matches!(ApiError::from_status(StatusCode::NOT_FOUND, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(StatusCode::GONE, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(StatusCode::BAD_REQUEST, ""), ApiError::Validation(_)));
        assert!(matches!(
            ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, ""),
            ApiError::Validation(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::ServerError { status: 502, .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, ""),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_extract_string_detail() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"detail":"Email already registered"}"#);
        match err {
            ApiError::Validation(msg) => assert_eq!(msg, "Email already registered"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unauthorized_keeps_server_reason() {
        let err = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"detail":"Incorrect email or password"}"#,
        );
        match err {
            ApiError::Unauthorized(msg) => assert_eq!(msg, "Incorrect email or password"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, "").to_string(),
            "Unauthorized: session is missing, expired or invalid"
        );
    }

    #[test]
    fn test_extract_field_errors() {
        let body = r#"{"detail":[{"loc":["body","email"],"msg":"value is not a valid email address","type":"value_error"},{"loc":["body","password"],"msg":"field required"}]}"#;
        assert_eq!(
            ApiError::extract_detail(body),
            "email: value is not a valid email address; password: field required"
        );
    }

    #[test]
    fn test_non_json_body_is_truncated() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let detail = ApiError::extract_detail(&body);
        assert!(detail.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(detail.contains("truncated"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let body = "é".repeat(MAX_ERROR_BODY_LENGTH);
        // Must not panic on a multi-byte boundary
        let detail = ApiError::extract_detail(&body);
        assert!(detail.contains("truncated"));
    }

    #[test]
    fn test_retryable() {
        assert!(ApiError::ServerError { status: 503, message: String::new() }.is_retryable());
        assert!(!ApiError::Unauthorized(String::new()).is_retryable());
        assert!(!ApiError::Validation(String::new()).is_retryable());
        assert!(ApiError::Unauthorized(String::new()).is_unauthorized());
    }
}
