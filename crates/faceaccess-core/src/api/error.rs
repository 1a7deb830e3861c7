use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(ErrorBody),

    #[error("Access denied: {0}")]
    AccessDenied(ErrorBody),

    #[error("Resource not found: {0}")]
    NotFound(ErrorBody),

    #[error("Invalid request: {0}")]
    Validation(ErrorBody),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(ErrorBody),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

/// Body of a non-success response.
///
/// `detail` is set only when the service said why; `raw` keeps the
/// (truncated) body for logs either way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBody {
    pub detail: Option<String>,
    pub raw: String,
}

impl ErrorBody {
    pub fn parse(body: &str) -> Self {
        Self {
            detail: extract_detail(body),
            raw: ApiError::truncate_body(body),
        }
    }

    /// A body that carried `{"detail": ...}`
    pub fn with_detail(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            raw: detail.clone(),
            detail: Some(detail),
        }
    }
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.detail.as_deref().unwrap_or(&self.raw))
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

    /// Build an error from a non-success status.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = ErrorBody::parse(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized(body),
            403 => ApiError::AccessDenied(body),
            404 => ApiError::NotFound(body),
            400 | 422 => ApiError::Validation(body),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(body),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, body)),
        }
    }

    /// The reason the server gave in its `detail` field, if any.
    /// Bodies without one (HTML error pages, other JSON shapes) yield `None`.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized(b)
            | ApiError::AccessDenied(b)
            | ApiError::NotFound(b)
            | ApiError::Validation(b)
            | ApiError::ServerError(b) => b.detail.as_deref(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// True for failures where no HTTP status was received at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::NetworkError(_) | ApiError::InvalidHeader(_))
    }
}

/// Pull the `detail` field out of an error body.
///
/// The service answers `{"detail": "..."}` for handled errors and
/// `{"detail": [{"msg": "...", ...}]}` for request validation failures.
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let detail = match value.get("detail")? {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(Value::as_str))
            .map(|s| s.trim().to_string())?,
        _ => return None,
    };
    if detail.is_empty() {
        None
    } else {
        Some(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_uses_detail() {
        let err = ApiError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"detail":"Invalid credentials"}"#,
        );
        assert!(err.is_unauthorized());
        assert_eq!(err.detail(), Some("Invalid credentials"));
    }

    #[test]
    fn test_from_status_validation_list() {
        let body = r#"{"detail":[{"loc":["body","email"],"msg":"value is not a valid email address","type":"value_error"}]}"#;
        let err = ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.detail(), Some("value is not a valid email address"));
    }

    #[test]
    fn test_from_status_plain_body() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(err, ApiError::ServerError(_)));
        assert_eq!(err.detail(), None);
        assert_eq!(err.to_string(), "Server error: upstream down");
    }

    #[test]
    fn test_from_status_html_page_has_no_detail() {
        let err = ApiError::from_status(
            StatusCode::BAD_GATEWAY,
            "<html><body>502 Bad Gateway</body></html>",
        );
        assert_eq!(err.detail(), None);
    }

    #[test]
    fn test_from_status_json_without_detail() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"error":"x"}"#);
        assert!(err.is_unauthorized());
        assert_eq!(err.detail(), None);
    }

    #[test]
    fn test_from_status_blank_detail_is_none() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"detail":"   "}"#);
        assert_eq!(err.detail(), None);
    }

    #[test]
    fn test_from_status_empty_body_has_no_detail() {
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(err.detail(), None);
    }

    #[test]
    fn test_from_status_rate_limited() {
        let err = ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, "{}");
        assert!(matches!(err, ApiError::RateLimited));
        assert_eq!(err.detail(), None);
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.contains("truncated"));
    }
}
