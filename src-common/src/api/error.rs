//! Error type for backend requests.

use crate::validation::ValidationError;

/// Error type for API operations.
#[derive(Debug)]
pub enum ApiError {
    /// Request rejected before it was sent
    Invalid(ValidationError),
    /// Backend could not be reached (connection refused, DNS, reset)
    Network(String),
    /// Backend did not answer within the request timeout
    Timeout,
    /// Backend answered with a non-success status
    Status { status: u16, message: String },
    /// Response body did not have the expected shape
    Decode(String),
    /// Request succeeded but the response lacks a required field
    Incomplete(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// True when the backend was never reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Timeout)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Invalid(e) => write!(f, "{}", e),
            ApiError::Network(e) => write!(f, "Could not reach the backend: {}", e),
            ApiError::Timeout => write!(f, "The backend did not respond in time"),
            ApiError::Status { message, .. } => write!(f, "{}", message),
            ApiError::Decode(e) => write!(f, "Unexpected response from the backend: {}", e),
            ApiError::Incomplete(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Invalid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Invalid(e)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

/// Pull the human-readable `detail` out of an error body.
///
/// Returns `None` when the body is not JSON or `detail` is not a string
/// (validation errors carry a list there).
pub fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("detail")
        .and_then(|d| d.as_str())
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_detail() {
        assert_eq!(
            extract_detail(r#"{"detail": "Recording not found"}"#).as_deref(),
            Some("Recording not found")
        );
        assert_eq!(extract_detail(r#"{"detail": [{"msg": "field required"}]}"#), None);
        assert_eq!(extract_detail("<html>502</html>"), None);
        assert_eq!(extract_detail(r#"{"detail": "  "}"#), None);
    }

    #[test]
    fn test_classification() {
        let err = ApiError::Status {
            status: 404,
            message: "Not found".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_unreachable());
        assert_eq!(err.to_string(), "Not found");

        assert!(ApiError::Timeout.is_unreachable());
        let invalid: ApiError = ValidationError::EmptyText.into();
        assert_eq!(invalid.to_string(), "Please write something first.");
    }
}
