//! Exit codes for the CLI.
//!
//! These codes enable scripting integration by providing structured
//! feedback about operation results.

use reflect_common::api::UploadFileError;
use reflect_common::redaction::RedactionError;
use reflect_common::ApiError;

/// Exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,
    /// General/unspecified error
    GeneralError = 1,
    /// Invalid command-line arguments or input rejected before sending
    InvalidArguments = 2,
    /// Backend could not be reached or timed out
    BackendUnreachable = 3,
    /// Recording or transcript does not exist
    NotFound = 4,
    /// Backend answered with an error status
    BackendRejected = 5,
    /// Backend has not completed first-run setup
    SetupRequired = 6,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitCode::Success => write!(f, "success"),
            ExitCode::GeneralError => write!(f, "general error"),
            ExitCode::InvalidArguments => write!(f, "invalid arguments"),
            ExitCode::BackendUnreachable => write!(f, "backend unreachable"),
            ExitCode::NotFound => write!(f, "not found"),
            ExitCode::BackendRejected => write!(f, "backend rejected request"),
            ExitCode::SetupRequired => write!(f, "setup required"),
        }
    }
}

impl From<&ApiError> for ExitCode {
    fn from(e: &ApiError) -> Self {
        match e {
            ApiError::Invalid(_) => ExitCode::InvalidArguments,
            ApiError::Network(_) | ApiError::Timeout => ExitCode::BackendUnreachable,
            ApiError::Status { status: 404, .. } => ExitCode::NotFound,
            ApiError::Status { .. } => ExitCode::BackendRejected,
            ApiError::Decode(_) | ApiError::Incomplete(_) => ExitCode::GeneralError,
        }
    }
}

impl From<&UploadFileError> for ExitCode {
    fn from(e: &UploadFileError) -> Self {
        match e {
            UploadFileError::Io(_) => ExitCode::GeneralError,
            UploadFileError::Invalid(_) => ExitCode::InvalidArguments,
        }
    }
}

impl From<&RedactionError> for ExitCode {
    fn from(e: &RedactionError) -> Self {
        match e {
            RedactionError::HitNotFound(_) => ExitCode::NotFound,
            _ => ExitCode::InvalidArguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflect_common::validation::ValidationError;

    #[test]
    fn test_api_error_mapping() {
        assert_eq!(
            ExitCode::from(&ApiError::Invalid(ValidationError::EmptyText)),
            ExitCode::InvalidArguments
        );
        assert_eq!(ExitCode::from(&ApiError::Timeout), ExitCode::BackendUnreachable);
        assert_eq!(
            ExitCode::from(&ApiError::Status {
                status: 404,
                message: "Not found".into()
            }),
            ExitCode::NotFound
        );
        assert_eq!(
            ExitCode::from(&ApiError::Status {
                status: 422,
                message: "Bad".into()
            }),
            ExitCode::BackendRejected
        );
        assert_eq!(ExitCode::BackendRejected.as_i32(), 5);
    }

    #[test]
    fn test_redaction_error_mapping() {
        assert_eq!(ExitCode::from(&RedactionError::HitNotFound(3)), ExitCode::NotFound);
        assert_eq!(
            ExitCode::from(&RedactionError::EmptySelection),
            ExitCode::InvalidArguments
        );
    }
}
