use thiserror::Error;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileSyncError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Service temporarily unavailable")]
    Unavailable,
}

impl ProfileSyncError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<crate::domain::error::DomainError> for ProfileSyncError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match domain_error {
            e @ (ProfileNotFound { .. } | ProfileRecordNotFound { .. } | CourseNotFound { .. }) => {
                Self::not_found(e.to_string())
            }
            e @ (DuplicateEnrollment { .. } | EmailInUse { .. }) => Self::conflict(e.to_string()),
            e @ NotAnInstructor { .. } => Self::forbidden(e.to_string()),
            InvalidCredentials => Self::Unauthorized,
            Validation { field, message } => Self::validation(format!("{}: {}", field, message)),
            StoreUnavailable { .. } | IdentityUnavailable { .. } => Self::Unavailable,
        }
    }
}
