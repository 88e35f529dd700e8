use thiserror::Error;

use crate::contract::model::CourseRef;

/// Domain-specific errors using thiserror.
///
/// Store and identity-provider failures are converted into these kinds at
/// the service boundary; adapters never leak transport errors past it.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Profile not found for identity '{identity}'")]
    ProfileNotFound { identity: String },

    #[error("Profile record not found: {record_id}")]
    ProfileRecordNotFound { record_id: String },

    #[error("Profile store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Already enrolled in course {course}")]
    DuplicateEnrollment { course: CourseRef },

    #[error("Course not found: {course}")]
    CourseNotFound { course: CourseRef },

    #[error("Identity '{identity}' is not bound to an instructor")]
    NotAnInstructor { identity: String },

    #[error("Email '{email}' is already registered")]
    EmailInUse { email: String },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Identity provider unavailable: {message}")]
    IdentityUnavailable { message: String },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },
}

impl DomainError {
    pub fn profile_not_found(identity: impl Into<String>) -> Self {
        Self::ProfileNotFound {
            identity: identity.into(),
        }
    }

    pub fn profile_record_not_found(record_id: impl Into<String>) -> Self {
        Self::ProfileRecordNotFound {
            record_id: record_id.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    pub fn duplicate_enrollment(course: CourseRef) -> Self {
        Self::DuplicateEnrollment { course }
    }

    pub fn course_not_found(course: CourseRef) -> Self {
        Self::CourseNotFound { course }
    }

    pub fn not_an_instructor(identity: impl Into<String>) -> Self {
        Self::NotAnInstructor {
            identity: identity.into(),
        }
    }

    pub fn email_in_use(email: impl Into<String>) -> Self {
        Self::EmailInUse {
            email: email.into(),
        }
    }

    pub fn identity_unavailable(message: impl Into<String>) -> Self {
        Self::IdentityUnavailable {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Store calls return `anyhow::Error`; keep the whole context chain.
    pub(crate) fn from_store(err: anyhow::Error) -> Self {
        Self::store(format!("{err:#}"))
    }
}
