use axum::http::StatusCode;
use tracing::error;

use crate::api::rest::problem::{Problem, ProblemResponse};
use crate::domain::error::DomainError;

/// Map domain errors to RFC 9457 responses. Backend failures are logged
/// here and rendered without internal detail.
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    let problem = match e {
        DomainError::ProfileNotFound { .. } => {
            Problem::new(StatusCode::NOT_FOUND, "PROFILE_NOT_FOUND", e.to_string())
        }
        DomainError::ProfileRecordNotFound { .. } => {
            Problem::new(StatusCode::NOT_FOUND, "PROFILE_RECORD_NOT_FOUND", e.to_string())
        }
        DomainError::CourseNotFound { .. } => {
            Problem::new(StatusCode::NOT_FOUND, "COURSE_NOT_FOUND", e.to_string())
        }
        DomainError::DuplicateEnrollment { .. } => {
            Problem::new(StatusCode::CONFLICT, "DUPLICATE_ENROLLMENT", e.to_string())
        }
        DomainError::EmailInUse { .. } => {
            Problem::new(StatusCode::CONFLICT, "EMAIL_IN_USE", e.to_string())
                .with_field_error("email", "already registered")
        }
        DomainError::NotAnInstructor { .. } => {
            Problem::new(StatusCode::FORBIDDEN, "NOT_AN_INSTRUCTOR", e.to_string())
        }
        DomainError::InvalidCredentials => {
            Problem::new(StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", e.to_string())
        }
        DomainError::Validation { field, message } => {
            Problem::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                .with_field_error(field, message.clone())
        }
        DomainError::StoreUnavailable { message } => {
            error!(instance, %message, "profile store failure");
            Problem::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
                "The profile store is temporarily unavailable",
            )
        }
        DomainError::IdentityUnavailable { message } => {
            error!(instance, %message, "identity provider failure");
            Problem::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "IDENTITY_UNAVAILABLE",
                "The identity provider is temporarily unavailable",
            )
        }
    };
    problem.with_instance(instance).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::CourseRef;

    #[test]
    fn kinds_map_to_statuses() {
        let cases = [
            (DomainError::profile_not_found("u1"), 404, "PROFILE_NOT_FOUND"),
            (DomainError::course_not_found(CourseRef::new("c1")), 404, "COURSE_NOT_FOUND"),
            (DomainError::duplicate_enrollment(CourseRef::new("c1")), 409, "DUPLICATE_ENROLLMENT"),
            (DomainError::not_an_instructor("u1"), 403, "NOT_AN_INSTRUCTOR"),
            (DomainError::InvalidCredentials, 401, "INVALID_CREDENTIALS"),
            (DomainError::validation("email", "bad"), 400, "VALIDATION_ERROR"),
        ];
        for (err, status, code) in cases {
            let p = map_domain_error(&err, "/x").0;
            assert_eq!((p.status, p.code.as_str()), (status, code));
        }
    }

    #[test]
    fn store_failure_hides_internal_detail() {
        let p = map_domain_error(&DomainError::store("pg: connection refused at 10.0.0.3"), "/courses").0;
        assert_eq!(p.status, 503);
        assert!(!p.detail.contains("10.0.0.3"));
    }
}
