use crate::contract::model::SignUpRequest;
use crate::domain::error::DomainError;
use crate::domain::ports::IdentityError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Checks a sign-up form before anything is sent to the identity provider.
pub fn validate_sign_up(req: &SignUpRequest) -> Result<(), DomainError> {
    if req.name.trim().is_empty() {
        return Err(DomainError::validation("name", "must not be empty"));
    }
    validate_email(&req.email)?;
    if req.password != req.confirm_password {
        return Err(DomainError::validation("confirm_password", "passwords do not match"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), DomainError> {
    let invalid = || DomainError::validation("email", format!("'{email}' is not a valid address"));

    let (local, domain) = email.trim().split_once('@').ok_or_else(invalid)?;
    let domain_ok = !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.');
    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    Ok(())
}

pub(crate) fn map_identity_error(err: IdentityError, email: &str) -> DomainError {
    match err {
        IdentityError::EmailExists => DomainError::email_in_use(email),
        IdentityError::InvalidCredentials => DomainError::InvalidCredentials,
        IdentityError::WeakPassword(reason) => DomainError::validation("password", reason),
        IdentityError::Unavailable(message) => DomainError::identity_unavailable(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, password: &str, confirm: &str) -> SignUpRequest {
        SignUpRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    fn failing_field(req: &SignUpRequest) -> String {
        match validate_sign_up(req) {
            Err(DomainError::Validation { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_well_formed_form() {
        assert!(validate_sign_up(&form("Ann", "a@x.com", "secret1", "secret1")).is_ok());
    }

    #[test]
    fn reports_the_offending_field() {
        assert_eq!(failing_field(&form(" ", "a@x.com", "secret1", "secret1")), "name");
        assert_eq!(failing_field(&form("Ann", "ax.com", "secret1", "secret1")), "email");
        assert_eq!(failing_field(&form("Ann", "a@x.com", "secret1", "secret2")), "confirm_password");
        assert_eq!(failing_field(&form("Ann", "a@x.com", "abc", "abc")), "password");
    }

    #[test]
    fn email_shapes() {
        for ok in ["a@x.com", "first.last@sub.example.org"] {
            assert!(validate_email(ok).is_ok(), "{ok}");
        }
        for bad in ["", "@x.com", "a@", "a@x", "a@.com", "a@x.", "a@@x.com", "a b@x.com"] {
            assert!(validate_email(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn identity_errors_become_domain_kinds() {
        assert!(matches!(
            map_identity_error(IdentityError::EmailExists, "a@x.com"),
            DomainError::EmailInUse { email } if email == "a@x.com"
        ));
        assert!(matches!(
            map_identity_error(IdentityError::WeakPassword("too short".into()), ""),
            DomainError::Validation { field, .. } if field == "password"
        ));
        assert!(matches!(
            map_identity_error(IdentityError::Unavailable("503".into()), ""),
            DomainError::IdentityUnavailable { .. }
        ));
    }
}
