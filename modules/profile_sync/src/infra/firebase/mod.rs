use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use url::Url;

use crate::config::FirebaseIdentityConfig;
use crate::contract::model::Identity;
use crate::domain::ports::{IdentityError, IdentityProvider};
use crate::infra::http::TracedClient;

const DEFAULT_API_HOST: &str = "https://identitytoolkit.googleapis.com";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Email/password accounts through the Identity Toolkit REST API.
pub struct FirebaseIdentityProvider {
    http: TracedClient,
    base: Url,
    api_key: String,
}

impl FirebaseIdentityProvider {
    pub fn new(cfg: &FirebaseIdentityConfig) -> anyhow::Result<Self> {
        let base = match &cfg.api_host {
            Some(host) => host.clone(),
            None => Url::parse(DEFAULT_API_HOST)?,
        };
        Ok(Self {
            http: TracedClient::with_timeout(cfg.timeout)?,
            base,
            api_key: cfg.api_key.clone(),
        })
    }

    async fn call(&self, action: &str, body: &PasswordRequest<'_>) -> Result<Identity, IdentityError> {
        let mut url = self
            .base
            .join(&format!("v1/accounts:{action}"))
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let req = self
            .http
            .request(reqwest::Method::POST, url.as_str())
            .json(body)
            .build()
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        let resp = self
            .http
            .execute(req)
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            let account: AccountResponse = resp
                .json()
                .await
                .map_err(|e| IdentityError::Unavailable(format!("malformed response: {e}")))?;
            return Ok(Identity {
                identifier: account.local_id,
                email: account.email,
                display_name: account.display_name.filter(|n| !n.is_empty()),
            });
        }

        let message = resp
            .json::<ErrorEnvelope>()
            .await
            .map(|e| e.error.message)
            .unwrap_or_default();
        Err(map_error_code(status.as_u16(), &message))
    }
}

/// Provider messages look like `CODE` or `CODE : human readable detail`.
fn map_error_code(status: u16, message: &str) -> IdentityError {
    let (code, detail) = match message.split_once(':') {
        Some((code, detail)) => (code.trim(), detail.trim()),
        None => (message.trim(), ""),
    };
    match code {
        "EMAIL_EXISTS" => IdentityError::EmailExists,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            IdentityError::InvalidCredentials
        }
        "WEAK_PASSWORD" => IdentityError::WeakPassword(if detail.is_empty() {
            "password is too weak".to_string()
        } else {
            detail.to_string()
        }),
        _ => {
            warn!(status, code, "identity provider error");
            IdentityError::Unavailable(format!("{status} {code}"))
        }
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    #[instrument(name = "profile_sync.firebase.sign_up", skip(self, password, display_name))]
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, IdentityError> {
        let body = PasswordRequest {
            email,
            password,
            display_name,
            return_secure_token: true,
        };
        let mut identity = self.call("signUp", &body).await?;
        // signUp does not echo the display name back
        if identity.display_name.is_none() {
            identity.display_name = display_name.map(str::to_string);
        }
        Ok(identity)
    }

    #[instrument(name = "profile_sync.firebase.sign_in", skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let body = PasswordRequest {
            email,
            password,
            display_name: None,
            return_secure_token: true,
        };
        self.call("signInWithPassword", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_provider_codes() {
        assert_eq!(map_error_code(400, "EMAIL_EXISTS"), IdentityError::EmailExists);
        assert_eq!(
            map_error_code(400, "INVALID_LOGIN_CREDENTIALS"),
            IdentityError::InvalidCredentials
        );
        assert_eq!(
            map_error_code(400, "WEAK_PASSWORD : Password should be at least 6 characters"),
            IdentityError::WeakPassword("Password should be at least 6 characters".into())
        );
        assert!(matches!(
            map_error_code(503, ""),
            IdentityError::Unavailable(m) if m.starts_with("503")
        ));
    }
}
