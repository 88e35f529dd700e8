use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::contract::model::Identity;
use crate::domain::auth::MIN_PASSWORD_LEN;
use crate::domain::ports::{IdentityError, IdentityProvider};

struct Account {
    identity: Identity,
    password: String,
}

/// Account directory kept in memory; emails compare case-insensitively.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    accounts: DashMap<String, Account>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(email: &str) -> String {
        email.trim().to_ascii_lowercase()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, IdentityError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword(format!(
                "password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        match self.accounts.entry(Self::key(email)) {
            Entry::Occupied(_) => Err(IdentityError::EmailExists),
            Entry::Vacant(slot) => {
                let identity = Identity {
                    identifier: Uuid::new_v4().simple().to_string(),
                    email: Some(email.trim().to_string()),
                    display_name: display_name.map(str::to_string),
                };
                slot.insert(Account {
                    identity: identity.clone(),
                    password: password.to_string(),
                });
                Ok(identity)
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        match self.accounts.get(&Self::key(email)) {
            Some(account) if account.password == password => Ok(account.identity.clone()),
            _ => Err(IdentityError::InvalidCredentials),
        }
    }
}
