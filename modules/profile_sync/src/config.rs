use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::contract::model::Role;
use crate::domain::policy::RetryPolicy;
use crate::domain::service::ServiceConfig;

/// `modules.profile_sync` section of the application config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileSyncConfig {
    #[serde(default)]
    pub default_role: Role,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub reject_duplicate_enrollment: bool,
    #[serde(default = "default_new_student_window", with = "humantime_serde")]
    pub new_student_window: Duration,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

impl Default for ProfileSyncConfig {
    fn default() -> Self {
        Self {
            default_role: Role::Student,
            retry: RetryPolicy::default(),
            reject_duplicate_enrollment: false,
            new_student_window: default_new_student_window(),
            store: StoreConfig::default(),
            identity: IdentityConfig::default(),
        }
    }
}

impl ProfileSyncConfig {
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            default_role: self.default_role,
            retry: self.retry,
            reject_duplicate_enrollment: self.reject_duplicate_enrollment,
            new_student_window: self.new_student_window,
        }
    }

    /// Both external services replaced by their in-memory stand-ins.
    pub fn into_mock(mut self) -> Self {
        if !matches!(self.store, StoreConfig::Memory(_)) {
            self.store = StoreConfig::default();
        }
        self.identity = IdentityConfig::Memory;
        self
    }
}

fn default_new_student_window() -> Duration {
    Duration::from_secs(30 * 24 * 60 * 60)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Memory(MemoryStoreConfig),
    Sanity(SanityStoreConfig),
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory(MemoryStoreConfig::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryStoreConfig {
    /// How long a new profile stays invisible to reads.
    #[serde(default, with = "humantime_serde")]
    pub visibility_delay: Duration,
    /// YAML catalog with `courses` and `instructors`.
    #[serde(default)]
    pub seed: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SanityStoreConfig {
    pub project_id: String,
    pub dataset: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Replaces `https://{project_id}.api.sanity.io`.
    #[serde(default)]
    pub api_host: Option<Url>,
    #[serde(default = "default_http_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_api_version() -> String {
    "2024-01-01".to_string()
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdentityConfig {
    #[default]
    Memory,
    Firebase(FirebaseIdentityConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FirebaseIdentityConfig {
    pub api_key: String,
    #[serde(default)]
    pub api_host: Option<Url>,
    #[serde(default = "default_http_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}
