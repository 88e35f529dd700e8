use anyhow::Context;
use arc_swap::ArcSwapOption;
use axum::Router;
use std::sync::Arc;
use tracing::info;

use crate::api::rest::routes;
use crate::config::{IdentityConfig, ProfileSyncConfig, StoreConfig};
use crate::contract::client::ProfileSyncApi;
use crate::domain::ports::{IdentityProvider, IdentitySessionSource};
use crate::domain::repo::{CoursesRepository, ProfilesRepository};
use crate::domain::service::Service;
use crate::domain::session::UserSession;
use crate::gateways::local::ProfileSyncLocalClient;
use crate::infra::firebase::FirebaseIdentityProvider;
use crate::infra::memory::{CatalogSeed, MemoryIdentityProvider, MemoryStore};
use crate::infra::sanity::{SanityClient, SanityStore};

pub const MODULE_NAME: &str = "profile_sync";

/// The profile_sync module: owns the domain service once initialized.
#[derive(Default)]
pub struct ProfileSync {
    service: ArcSwapOption<Service>,
}

impl ProfileSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adapters from `cfg` and publish the service.
    pub fn init(&self, cfg: &ProfileSyncConfig) -> anyhow::Result<()> {
        let (profiles, courses) = build_store(&cfg.store)?;
        let identity = build_identity(&cfg.identity)?;
        let service = Service::new(profiles, courses, identity, cfg.service_config());
        self.service.store(Some(Arc::new(service)));
        info!(
            store = store_kind(&cfg.store),
            identity = identity_kind(&cfg.identity),
            "profile_sync module initialized"
        );
        Ok(())
    }

    /// Publish an already assembled service.
    pub fn init_with(&self, service: Arc<Service>) {
        self.service.store(Some(service));
    }

    pub fn service(&self) -> anyhow::Result<Arc<Service>> {
        self.service
            .load_full()
            .context("profile_sync module is not initialized")
    }

    pub fn client(&self) -> anyhow::Result<Arc<dyn ProfileSyncApi>> {
        Ok(Arc::new(ProfileSyncLocalClient::new(self.service()?)))
    }

    pub fn open_session(&self, source: Arc<dyn IdentitySessionSource>) -> anyhow::Result<UserSession> {
        Ok(self.service()?.open_session(source))
    }

    pub fn register_rest(&self, router: Router) -> anyhow::Result<Router> {
        Ok(routes::register_routes(router, self.service()?))
    }
}

type Stores = (Arc<dyn ProfilesRepository>, Arc<dyn CoursesRepository>);

fn build_store(cfg: &StoreConfig) -> anyhow::Result<Stores> {
    match cfg {
        StoreConfig::Memory(mem) => {
            let mut store = MemoryStore::new(mem.visibility_delay);
            if let Some(path) = &mem.seed {
                store = store.with_seed(CatalogSeed::load(path)?);
            }
            let store = Arc::new(store);
            let profiles: Arc<dyn ProfilesRepository> = store.clone();
            let courses: Arc<dyn CoursesRepository> = store;
            Ok((profiles, courses))
        }
        StoreConfig::Sanity(sanity) => {
            let client = SanityClient::new(sanity).context("invalid content store settings")?;
            let store = Arc::new(SanityStore::new(client));
            let profiles: Arc<dyn ProfilesRepository> = store.clone();
            let courses: Arc<dyn CoursesRepository> = store;
            Ok((profiles, courses))
        }
    }
}

fn build_identity(cfg: &IdentityConfig) -> anyhow::Result<Arc<dyn IdentityProvider>> {
    match cfg {
        IdentityConfig::Memory => Ok(Arc::new(MemoryIdentityProvider::new())),
        IdentityConfig::Firebase(fb) => Ok(Arc::new(
            FirebaseIdentityProvider::new(fb).context("invalid identity provider settings")?,
        )),
    }
}

fn store_kind(cfg: &StoreConfig) -> &'static str {
    match cfg {
        StoreConfig::Memory(_) => "memory",
        StoreConfig::Sanity(_) => "sanity",
    }
}

fn identity_kind(cfg: &IdentityConfig) -> &'static str {
    match cfg {
        IdentityConfig::Memory => "memory",
        IdentityConfig::Firebase(_) => "firebase",
    }
}
