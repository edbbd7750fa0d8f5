use std::sync::Arc;

use crate::application::ports::cache_port::CachePort;
use crate::application::ports::schema_provisioner::SchemaProvisioner;
use crate::application::ports::tenant_repository::TenantRepository;
use crate::application::ports::user_repository::UserRepository;
use crate::bootstrap::config::Config;

#[derive(Clone)]
pub struct AppContext {
    pub cfg: Config,
    services: Arc<AppServices>,
}

#[derive(Clone)]
pub struct AppServices {
    user_repo: Arc<dyn UserRepository>,
    tenant_repo: Arc<dyn TenantRepository>,
    schemas: Arc<dyn SchemaProvisioner>,
    cache: Arc<dyn CachePort>,
}

impl AppServices {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        tenant_repo: Arc<dyn TenantRepository>,
        schemas: Arc<dyn SchemaProvisioner>,
        cache: Arc<dyn CachePort>,
    ) -> Self {
        Self {
            user_repo,
            tenant_repo,
            schemas,
            cache,
        }
    }
}

impl AppContext {
    pub fn new(cfg: Config, services: AppServices) -> Self {
        Self {
            cfg,
            services: Arc::new(services),
        }
    }

    pub fn user_repo(&self) -> Arc<dyn UserRepository> {
        self.services.user_repo.clone()
    }

    pub fn tenant_repo(&self) -> Arc<dyn TenantRepository> {
        self.services.tenant_repo.clone()
    }

    pub fn schemas(&self) -> Arc<dyn SchemaProvisioner> {
        self.services.schemas.clone()
    }

    pub fn cache(&self) -> Arc<dyn CachePort> {
        self.services.cache.clone()
    }
}
