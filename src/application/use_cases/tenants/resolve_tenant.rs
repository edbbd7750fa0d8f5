use std::time::Duration;

use crate::application::ports::cache_port::CachePort;
use crate::application::ports::tenant_repository::TenantRepository;
use crate::domain::tenants::naming::{full_domain, normalize_domain};
use crate::domain::tenants::tenant::Tenant;

const HOST_CACHE_TTL: Duration = Duration::from_secs(300);

pub fn host_cache_key(domain: &str) -> String {
    format!("tenant-host:{domain}")
}

/// Maps a request host to the tenant routed there. The admin subdomain,
/// unknown hosts and tenants that cannot access their site resolve to `None`.
pub struct ResolveTenant<'a, T, C>
where
    T: TenantRepository + ?Sized,
    C: CachePort + ?Sized,
{
    pub tenants: &'a T,
    pub cache: &'a C,
    pub base_domain: &'a str,
    pub admin_subdomain: &'a str,
}

impl<'a, T, C> ResolveTenant<'a, T, C>
where
    T: TenantRepository + ?Sized,
    C: CachePort + ?Sized,
{
    pub async fn by_subdomain(&self, subdomain: &str) -> anyhow::Result<Option<Tenant>> {
        if subdomain.eq_ignore_ascii_case(self.admin_subdomain) {
            return Ok(None);
        }
        self.by_host(&full_domain(subdomain, self.base_domain)).await
    }

    pub async fn by_host(&self, host: &str) -> anyhow::Result<Option<Tenant>> {
        let host = normalize_domain(host);
        if host.is_empty() || host == full_domain(self.admin_subdomain, self.base_domain) {
            return Ok(None);
        }

        let key = host_cache_key(&host);
        let cached_id = self
            .cache
            .get(&key)
            .await
            .and_then(|v| v.parse::<i64>().ok());
        let tenant = match cached_id {
            Some(id) => self.tenants.find_by_id(id).await?,
            None => {
                let found = self.tenants.find_by_domain(&host).await?;
                if let Some(t) = &found {
                    self.cache.set(&key, &t.id.to_string(), HOST_CACHE_TTL).await;
                }
                found
            }
        };
        Ok(tenant.filter(Tenant::can_access))
    }
}
