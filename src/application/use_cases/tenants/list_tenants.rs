use crate::application::dto::tenants::{TenantListItemDto, TenantPageDto};
use crate::application::ports::tenant_repository::{TenantFilter, TenantRepository};

pub const DEFAULT_PAGE_SIZE: i64 = 25;
pub const MAX_PAGE_SIZE: i64 = 100;

pub struct ListTenants<'a, T: TenantRepository + ?Sized> {
    pub tenants: &'a T,
}

impl<'a, T: TenantRepository + ?Sized> ListTenants<'a, T> {
    pub async fn execute(&self, mut filter: TenantFilter) -> anyhow::Result<TenantPageDto> {
        filter.limit = if filter.limit <= 0 {
            DEFAULT_PAGE_SIZE
        } else {
            filter.limit.min(MAX_PAGE_SIZE)
        };
        filter.offset = filter.offset.max(0);
        filter.search = filter
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let (rows, total) = self.tenants.list(&filter).await?;
        Ok(TenantPageDto {
            items: rows.into_iter().map(TenantListItemDto::from).collect(),
            total,
            limit: filter.limit,
            offset: filter.offset,
        })
    }
}
