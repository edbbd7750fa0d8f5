pub mod create_tenant;
pub mod error;
pub mod get_tenant;
pub mod impersonate;
pub mod list_tenants;
pub mod provision_tenant;
pub mod refresh_usage;
pub mod resolve_tenant;
pub mod suspend_tenant;
pub mod tenant_stats;
pub mod update_tenant;
