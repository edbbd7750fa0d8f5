pub mod cache_port;
pub mod schema_provisioner;
pub mod task_queue;
pub mod tenant_repository;
pub mod user_repository;
