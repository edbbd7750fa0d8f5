pub mod auth;
pub mod tenants;
pub mod worker;
