pub mod cache;
pub mod db;
pub mod mail;
pub mod net;
pub mod queue;
pub mod telemetry;
