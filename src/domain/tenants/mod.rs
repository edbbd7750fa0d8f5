pub mod naming;
pub mod tenant;
