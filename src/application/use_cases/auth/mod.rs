pub mod ensure_superuser;
pub mod login;
pub mod me;
pub mod register;
pub mod rename_user;
