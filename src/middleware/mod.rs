pub mod auth_guard;
pub mod locale;
pub mod role_guard;
