pub mod auth;

pub use auth::{auth_middleware, AuthIdentity, CurrentUser, Identity, SESSION_COOKIE};
