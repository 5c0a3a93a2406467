pub mod comments;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod posts;
pub mod users;
