//! Business logic, persistence and upstream providers of social-service.

pub mod accounts;
pub mod clerk;
mod database;
pub mod error;
pub mod feed;
mod jwt;
pub mod media;
mod memory;
pub mod metrics;
pub mod notifications;
pub mod store;

pub use accounts::AccountService;
pub use clerk::{
    ClerkApi, ClerkClaims, ClerkSessionVerifier, ClerkUser, HttpClerkClient, MockClerkClient,
};
pub use database::MongoDb;
pub use error::ProviderError;
pub use feed::FeedService;
pub use jwt::{LocalClaims, TokenService};
pub use media::{CloudinaryProvider, HostedImage, ImageHost, LinkOnlyImageHost, MockImageHost};
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use notifications::NotificationService;
pub use store::{SocialStore, DUPLICATE_USER};
