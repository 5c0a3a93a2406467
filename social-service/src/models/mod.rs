pub mod comment;
pub mod notification;
pub mod post;
pub mod user;

pub use comment::Comment;
pub use notification::{Notification, NotificationKind};
pub use post::Post;
pub use user::{ProfileUpdate, User};
