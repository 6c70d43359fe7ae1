//! Domain entities - the core business objects.

mod comment;
mod like;
mod post;
mod search;
mod user;

pub use comment::{Comment, CommentView};
pub use like::{Like, LikeToggle};
pub use post::{Post, PostChanges, PostRecord, PostView};
pub use search::SearchQuery;
pub use user::{ProfileChanges, PublicUser, User, normalize_email};
