//! Database repositories.

mod comment;
mod policy;
mod user;
mod vote;

pub use comment::CommentRepository;
pub use policy::PolicyRepository;
pub use user::UserRepository;
pub use vote::{PolicyStanceCount, StanceCount, VoteRepository};

use serde::Deserialize;

/// Creation-time ordering for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Most recent first.
    #[default]
    Newest,
    /// Oldest first.
    Oldest,
}
