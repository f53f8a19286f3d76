//! Database entities.

#![allow(missing_docs)]

pub mod comment;
pub mod policy;
pub mod user;
pub mod vote;

pub use comment::Entity as Comment;
pub use policy::Entity as Policy;
pub use user::Entity as User;
pub use vote::Entity as Vote;
