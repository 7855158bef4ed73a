//! Data models
//!
//! Database entities (User, Account, Session, Post) and the input types the
//! services accept.

mod account;
mod post;
mod session;
mod user;

pub use account::Account;
pub use post::{CreatePostInput, Post, PostAuthor, PostWithAuthor, UpdatePostInput};
pub use session::Session;
pub use user::{UpdateProfileInput, User};
