//! Document storage for users and posts.
//!
//! Handlers talk to [`UserStore`] and [`PostStore`]; [`MongoStore`] backs a
//! deployment and [`InMemoryStore`] backs tests and database-less runs.

pub mod memory;
pub mod models;
pub mod mongo;
pub mod store;

pub use memory::InMemoryStore;
pub use models::{Comment, LikeOutcome, Post, PostChanges, User};
pub use mongo::MongoStore;
pub use store::{PostStore, UserStore};
