//! Blog post endpoints: public reads, owner-only edits, likes and comments.

pub mod handlers;
