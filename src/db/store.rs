//! Storage capabilities the handlers depend on.
//!
//! Every post mutation is a single atomic operation on one document, so an
//! implementation never needs an application-side lock spanning a check and
//! a write.

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};

use crate::db::models::{Comment, LikeOutcome, Post, PostChanges, User};
use crate::error::DatabaseError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`DatabaseError::Duplicate`] when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_user_by_id(&self, id: &ObjectId) -> Result<Option<User>, DatabaseError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert_post(&self, post: &Post) -> Result<(), DatabaseError>;

    async fn find_posts(&self) -> Result<Vec<Post>, DatabaseError>;

    async fn find_post(&self, id: &ObjectId) -> Result<Option<Post>, DatabaseError>;

    /// Applies `changes` only if the post exists and belongs to `owner`.
    /// Returns the updated post, or `None` when nothing matched.
    async fn update_owned_post(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        changes: &PostChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Post>, DatabaseError>;

    /// Deletes only if the post exists and belongs to `owner`.
    async fn delete_owned_post(&self, id: &ObjectId, owner: &ObjectId) -> Result<bool, DatabaseError>;

    /// Set-add of `liker` to the post's likes.
    async fn add_like(&self, id: &ObjectId, liker: &ObjectId) -> Result<LikeOutcome, DatabaseError>;

    /// Appends to the post's comments. Returns false when the post is absent.
    async fn append_comment(&self, id: &ObjectId, comment: &Comment) -> Result<bool, DatabaseError>;
}
