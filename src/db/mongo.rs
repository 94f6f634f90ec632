//! MongoDB-backed store.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
    Client, Collection, IndexModel,
};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::db::models::{Comment, LikeOutcome, Post, PostChanges, User, POST_COLLECTION, USER_COLLECTION};
use crate::db::store::{PostStore, UserStore};
use crate::error::DatabaseError;

const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

/// Cheap to clone; the driver pools connections behind `Client`.
#[derive(Clone)]
pub struct MongoStore {
    users: Collection<User>,
    posts: Collection<Post>,
}

impl MongoStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        info!("Connecting to MongoDB at {}", config.url);

        let client = Client::with_uri_str(&config.url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        let db = client.database(&config.name);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| DatabaseError::ConnectionError(format!("ping failed: {}", e)))?;

        let store = Self {
            users: db.collection(USER_COLLECTION),
            posts: db.collection(POST_COLLECTION),
        };
        store.apply_indexes().await?;

        info!("Connected to MongoDB database '{}'", config.name);
        Ok(store)
    }

    async fn apply_indexes(&self) -> Result<(), DatabaseError> {
        let email_unique = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("email_unique".to_string())
                    .build(),
            )
            .build();

        self.users.create_index(email_unique).await?;
        Ok(())
    }
}

fn owned_by(id: &ObjectId, owner: &ObjectId) -> Document {
    doc! { "_id": *id, "author": *owner }
}

/// `$set` update for the provided fields; `updated_at` always moves.
fn changes_update(changes: &PostChanges, now: DateTime<Utc>) -> Document {
    let mut set = doc! { "updated_at": bson::DateTime::from_chrono(now) };
    if let Some(title) = &changes.title {
        set.insert("title", title.as_str());
    }
    if let Some(content) = &changes.content {
        set.insert("content", content.as_str());
    }
    doc! { "$set": set }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        match self.users.insert_one(user).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(DatabaseError::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.find_one(doc! { "email": email }).await?)
    }

    async fn find_user_by_id(&self, id: &ObjectId) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.find_one(doc! { "_id": *id }).await?)
    }
}

#[async_trait]
impl PostStore for MongoStore {
    async fn insert_post(&self, post: &Post) -> Result<(), DatabaseError> {
        match self.posts.insert_one(post).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(DatabaseError::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_posts(&self) -> Result<Vec<Post>, DatabaseError> {
        let cursor = self.posts.find(doc! {}).await?;
        let posts: Vec<Post> = cursor.try_collect().await?;
        Ok(posts)
    }

    async fn find_post(&self, id: &ObjectId) -> Result<Option<Post>, DatabaseError> {
        Ok(self.posts.find_one(doc! { "_id": *id }).await?)
    }

    async fn update_owned_post(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        changes: &PostChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Post>, DatabaseError> {
        Ok(self
            .posts
            .find_one_and_update(owned_by(id, owner), changes_update(changes, now))
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn delete_owned_post(&self, id: &ObjectId, owner: &ObjectId) -> Result<bool, DatabaseError> {
        let result = self.posts.delete_one(owned_by(id, owner)).await?;
        Ok(result.deleted_count > 0)
    }

    async fn add_like(&self, id: &ObjectId, liker: &ObjectId) -> Result<LikeOutcome, DatabaseError> {
        let result = self
            .posts
            .update_one(doc! { "_id": *id }, doc! { "$addToSet": { "likes": *liker } })
            .await?;

        Ok(match (result.matched_count, result.modified_count) {
            (0, _) => LikeOutcome::PostNotFound,
            (_, 0) => LikeOutcome::AlreadyLiked,
            _ => LikeOutcome::Added,
        })
    }

    async fn append_comment(&self, id: &ObjectId, comment: &Comment) -> Result<bool, DatabaseError> {
        let comment = bson::to_bson(comment).map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        let result = self
            .posts
            .update_one(doc! { "_id": *id }, doc! { "$push": { "comments": comment } })
            .await?;

        Ok(result.matched_count > 0)
    }
}
