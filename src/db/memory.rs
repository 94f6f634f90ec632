//! Process-local store backed by `RwLock`ed maps.
//!
//! Each operation takes the write lock once, which gives it the same
//! single-document atomicity MongoDB provides.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::db::models::{Comment, LikeOutcome, Post, PostChanges, User};
use crate::db::store::{PostStore, UserStore};
use crate::error::DatabaseError;

#[derive(Clone, Default)]
pub struct InMemoryStore {
    users: Arc<RwLock<HashMap<ObjectId, User>>>,
    posts: Arc<RwLock<Vec<Post>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) || users.contains_key(&user.id) {
            return Err(DatabaseError::Duplicate);
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: &ObjectId) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.read().await.get(id).cloned())
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn insert_post(&self, post: &Post) -> Result<(), DatabaseError> {
        let mut posts = self.posts.write().await;

        if posts.iter().any(|p| p.id == post.id) {
            return Err(DatabaseError::Duplicate);
        }
        posts.push(post.clone());
        Ok(())
    }

    async fn find_posts(&self) -> Result<Vec<Post>, DatabaseError> {
        Ok(self.posts.read().await.clone())
    }

    async fn find_post(&self, id: &ObjectId) -> Result<Option<Post>, DatabaseError> {
        let posts = self.posts.read().await;
        Ok(posts.iter().find(|p| &p.id == id).cloned())
    }

    async fn update_owned_post(
        &self,
        id: &ObjectId,
        owner: &ObjectId,
        changes: &PostChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Post>, DatabaseError> {
        let mut posts = self.posts.write().await;

        let Some(post) = posts.iter_mut().find(|p| &p.id == id && &p.author == owner) else {
            return Ok(None);
        };
        if let Some(title) = &changes.title {
            post.title = title.clone();
        }
        if let Some(content) = &changes.content {
            post.content = content.clone();
        }
        post.updated_at = now;
        Ok(Some(post.clone()))
    }

    async fn delete_owned_post(&self, id: &ObjectId, owner: &ObjectId) -> Result<bool, DatabaseError> {
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|p| !(&p.id == id && &p.author == owner));
        Ok(posts.len() < before)
    }

    async fn add_like(&self, id: &ObjectId, liker: &ObjectId) -> Result<LikeOutcome, DatabaseError> {
        let mut posts = self.posts.write().await;

        match posts.iter_mut().find(|p| &p.id == id) {
            None => Ok(LikeOutcome::PostNotFound),
            Some(post) if post.likes.contains(liker) => Ok(LikeOutcome::AlreadyLiked),
            Some(post) => {
                post.likes.push(*liker);
                Ok(LikeOutcome::Added)
            }
        }
    }

    async fn append_comment(&self, id: &ObjectId, comment: &Comment) -> Result<bool, DatabaseError> {
        let mut posts = self.posts.write().await;

        match posts.iter_mut().find(|p| &p.id == id) {
            Some(post) => {
                post.comments.push(comment.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User::new("someone".into(), email.into(), "hash".into(), Utc::now())
    }

    #[tokio::test]
    async fn test_duplicate_email_keeps_first_user() {
        let store = InMemoryStore::new();
        let first = user("dup@example.com");
        store.insert_user(&first).await.unwrap();

        let mut second = user("dup@example.com");
        second.username = "intruder".into();
        assert!(matches!(store.insert_user(&second).await, Err(DatabaseError::Duplicate)));

        let found = store.find_user_by_email("dup@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert_eq!(found.username, "someone");
        assert!(store.find_user_by_id(&second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_likes_are_counted_once_each() {
        let store = InMemoryStore::new();
        let post = Post::new("t".into(), "c".into(), ObjectId::new(), Utc::now());
        store.insert_post(&post).await.unwrap();

        let likers: Vec<ObjectId> = (0..32).map(|_| ObjectId::new()).collect();
        let mut handles = Vec::new();
        for liker in likers.iter().chain(likers.iter()).copied() {
            let store = store.clone();
            let post_id = post.id;
            handles.push(tokio::spawn(async move { store.add_like(&post_id, &liker).await.unwrap() }));
        }

        let mut added = 0;
        for handle in handles {
            if handle.await.unwrap() == LikeOutcome::Added {
                added += 1;
            }
        }

        let stored = store.find_post(&post.id).await.unwrap().unwrap();
        assert_eq!(added, likers.len());
        assert_eq!(stored.likes.len(), likers.len());
    }

    #[tokio::test]
    async fn test_like_missing_post() {
        let store = InMemoryStore::new();
        let outcome = store.add_like(&ObjectId::new(), &ObjectId::new()).await.unwrap();
        assert_eq!(outcome, LikeOutcome::PostNotFound);
    }

    #[tokio::test]
    async fn test_owner_checks_on_update_and_delete() {
        let store = InMemoryStore::new();
        let owner = ObjectId::new();
        let stranger = ObjectId::new();
        let post = Post::new("title".into(), "body".into(), owner, Utc::now());
        store.insert_post(&post).await.unwrap();

        let changes = PostChanges { title: Some("hijacked".into()), content: None };
        assert!(store.update_owned_post(&post.id, &stranger, &changes, Utc::now()).await.unwrap().is_none());
        assert!(!store.delete_owned_post(&post.id, &stranger).await.unwrap());
        assert_eq!(store.find_post(&post.id).await.unwrap().unwrap().title, "title");

        let updated = store.update_owned_post(&post.id, &owner, &changes, Utc::now()).await.unwrap().unwrap();
        assert_eq!(updated.title, "hijacked");
        assert_eq!(updated.content, "body");

        assert!(store.delete_owned_post(&post.id, &owner).await.unwrap());
        assert!(store.find_post(&post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_comments_keep_order() {
        let store = InMemoryStore::new();
        let post = Post::new("t".into(), "c".into(), ObjectId::new(), Utc::now());
        store.insert_post(&post).await.unwrap();

        for text in ["first", "second", "third"] {
            let comment = Comment { text: text.into(), author: ObjectId::new(), created_at: Utc::now() };
            assert!(store.append_comment(&post.id, &comment).await.unwrap());
        }
        let comment = Comment { text: "lost".into(), author: ObjectId::new(), created_at: Utc::now() };
        assert!(!store.append_comment(&ObjectId::new(), &comment).await.unwrap());

        let texts: Vec<String> = store.find_post(&post.id).await.unwrap().unwrap()
            .comments.into_iter().map(|c| c.text).collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }
}
