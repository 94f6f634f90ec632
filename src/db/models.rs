use bson::oid::ObjectId;
use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Collection holding [`User`] documents.
pub const USER_COLLECTION: &str = "users";
/// Collection holding [`Post`] documents.
pub const POST_COLLECTION: &str = "blogs";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string, never the plaintext.
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: ObjectId::new(),
            username,
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    pub author: ObjectId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    pub content: String,
    pub author: ObjectId,
    /// Likers, each at most once.
    #[serde(default)]
    pub likes: Vec<ObjectId>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(title: String, content: String, author: ObjectId, now: DateTime<Utc>) -> Self {
        Self {
            id: ObjectId::new(),
            title,
            content,
            author,
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Owner-supplied edits; `None` leaves the field as stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl PostChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

/// Result of adding a liker to a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    Added,
    AlreadyLiked,
    PostNotFound,
}

// JSON views. Ids render as hex strings and the password hash never leaves
// the server.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_hex(),
            username: user.username,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub text: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        Self {
            text: comment.text,
            author: comment.author.to_hex(),
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    pub likes: Vec<String>,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            id: post.id.to_hex(),
            title: post.title,
            content: post.content,
            author: post.author.to_hex(),
            likes: post.likes.iter().map(|id| id.to_hex()).collect(),
            comments: post.comments.into_iter().map(CommentView::from).collect(),
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}
