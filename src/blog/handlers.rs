use actix_web::{http::StatusCode, web, HttpResponse};
use bson::oid::ObjectId;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::Identity;
use crate::db::models::{Comment, CommentView, LikeOutcome, Post, PostChanges, PostView};
use crate::error::AppError;
use crate::response;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}

fn parse_id(raw: &str, message: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw).map_err(|_| {
        warn!("Rejected malformed id {:?}", raw);
        AppError::BadRequest(message.to_string())
    })
}

pub async fn list_posts(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let posts = state
        .posts
        .find_posts()
        .await
        .map_err(AppError::internal("Failed to fetch blogs"))?;

    let views: Vec<PostView> = posts.into_iter().map(PostView::from).collect();
    Ok(response::success(StatusCode::OK, "Blogs retrieved", Some(views)))
}

pub async fn get_post(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "Invalid ID")?;

    let post = state
        .posts
        .find_post(&id)
        .await
        .map_err(AppError::internal("Failed to fetch blog"))?
        .ok_or_else(|| AppError::NotFound("Blog not found".into()))?;

    Ok(response::success(StatusCode::OK, "Blog retrieved", Some(PostView::from(post))))
}

pub async fn create_post(
    identity: Identity,
    req: web::Json<CreatePostRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    if req.title.trim().is_empty() || req.content.trim().is_empty() {
        return Err(AppError::BadRequest("Invalid request".into()));
    }

    let post = Post::new(req.title, req.content, identity.0, Utc::now());
    state
        .posts
        .insert_post(&post)
        .await
        .map_err(AppError::internal("Failed to create blog"))?;

    info!("User {} created blog {}", identity.0, post.id);
    Ok(response::success(StatusCode::CREATED, "Blog created", Some(PostView::from(post))))
}

/// Tells a non-owner apart from a missing post after a conditional write
/// matched nothing.
async fn ownership_failure(state: &AppState, id: &ObjectId) -> AppError {
    match state.posts.find_post(id).await {
        Ok(Some(_)) => AppError::Forbidden("Not the author of this blog".into()),
        Ok(None) => AppError::NotFound("Blog not found".into()),
        Err(e) => AppError::internal("Failed to fetch blog")(e),
    }
}

pub async fn update_post(
    identity: Identity,
    path: web::Path<String>,
    req: web::Json<UpdatePostRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "Invalid ID")?;

    let req = req.into_inner();
    let changes = PostChanges {
        title: req.title.filter(|t| !t.trim().is_empty()),
        content: req.content.filter(|c| !c.trim().is_empty()),
    };
    if changes.is_empty() {
        return Err(AppError::BadRequest("Invalid request".into()));
    }

    let updated = state
        .posts
        .update_owned_post(&id, identity.id(), &changes, Utc::now())
        .await
        .map_err(AppError::internal("Failed to update blog"))?;

    match updated {
        Some(post) => {
            info!("User {} updated blog {}", identity.0, id);
            Ok(response::success(StatusCode::OK, "Blog updated", Some(PostView::from(post))))
        }
        None => {
            let err = ownership_failure(&state, &id).await;
            warn!("Update of blog {} by {} refused: {}", id, identity.0, err);
            Err(err)
        }
    }
}

pub async fn delete_post(
    identity: Identity,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "Invalid ID")?;

    let deleted = state
        .posts
        .delete_owned_post(&id, identity.id())
        .await
        .map_err(AppError::internal("Failed to delete blog"))?;

    if !deleted {
        let err = ownership_failure(&state, &id).await;
        warn!("Delete of blog {} by {} refused: {}", id, identity.0, err);
        return Err(err);
    }

    info!("User {} deleted blog {}", identity.0, id);
    Ok(response::ok(StatusCode::OK, "Blog deleted"))
}

pub async fn like_post(
    identity: Identity,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "Invalid blog ID")?;

    let outcome = state
        .posts
        .add_like(&id, identity.id())
        .await
        .map_err(AppError::internal("Failed to like blog"))?;

    match outcome {
        LikeOutcome::Added => Ok(response::ok(StatusCode::OK, "Blog liked")),
        LikeOutcome::AlreadyLiked => Ok(response::ok(StatusCode::OK, "Blog already liked")),
        LikeOutcome::PostNotFound => Err(AppError::NotFound("Blog not found".into())),
    }
}

pub async fn comment_post(
    identity: Identity,
    path: web::Path<String>,
    req: web::Json<CommentRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = parse_id(&path, "Invalid blog ID")?;

    let text = req.into_inner().text;
    if text.trim().is_empty() {
        return Err(AppError::BadRequest("Invalid comment text".into()));
    }

    let comment = Comment {
        text,
        author: identity.0,
        created_at: Utc::now(),
    };
    let appended = state
        .posts
        .append_comment(&id, &comment)
        .await
        .map_err(AppError::internal("Failed to add comment"))?;

    if !appended {
        return Err(AppError::NotFound("Blog not found".into()));
    }
    Ok(response::success(StatusCode::OK, "Comment added", Some(CommentView::from(comment))))
}
