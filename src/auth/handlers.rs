use actix_web::{
    cookie::{time::{Duration, OffsetDateTime}, Cookie},
    http::StatusCode,
    web, HttpRequest, HttpResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::gate::extract_token;
use crate::db::models::UserProfile;
use crate::error::AppError;
use crate::response;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterRequest {
    fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.email.trim().is_empty() && !self.password.is_empty()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
}

fn identity_cookie(name: &str, value: String, expires: OffsetDateTime) -> Cookie<'static> {
    Cookie::build(name.to_owned(), value)
        .path("/")
        .http_only(true)
        .expires(expires)
        .finish()
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if !req.is_complete() {
        warn!("Registration rejected: missing fields");
        return Err(AppError::BadRequest("Invalid request".into()));
    }
    info!("Received registration request for email: {}", req.email);

    match state.auth.register(req.username.trim(), req.email.trim(), &req.password, Utc::now()).await {
        Ok(user) => {
            info!("Registration successful for email: {} (id {})", user.email, user.id);
            Ok(response::ok(StatusCode::CREATED, "User registered"))
        }
        Err(e) => {
            warn!("Registration failed for email: {}: {}", req.email, e);
            Err(e)
        }
    }
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for email: {}", req.email);

    let now = Utc::now();
    let (user, token) = match state.auth.login(req.email.trim(), &req.password, now).await {
        Ok(issued) => issued,
        Err(e) => {
            warn!("Login failed for email: {}: {}", req.email, e);
            return Err(e);
        }
    };
    info!("Login successful for user {}", user.id);

    let ttl = Duration::seconds(state.auth.tokens().ttl().num_seconds());
    let cookie = identity_cookie(&state.config.auth.cookie_name, token.clone(), OffsetDateTime::now_utc() + ttl);

    let mut resp = response::success(StatusCode::OK, "Login successful", Some(AuthResponse { token }));
    resp.add_cookie(&cookie)
        .map_err(AppError::internal("Login failed"))?;
    Ok(resp)
}

/// Returns the caller's account. Resolves its own token rather than sitting
/// behind the gate, so failures use the regular envelope.
pub async fn current_user(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = extract_token(&req, &state.config.auth.cookie_name)
        .ok_or_else(|| AppError::Unauthorized("Unauthenticated".into()))?;

    let user = state.auth.current_user(&token, Utc::now()).await?;
    Ok(response::success(StatusCode::OK, "User found", Some(UserProfile::from(user))))
}

pub async fn logout(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let expired = identity_cookie(
        &state.config.auth.cookie_name,
        String::new(),
        OffsetDateTime::now_utc() - Duration::hours(1),
    );

    let mut resp = response::ok(StatusCode::OK, "Logout successful");
    resp.add_cookie(&expired)
        .map_err(AppError::internal("Logout failed"))?;
    Ok(resp)
}
