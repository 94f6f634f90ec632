use std::sync::Arc;

use actix_web::web;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use tracing::error;

use crate::auth::password::CredentialStore;
use crate::auth::token::TokenService;
use crate::db::models::User;
use crate::db::store::UserStore;
use crate::error::{AppError, DatabaseError};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub struct AuthService {
    users: Arc<dyn UserStore>,
    credentials: Arc<CredentialStore>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, credentials: CredentialStore, tokens: TokenService) -> Self {
        Self {
            users,
            credentials: Arc::new(credentials),
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AppError> {
        // argon2 is deliberately slow; keep it off the async workers
        let credentials = self.credentials.clone();
        let password = password.to_owned();
        let password_hash = web::block(move || credentials.hash(&password))
            .await
            .map_err(AppError::internal("Registration failed"))?
            .map_err(AppError::internal("Registration failed"))?;

        let user = User::new(username.to_owned(), email.to_owned(), password_hash, now);
        match self.users.insert_user(&user).await {
            Ok(()) => Ok(user),
            Err(DatabaseError::Duplicate) => Err(AppError::Conflict("Email already exists".into())),
            Err(e) => Err(AppError::internal("Registration failed")(e)),
        }
    }

    /// Checks credentials and issues a token. An unknown email and a wrong
    /// password produce the same error after the same amount of work.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<(User, String), AppError> {
        let user = self
            .users
            .find_user_by_email(email)
            .await
            .map_err(AppError::internal("Login failed"))?;

        let credentials = self.credentials.clone();
        let password = password.to_owned();
        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let verified = web::block(move || match stored_hash {
            Some(hash) => credentials.verify(&password, &hash),
            None => credentials.verify_absent(&password),
        })
        .await
        .map_err(AppError::internal("Login failed"))?;

        let user = match user {
            Some(user) if verified => user,
            _ => return Err(AppError::BadRequest(INVALID_CREDENTIALS.into())),
        };

        let token = self
            .tokens
            .issue(&user.id, now)
            .map_err(AppError::internal("Login failed"))?;

        Ok((user, token))
    }

    /// Resolves the account a token was issued for.
    pub async fn current_user(&self, token: &str, now: DateTime<Utc>) -> Result<User, AppError> {
        let unauthenticated = || AppError::Unauthorized("Unauthenticated".into());

        let subject = self.tokens.validate(token, now).map_err(|_| unauthenticated())?;
        let id = ObjectId::parse_str(&subject).map_err(|_| unauthenticated())?;

        match self.users.find_user_by_id(&id).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(AppError::NotFound("User not found".into())),
            Err(e) => {
                error!("User lookup failed for {}: {}", id, e);
                Err(AppError::Internal("Failed to fetch user".into()))
            }
        }
    }
}
