//! Request gate for routes that need an authenticated identity.
//!
//! A request passes when it carries a token (the identity cookie, or an
//! `Authorization: Bearer` header) that validates and names a well-formed
//! user id. The id is then available to handlers through [`Identity`].
//! Anything else is answered with `401 {"error": "Unauthorized"}` and the
//! handler never runs.

use std::future::{ready, Ready};

use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{Payload, ServiceRequest, ServiceResponse},
    error::ErrorInternalServerError,
    middleware::Next,
    web, FromRequest, HttpMessage, HttpRequest,
};
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::token::{TokenError, TokenService};
use crate::error::AppError;
use crate::response;
use crate::AppState;

const BEARER_PREFIX: &str = "bearer ";

/// The authenticated user behind a gated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(pub ObjectId);

impl Identity {
    pub fn id(&self) -> &ObjectId {
        &self.0
    }
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let identity = req.extensions().get::<Identity>().copied();
        ready(identity.ok_or_else(|| {
            warn!("Unauthorized: no identity attached to {}", req.path());
            AppError::Unauthorized("Unauthorized".into())
        }))
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Rejection {
    #[error("no token in cookie or Authorization header")]
    MissingToken,

    #[error("token rejected: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("subject {0:?} is not a valid user id")]
    MalformedSubject(String),
}

/// Token from the identity cookie, falling back to a bearer header.
pub fn extract_token(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    if let Some(cookie) = req.cookie(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_owned());
        }
    }

    let header = req.headers().get("Authorization")?.to_str().ok()?;
    let scheme = header.get(..BEARER_PREFIX.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }

    let token = &header[BEARER_PREFIX.len()..];
    (!token.is_empty()).then(|| token.to_owned())
}

/// Runs extraction, validation and the identity shape check.
pub fn admit(
    req: &HttpRequest,
    cookie_name: &str,
    tokens: &TokenService,
    now: DateTime<Utc>,
) -> Result<Identity, Rejection> {
    let token = extract_token(req, cookie_name).ok_or(Rejection::MissingToken)?;
    let subject = tokens.validate(&token, now)?;
    let id = ObjectId::parse_str(&subject).map_err(|_| Rejection::MalformedSubject(subject))?;
    Ok(Identity(id))
}

/// Middleware entry point, mounted with `middleware::from_fn`.
pub async fn require_identity<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, actix_web::Error> {
    let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
        error!("AppState missing from app data; cannot authenticate {}", req.path());
        return Err(ErrorInternalServerError("server misconfigured"));
    };

    let cookie_name = &state.config.auth.cookie_name;
    match admit(req.request(), cookie_name, state.auth.tokens(), Utc::now()) {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            Ok(next.call(req).await?.map_into_left_body())
        }
        Err(reason) => {
            warn!("Unauthorized {} {}: {}", req.method(), req.path(), reason);
            Ok(req.into_response(response::unauthorized()).map_into_right_body())
        }
    }
}
