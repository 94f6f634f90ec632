pub mod auth;
pub mod blog;
pub mod config;
pub mod db;
pub mod error;
pub mod response;
pub mod routes;

use std::sync::Arc;

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware, web, App, HttpResponse,
};
use tracing::warn;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AuthService, CredentialStore, Identity, TokenService};
pub use db::{InMemoryStore, MongoStore, PostStore, UserStore};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Upper bound on token lifetime (one year).
pub const MAX_TOKEN_EXPIRY_HOURS: i64 = 24 * 365;

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth: Arc<AuthService>,
    pub posts: Arc<dyn PostStore>,
}

impl AppState {
    /// Connects the configured store and builds the auth services.
    pub async fn new(config: Settings) -> Result<Self> {
        if config.database.in_memory {
            warn!("Using the in-memory store; data is lost on restart");
            let store = InMemoryStore::new();
            return Self::with_stores(config, Arc::new(store.clone()), Arc::new(store));
        }

        let store = MongoStore::connect(&config.database).await?;
        Self::with_stores(config, Arc::new(store.clone()), Arc::new(store))
    }

    pub fn with_stores(
        config: Settings,
        users: Arc<dyn UserStore>,
        posts: Arc<dyn PostStore>,
    ) -> Result<Self> {
        let expiry_hours = config.auth.token_expiry_hours;
        if !(1..=MAX_TOKEN_EXPIRY_HOURS).contains(&expiry_hours) {
            return Err(AppError::ConfigError(format!(
                "auth.token_expiry_hours must be between 1 and {}, got {}",
                MAX_TOKEN_EXPIRY_HOURS, expiry_hours
            )));
        }

        let credentials = CredentialStore::from_config(&config.auth)
            .map_err(|e| AppError::ConfigError(e.to_string()))?;
        let tokens = TokenService::new(&config.auth.jwt_secret, chrono::Duration::hours(expiry_hours));

        Ok(Self {
            config: Arc::new(config),
            auth: Arc::new(AuthService::new(users, credentials, tokens)),
            posts,
        })
    }
}

/// Malformed JSON bodies get the regular 400 envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        warn!("Rejected request body: {}", err);
        AppError::BadRequest("Invalid request".into()).into()
    })
}

/// Builds the application with every route and the shared middleware.
/// CORS is left to the caller since it depends on deployment settings.
pub fn create_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(state))
        .app_data(json_config())
        .wrap(middleware::NormalizePath::trim())
        .wrap(middleware::Logger::default())
        .route("/health", web::get().to(health_check))
        .configure(routes::configure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test as actix_test;

    fn test_state() -> AppState {
        let config = Settings::new_for_test().expect("Failed to load test config");
        let store = InMemoryStore::new();
        AppState::with_stores(config, Arc::new(store.clone()), Arc::new(store))
            .expect("Failed to build state")
    }

    #[actix_rt::test]
    async fn test_app_state_in_memory() {
        let config = Settings::new_for_test().expect("Failed to load test config");
        let state = AppState::new(config).await;
        assert!(state.is_ok());
    }

    #[test]
    fn test_app_state_clone() {
        let state = test_state();
        let cloned = state.clone();

        assert!(Arc::ptr_eq(&state.config, &cloned.config));
        assert!(Arc::ptr_eq(&state.auth, &cloned.auth));
        assert!(Arc::ptr_eq(&state.posts, &cloned.posts));
    }

    #[test]
    fn test_bad_hash_params_are_config_errors() {
        let mut config = Settings::new_for_test().unwrap();
        config.auth.hash_memory_kib = 0;
        let store = InMemoryStore::new();

        let result = AppState::with_stores(config, Arc::new(store.clone()), Arc::new(store));
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_token_expiry_must_be_in_range() {
        for hours in [0, -24, MAX_TOKEN_EXPIRY_HOURS + 1, i64::MAX] {
            let mut config = Settings::new_for_test().unwrap();
            config.auth.token_expiry_hours = hours;
            let store = InMemoryStore::new();

            let result = AppState::with_stores(config, Arc::new(store.clone()), Arc::new(store));
            assert!(matches!(result, Err(AppError::ConfigError(_))), "{}", hours);
        }

        let mut config = Settings::new_for_test().unwrap();
        config.auth.token_expiry_hours = MAX_TOKEN_EXPIRY_HOURS;
        let store = InMemoryStore::new();
        let state = AppState::with_stores(config, Arc::new(store.clone()), Arc::new(store)).unwrap();
        assert_eq!(state.auth.tokens().ttl().num_hours(), MAX_TOKEN_EXPIRY_HOURS);
    }

    #[actix_rt::test]
    async fn test_malformed_json_gets_envelope() {
        let app = actix_test::init_service(create_app(test_state())).await;

        let resp = actix_test::TestRequest::post()
            .uri("/api/auth/login")
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
            .send_request(&app)
            .await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = actix_test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({ "success": false, "message": "Invalid request" }));
    }
}
