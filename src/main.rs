use actix_cors::Cors;
use actix_web::{http::header, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use inkpost_server::{config::CorsConfig, create_app, AppState, Settings};
use std::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn cors_from(config: &CorsConfig) -> Cors {
    if !config.enabled {
        // CORS disabled - use most restrictive settings
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .expose_any_header()
            .supports_credentials()
    } else {
        config
            .origins()
            .into_iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
            .supports_credentials()
    };

    cors.max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Load configuration
    let config = Settings::new().context("failed to load configuration")?;
    info!("Configuration loaded for environment {}", config.environment);

    if config.uses_development_secret() && !matches!(config.environment.as_str(), "development" | "test") {
        warn!("Signing tokens with the development secret; set APP_AUTH__JWT_SECRET");
    }

    let state = AppState::new(config.clone())
        .await
        .context("failed to initialize application state")?;

    if config.cors.enabled && !config.cors.allow_any_origin && config.cors.origins().is_empty() {
        warn!("CORS restricted but APP_CORS__ALLOWED_ORIGINS is empty; browsers will be refused");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).with_context(|| format!("failed to bind {}", addr))?;
    info!("Starting server at {}", addr);

    let cors_config = config.cors.clone();
    HttpServer::new(move || create_app(state.clone()).wrap(cors_from(&cors_config)))
        .listen(listener)?
        .workers(config.server.workers as usize)
        .run()
        .await
        .context("server terminated abnormally")?;

    Ok(())
}
