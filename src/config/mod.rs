use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::env;

/// Secret used when nothing else is configured. Fine for local runs only.
pub const DEVELOPMENT_SECRET: &str = "development_secret";

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub name: String,
    /// Serve from process memory instead of MongoDB.
    pub in_memory: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiry_hours: i64,
    pub cookie_name: String,
    /// Argon2 memory cost in KiB.
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub hash_parallelism: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_any_origin: bool,
    /// Comma-separated origins used when `allow_any_origin` is off.
    pub allowed_origins: String,
    pub max_age: u32,
}

impl CorsConfig {
    pub fn origins(&self) -> Vec<&str> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
    environment: &str,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .set_default("environment", environment)?
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 3000)?
        .set_default("server.workers", num_cpus::get() as i64)?
        .set_default("database.url", "mongodb://localhost:27017")?
        .set_default("database.name", "blogdb")?
        .set_default("database.in_memory", false)?
        .set_default("auth.jwt_secret", DEVELOPMENT_SECRET)?
        .set_default("auth.token_expiry_hours", 24)?
        .set_default("auth.cookie_name", "jwt")?
        // argon2 recommended baseline, roughly 15-30ms per hash
        .set_default("auth.hash_memory_kib", 19 * 1024)?
        .set_default("auth.hash_iterations", 2)?
        .set_default("auth.hash_parallelism", 1)?
        .set_default("cors.enabled", true)?
        .set_default("cors.allow_any_origin", true)?
        .set_default("cors.allowed_origins", "")?
        .set_default("cors.max_age", 3600)
}

/// `PREFIX_SECTION__KEY` variables; a single underscore follows the prefix.
fn env_source(prefix: &str) -> Environment {
    Environment::with_prefix(prefix)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        Self::layered(&run_mode, "app")
    }

    fn layered(run_mode: &str, prefix: &str) -> Result<Self, ConfigError> {
        with_defaults(Config::builder(), run_mode)?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `APP_SERVER__PORT=5001` would set `Settings.server.port`
            .add_source(env_source(prefix))
            .build()?
            .try_deserialize()
    }

    /// Settings for tests: in-memory store and the cheapest argon2 parameters.
    /// Environment variables are not consulted.
    pub fn new_for_test() -> Result<Self, ConfigError> {
        Self::from_env_prefix("test", None)
    }

    fn from_env_prefix(environment: &str, prefix: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = with_defaults(Config::builder(), environment)?
            .set_override("server.workers", 1)?
            .set_override("database.name", "blogdb_test")?
            .set_override("database.in_memory", true)?
            .set_override("auth.jwt_secret", "test_secret")?
            .set_override("auth.hash_memory_kib", 8)?
            .set_override("auth.hash_iterations", 1)?;

        if let Some(prefix) = prefix {
            builder = builder.add_source(env_source(prefix));
        }

        builder.build()?.try_deserialize()
    }

    /// Whether the signing secret is still the built-in development value.
    pub fn uses_development_secret(&self) -> bool {
        self.auth.jwt_secret == DEVELOPMENT_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::new_for_test().expect("Failed to load settings");
        assert_eq!(settings.environment, "test");
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.server.workers, 1);
        assert_eq!(settings.database.url, "mongodb://localhost:27017");
        assert!(settings.database.in_memory);
        assert_eq!(settings.auth.token_expiry_hours, 24);
        assert_eq!(settings.auth.cookie_name, "jwt");
        assert!(!settings.uses_development_secret());
    }

    #[test]
    fn test_environment_override() {
        env::set_var("BLOGCFG_SERVER__PORT", "9000");
        env::set_var("BLOGCFG_DATABASE__URL", "mongodb://db.internal:27017");
        env::set_var("BLOGCFG_AUTH__TOKEN_EXPIRY_HOURS", "48");
        env::set_var("BLOGCFG_CORS__ALLOW_ANY_ORIGIN", "false");

        let settings = Settings::from_env_prefix("test", Some("blogcfg"))
            .expect("Failed to deserialize settings");

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.database.url, "mongodb://db.internal:27017");
        assert_eq!(settings.auth.token_expiry_hours, 48);
        assert!(!settings.cors.allow_any_origin);

        env::remove_var("BLOGCFG_SERVER__PORT");
        env::remove_var("BLOGCFG_DATABASE__URL");
        env::remove_var("BLOGCFG_AUTH__TOKEN_EXPIRY_HOURS");
        env::remove_var("BLOGCFG_CORS__ALLOW_ANY_ORIGIN");
    }

    #[test]
    fn test_invalid_port() {
        env::set_var("BADPORT_SERVER__PORT", "invalid");

        let result = Settings::from_env_prefix("test", Some("badport"));
        assert!(result.is_err(), "Expected error for invalid port");

        if let Err(e) = result {
            let error_message = e.to_string();
            assert!(
                error_message.contains("invalid digit found in string") ||
                error_message.contains("invalid value") ||
                error_message.contains("invalid type"),
                "Unexpected error: {}",
                error_message
            );
        }

        env::remove_var("BADPORT_SERVER__PORT");
    }

    #[test]
    fn test_app_prefix_reaches_settings() {
        // the only test that touches APP_* and RUN_MODE
        env::set_var("RUN_MODE", "production");
        env::set_var("APP_AUTH__JWT_SECRET", "prod-secret-from-env");
        env::set_var("APP_SERVER__PORT", "4444");

        let settings = Settings::new();

        env::remove_var("RUN_MODE");
        env::remove_var("APP_AUTH__JWT_SECRET");
        env::remove_var("APP_SERVER__PORT");

        let settings = settings.expect("Failed to load settings");
        assert_eq!(settings.auth.jwt_secret, "prod-secret-from-env");
        assert_eq!(settings.server.port, 4444);
        assert_eq!(settings.environment, "production");
        assert!(!settings.uses_development_secret());
    }

    #[test]
    fn test_environment_follows_run_mode() {
        let settings = Settings::layered("staging", "runmodecfg").expect("Failed to load settings");
        assert_eq!(settings.environment, "staging");
        assert!(settings.uses_development_secret());
    }

    #[test]
    fn test_cors_origins_list() {
        env::set_var("ORIGINCFG_CORS__ALLOWED_ORIGINS", "https://blog.example.com, http://localhost:5173,,");

        let settings = Settings::from_env_prefix("test", Some("origincfg"));
        env::remove_var("ORIGINCFG_CORS__ALLOWED_ORIGINS");

        let settings = settings.expect("Failed to load settings");
        assert_eq!(
            settings.cors.origins(),
            vec!["https://blog.example.com", "http://localhost:5173"]
        );
        assert!(Settings::new_for_test().unwrap().cors.origins().is_empty());
    }
}
