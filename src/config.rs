use serde::Deserialize;
use thiserror::Error;

const DEFAULT_ORIGINS: &str = "http://localhost:3000,http://localhost:3001";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub environment: String,
    pub frontend_urls: Vec<String>,
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub admin: Option<AdminAccount>,
}

/// Account created on startup when `ADMIN_USERNAME` and `ADMIN_PASSWORD` are set.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub username: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::InvalidFormat(err.to_string())
    }
}

// Raw values as read from the environment; keys are the lowercased variable names.
#[derive(Debug, Deserialize)]
struct RawConfig {
    database_url: Option<String>,
    jwt_secret: Option<String>,
    environment: String,
    server_port: String,
    token_ttl_hours: String,
    cors_allowed_origins: String,
    upload_dir: String,
    max_upload_bytes: String,
    admin_username: Option<String>,
    admin_password: Option<String>,
    admin_name: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let settings = config::Config::builder()
            .set_default("environment", "development")?
            .set_default("server_port", "8080")?
            .set_default("token_ttl_hours", "24")?
            .set_default("cors_allowed_origins", DEFAULT_ORIGINS)?
            .set_default("upload_dir", "uploads")?
            .set_default("max_upload_bytes", (10 * 1024 * 1024).to_string())?
            .add_source(config::Environment::default().try_parsing(false))
            .build()?;

        Self::from_raw(settings.try_deserialize()?)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let jwt_secret = raw
            .jwt_secret
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVariable("JWT_SECRET".to_string()))?;

        let port = raw.server_port.trim().parse::<u16>().map_err(|_| {
            ConfigError::InvalidFormat("SERVER_PORT must be a valid port number".to_string())
        })?;

        let token_ttl_hours = raw
            .token_ttl_hours
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|h| *h > 0)
            .ok_or_else(|| {
                ConfigError::InvalidFormat("TOKEN_TTL_HOURS must be a positive number".to_string())
            })?;

        let max_upload_bytes = raw.max_upload_bytes.trim().parse::<usize>().map_err(|_| {
            ConfigError::InvalidFormat("MAX_UPLOAD_BYTES must be a number of bytes".to_string())
        })?;

        // Parse allowed origins
        let frontend_urls = raw
            .cors_allowed_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let admin = match (raw.admin_username, raw.admin_password) {
            (Some(username), Some(password)) if !username.trim().is_empty() => {
                Some(AdminAccount {
                    name: raw.admin_name.unwrap_or_else(|| username.clone()),
                    username,
                    password,
                })
            }
            (Some(_), None) => {
                return Err(ConfigError::MissingVariable("ADMIN_PASSWORD".to_string()));
            }
            _ => None,
        };

        Ok(AppConfig {
            database_url: raw.database_url.filter(|s| !s.trim().is_empty()),
            jwt_secret,
            token_ttl_hours,
            environment: raw.environment,
            port,
            frontend_urls,
            upload_dir: raw.upload_dir,
            max_upload_bytes,
            admin,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Configuration used by tests: in-memory storage and a fixed secret.
    pub fn for_tests(upload_dir: &str) -> Self {
        AppConfig {
            database_url: None,
            port: 0,
            jwt_secret: "test-secret".to_string(),
            token_ttl_hours: 1,
            environment: "test".to_string(),
            frontend_urls: Vec::new(),
            upload_dir: upload_dir.to_string(),
            max_upload_bytes: 1024 * 1024,
            admin: None,
        }
    }
}
