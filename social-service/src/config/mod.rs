use service_core::config::{self as core_config, get_env, get_env_parsed, get_optional_env};
use service_core::error::AppError;
use std::env;
use std::net::IpAddr;

pub const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com/v1";

#[derive(Debug, Clone)]
pub struct SocialConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub store: StoreBackend,
    pub mongodb: MongoConfig,
    pub jwt: JwtConfig,
    pub clerk: ClerkConfig,
    pub cloudinary: CloudinaryConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiry_days: i64,
}

/// Clerk is optional: without a PEM key session tokens are never accepted,
/// without a secret key `/sync` cannot reach the Backend API.
#[derive(Debug, Clone)]
pub struct ClerkConfig {
    pub secret_key: Option<String>,
    pub jwt_public_key: Option<String>,
    pub api_url: String,
    pub authorized_parties: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
/// `trusted_proxies` are the peers whose `x-forwarded-for` header is believed.
pub struct RateLimitConfig {
    pub requests: u32,
    pub window_seconds: u64,
    pub trusted_proxies: Vec<IpAddr>,
}

impl SocialConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let environment: Environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "dev".to_string())
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let is_prod = environment == Environment::Prod;

        let store: StoreBackend = get_env("STORE_BACKEND", Some("mongo"), false)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let needs_mongo = store == StoreBackend::Mongo;

        let cloud_name = get_optional_env("CLOUDINARY_CLOUD_NAME").unwrap_or_default();
        let api_key = get_optional_env("CLOUDINARY_API_KEY").unwrap_or_default();
        let api_secret = get_optional_env("CLOUDINARY_API_SECRET").unwrap_or_default();
        let cloudinary_enabled =
            !cloud_name.is_empty() && !api_key.is_empty() && !api_secret.is_empty();

        let config = SocialConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("social-service"), false)?,
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
            store,
            mongodb: MongoConfig {
                uri: get_env(
                    "MONGODB_URI",
                    Some("mongodb://localhost:27017"),
                    is_prod && needs_mongo,
                )?,
                database: get_env("MONGODB_DATABASE", Some("social_db"), false)?,
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET", None, is_prod)?,
                expiry_days: get_env_parsed("JWT_EXPIRY_DAYS", 7)?,
            },
            clerk: ClerkConfig {
                secret_key: get_optional_env("CLERK_SECRET_KEY"),
                jwt_public_key: get_optional_env("CLERK_JWT_KEY").map(|k| k.replace("\\n", "\n")),
                api_url: get_env("CLERK_API_URL", Some(DEFAULT_CLERK_API_URL), false)?,
                authorized_parties: split_list(
                    &get_optional_env("CLERK_AUTHORIZED_PARTIES").unwrap_or_default(),
                ),
            },
            cloudinary: CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
                folder: get_env("CLOUDINARY_FOLDER", Some("social"), false)?,
                enabled: cloudinary_enabled,
            },
            security: SecurityConfig {
                allowed_origins: split_list(&get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?),
            },
            rate_limit: RateLimitConfig {
                requests: get_env_parsed("RATE_LIMIT_REQUESTS", 100)?,
                window_seconds: get_env_parsed("RATE_LIMIT_WINDOW_SECONDS", 60)?,
                trusted_proxies: parse_ips(
                    &get_optional_env("TRUSTED_PROXIES").unwrap_or_default(),
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.jwt.secret.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_SECRET must not be empty"
            )));
        }

        if self.jwt.expiry_days <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_EXPIRY_DAYS must be positive"
            )));
        }

        if self.rate_limit.requests == 0 || self.rate_limit.window_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RATE_LIMIT_REQUESTS and RATE_LIMIT_WINDOW_SECONDS must be positive"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.store == StoreBackend::Memory {
                tracing::warn!("In-memory store selected in production; data will not persist");
            }
        }

        Ok(())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_ips(raw: &str) -> Result<Vec<IpAddr>, AppError> {
    split_list(raw)
        .iter()
        .map(|ip| {
            ip.parse::<IpAddr>().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "TRUSTED_PROXIES has an invalid address '{}': {}",
                    ip,
                    e
                ))
            })
        })
        .collect()
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}
