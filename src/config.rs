use std::env;
use std::str::FromStr;

use jsonwebtoken::Algorithm;

use crate::db::DatabaseConfig;
use crate::error::AppError;

/// One year.
pub const MAX_TOKEN_EXPIRE_MINUTES: i64 = 60 * 24 * 365;

const DEV_JWT_SECRET: &str = "dev-only-secret-change-me-dev-only-secret";

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub token_expire_minutes: i64,
    pub bcrypt_cost: u32,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Unset keys fall back to their defaults; set but unparsable values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = match lookup("JWT_SECRET_KEY") {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                log::warn!("JWT_SECRET_KEY not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let algorithm_name = lookup("JWT_ALGORITHM").unwrap_or_else(|| "HS256".to_string());
        let jwt_algorithm = parse_hmac_algorithm(&algorithm_name)?;

        let bcrypt_cost = parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(AppError::ConfigurationError(
                "BCRYPT_COST must be between 4 and 31".into(),
            ));
        }

        let token_expire_minutes = parse_or(&lookup, "ACCESS_TOKEN_EXPIRE_MINUTES", 60)?;
        if !(1..=MAX_TOKEN_EXPIRE_MINUTES).contains(&token_expire_minutes) {
            return Err(AppError::ConfigurationError(format!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be between 1 and {}",
                MAX_TOKEN_EXPIRE_MINUTES
            )));
        }

        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://tasks.db".to_string()),
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            ..DatabaseConfig::default()
        };
        database.validate()?;

        Ok(Self {
            database_url: database.url,
            database_max_connections: database.max_connections,
            server_port: parse_or(&lookup, "SERVER_PORT", 8080)?,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt_secret,
            jwt_algorithm,
            token_expire_minutes,
            bcrypt_cost,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::ConfigurationError(format!("{} must be a number", key))),
        None => Ok(default),
    }
}

/// Only the HMAC family is accepted since tokens are signed with a shared secret.
fn parse_hmac_algorithm(name: &str) -> Result<Algorithm, AppError> {
    match Algorithm::from_str(name.trim()) {
        Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(alg),
        _ => Err(AppError::ConfigurationError(format!(
            "JWT_ALGORITHM must be one of HS256, HS384, HS512 (got {})",
            name
        ))),
    }
}
