use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::AppError;

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token: the user's email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Issue timestamp (seconds since epoch).
    #[serde(default)]
    pub iat: i64,
}

/// Why a token was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Bad signature, wrong algorithm or malformed payload.
    Invalid(String),
    /// `exp` is at or before the current time.
    Expired,
    /// The token is authentic but carries no subject.
    MissingSubject,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TokenError::Invalid(msg) => write!(f, "invalid token: {}", msg),
            TokenError::Expired => write!(f, "token expired"),
            TokenError::MissingSubject => write!(f, "token has no subject"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Issues and verifies signed, time-limited bearer tokens.
///
/// The secret and algorithm are fixed when the service is built; changing
/// either invalidates every outstanding token.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    default_ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], algorithm: Algorithm, default_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            default_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let ttl = Duration::try_minutes(config.token_expire_minutes).ok_or_else(|| {
            AppError::ConfigurationError("ACCESS_TOKEN_EXPIRE_MINUTES out of range".into())
        })?;
        Ok(Self::new(config.jwt_secret.as_bytes(), config.jwt_algorithm, ttl))
    }

    /// Signs a token for `subject` valid for `ttl`, or the configured lifetime when `None`.
    pub fn issue(&self, subject: &str, ttl: Option<Duration>) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl.unwrap_or(self.default_ttl))
            .ok_or_else(|| AppError::InternalServerError("token lifetime out of range".into()))?;

        let claims = Claims {
            sub: Some(subject.to_string()),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
    }

    /// Checks signature and expiry and returns the subject.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })?;

        // The library accepts exp == now.
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        match claims.sub {
            Some(subject) if !subject.is_empty() => Ok(subject),
            _ => Err(TokenError::MissingSubject),
        }
    }
}
