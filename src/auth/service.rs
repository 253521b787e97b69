//! Registration, login and bearer-token resolution.

use actix_web::web;

use super::{CredentialHasher, LoginRequest, RegisterRequest, TokenResponse, TokenService};
use crate::error::{AppError, CREDENTIALS_ERROR};
use crate::models::{NewUser, User};
use crate::repository::UserRepository;

/// Ties the credential hasher, the token service and the user store together.
#[derive(Debug, Clone)]
pub struct AuthService {
    users: UserRepository,
    tokens: TokenService,
    hasher: CredentialHasher,
}

impl AuthService {
    pub fn new(users: UserRepository, tokens: TokenService, hasher: CredentialHasher) -> Self {
        Self {
            users,
            tokens,
            hasher,
        }
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Creates the account and returns a token for it.
    ///
    /// Fails with `AppError::Duplicate` when the email is taken.
    pub async fn register(&self, request: RegisterRequest) -> Result<TokenResponse, AppError> {
        let hasher = self.hasher;
        let password = request.password;
        let password_hash = web::block(move || hasher.hash(&password)).await??;
        let user = self
            .users
            .create(NewUser {
                name: request.name,
                email: request.email,
                password_hash,
            })
            .await?;

        log::info!("registered user {}", user.user_id);
        let token = self.tokens.issue(&user.email, None)?;
        Ok(TokenResponse::bearer(token))
    }

    /// Exchanges an email and password for a token.
    ///
    /// Unknown email and wrong password produce the same `Unauthorized` error.
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, AppError> {
        let user = self
            .authenticate(&request.email, &request.password)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

        let token = self.tokens.issue(&user.email, None)?;
        Ok(TokenResponse::bearer(token))
    }

    /// The user with this email, if the password matches.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>, AppError> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                log::debug!("login attempt for unknown email");
                return Ok(None);
            }
        };

        let hasher = self.hasher;
        let password = password.to_owned();
        let digest = user.password_hash.clone();
        let matches = web::block(move || hasher.verify(&password, &digest)).await?;

        if !matches {
            log::debug!("wrong password for user {}", user.user_id);
            return Ok(None);
        }
        Ok(Some(user))
    }

    /// Resolves a bearer token to its user.
    ///
    /// Any token failure, and a valid token whose user no longer exists, all
    /// yield the same `Unauthorized` error.
    pub async fn current_user(&self, token: &str) -> Result<User, AppError> {
        let email = self.tokens.verify(token)?;

        match self.users.find_by_email(&email).await? {
            Some(user) => Ok(user),
            None => {
                log::debug!("token subject has no matching user");
                Err(AppError::Unauthorized(CREDENTIALS_ERROR.into()))
            }
        }
    }
}
