use crate::{
    auth::{AuthService, LoginRequest, RegisterRequest},
    error::AppError,
};
use actix_web::{post, routes, web, HttpResponse, Responder};
use validator::Validate;

/// Register a new user
///
/// Creates a new user account and returns a bearer token for it.
///
/// ## Responses:
/// - `201 Created`: `{access_token, token_type}`.
/// - `400 Bad Request`: malformed body or failed field rules.
/// - `409 Conflict`: the email is already registered.
#[routes]
#[post("/register")]
#[post("/")]
pub async fn register(
    auth: web::Data<AuthService>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    let token = auth.register(register_data.into_inner()).await?;

    Ok(HttpResponse::Created().json(token))
}

/// Login user
///
/// Authenticates a user and returns a bearer token.
///
/// ## Responses:
/// - `200 OK`: `{access_token, token_type}`.
/// - `400 Bad Request`: malformed body.
/// - `401 Unauthorized`: unknown email or wrong password.
#[post("/login")]
pub async fn login(
    auth: web::Data<AuthService>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let token = auth.login(login_data.into_inner()).await?;

    Ok(HttpResponse::Ok().json(token))
}
