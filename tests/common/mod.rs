#![allow(dead_code)]

use actix_web::dev::{Service, ServiceResponse};
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{body::MessageBody, test, web, App};
use jsonwebtoken::Algorithm;
use serde_json::{json, Value};

use tasklist::auth::{AuthService, CredentialHasher, TokenService};
use tasklist::db::{Database, DatabaseConfig};
use tasklist::repository::{TaskRepository, UserRepository};
use tasklist::routes;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Shared state behind one test application, backed by a private in-memory database.
#[derive(Clone)]
pub struct TestState {
    pub db: Database,
    pub auth: AuthService,
    pub tasks: TaskRepository,
}

pub async fn test_state() -> TestState {
    let db = Database::connect(&DatabaseConfig::in_memory())
        .await
        .expect("Failed to open in-memory database");
    db.init_schema().await.expect("Failed to create schema");

    let auth = AuthService::new(
        UserRepository::new(db.clone()),
        TokenService::new(
            TEST_SECRET.as_bytes(),
            Algorithm::HS256,
            chrono::Duration::minutes(30),
        ),
        CredentialHasher::new(4),
    );
    let tasks = TaskRepository::new(db.clone());

    TestState { db, auth, tasks }
}

/// Registers the application data and routes the same way `main` does.
pub fn configure(state: &TestState) -> impl FnOnce(&mut web::ServiceConfig) {
    let db = web::Data::new(state.db.clone());
    let auth = web::Data::new(state.auth.clone());
    let tasks = web::Data::new(state.tasks.clone());

    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(db)
            .app_data(auth)
            .app_data(tasks)
            .configure(routes::config);
    }
}

pub async fn init_app(
    state: &TestState,
) -> impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
{
    test::init_service(
        App::new()
            .wrap(NormalizePath::trim())
            .wrap(Logger::default())
            .configure(configure(state)),
    )
    .await
}

/// Registers a user over HTTP and returns the issued access token.
pub async fn register_user(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    name: &str,
    email: &str,
    password: &str,
) -> Result<String, String> {
    let req = test::TestRequest::post()
        .uri("/register")
        .set_json(json!({ "name": name, "email": email, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;

    if !status.is_success() {
        return Err(format!(
            "Failed to register user. Status: {}. Body: {}",
            status,
            String::from_utf8_lossy(&body)
        ));
    }

    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| format!("Failed to parse registration response: {}", e))?;
    value["access_token"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| "registration response has no access_token".to_string())
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
