pub mod auth;
pub mod health;
pub mod tasks;

use actix_web::{web, HttpRequest};

use crate::auth::AuthMiddleware;
use crate::error::{AppError, INVALID_REQUEST};

/// Registers every route plus the extractor settings that turn malformed
/// bodies, queries and paths into a plain `400`.
///
/// The application must also provide `web::Data` for `Database`,
/// `AuthService` and `TaskRepository`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, req| rejected("body", err.to_string(), req)),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, req| rejected("query", err.to_string(), req)),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, req| rejected("path", err.to_string(), req)),
    )
    .service(health::health)
    .service(auth::register)
    .service(auth::login)
    .service(
        web::scope("/todos")
            .wrap(AuthMiddleware)
            .service(tasks::list_tasks)
            .service(tasks::create_task)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task),
    );
}

fn rejected(part: &str, detail: String, req: &HttpRequest) -> actix_web::Error {
    log::debug!("malformed request {} for {}: {}", part, req.path(), detail);
    AppError::ValidationError(INVALID_REQUEST.into()).into()
}
