use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use crate::db::Database;

/// Health check endpoint
///
/// Reports whether the database answers, plus the current server time.
/// Always responds `200 OK` so load balancers can tell "up but degraded" apart.
#[get("/health")]
pub async fn health(db: web::Data<Database>) -> impl Responder {
    let database = match db.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            log::warn!("health check: database unavailable: {}", e);
            "unavailable"
        }
    };

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "database": database,
        "timestamp": Utc::now()
    }))
}
