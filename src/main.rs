use std::io;

use actix_cors::Cors;
use actix_web::middleware::{Logger, NormalizePath};
use actix_web::{web, App, HttpServer};

use tasklist::auth::{AuthService, CredentialHasher, TokenService};
use tasklist::config::Config;
use tasklist::db::{Database, DatabaseConfig};
use tasklist::repository::{TaskRepository, UserRepository};
use tasklist::{routes, AppError};

fn startup_error(err: AppError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(startup_error)?;

    let db = Database::connect(&DatabaseConfig {
        url: config.database_url.clone(),
        max_connections: config.database_max_connections,
        ..DatabaseConfig::default()
    })
    .await
    .map_err(startup_error)?;
    db.init_schema().await.map_err(startup_error)?;

    let auth = web::Data::new(AuthService::new(
        UserRepository::new(db.clone()),
        TokenService::from_config(&config).map_err(startup_error)?,
        CredentialHasher::new(config.bcrypt_cost),
    ));
    let tasks = web::Data::new(TaskRepository::new(db.clone()));
    let db_data = web::Data::new(db.clone());

    log::info!("Starting server at {}", config.server_url());
    HttpServer::new(move || {
        App::new()
            .app_data(db_data.clone())
            .app_data(auth.clone())
            .app_data(tasks.clone())
            .wrap(NormalizePath::trim())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await?;

    db.close().await;
    Ok(())
}
