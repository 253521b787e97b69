#![doc = "The `tasklist` library crate."]
#![doc = ""]
#![doc = "A task/todo-list backend: registration, password login issuing a bearer token,"]
#![doc = "and per-user CRUD over tasks stored in SQLite. The binary (`main.rs`) wires"]
#![doc = "these modules into an actix-web server."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod repository;
pub mod routes;

pub use crate::error::AppError;
