use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::NOT_BLANK;

/// Input structure for creating or updating a task.
/// Contains validation rules for its fields.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// The title of the task.
    /// Must be between 1 and 200 characters and not only whitespace.
    #[validate(
        length(min = 1, max = 200),
        regex(path = "NOT_BLANK")
    )]
    pub title: String,

    /// The description of the task. May be empty, at most 1000 characters.
    #[validate(length(max = 1000))]
    pub description: String,
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Auto-incremented identifier.
    pub task_id: i64,
    pub title: String,
    pub description: String,
    /// Identifier of the user who owns the task.
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every update; the list order key.
    pub updated_at: DateTime<Utc>,
}

/// Query parameters for `GET /todos`.
#[derive(Debug, Deserialize, Validate)]
pub struct ListQuery {
    /// 1-based page number.
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: i64,
    /// Page size.
    #[serde(default = "default_limit")]
    #[validate(range(min = 1))]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

/// Response body for `GET /todos`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskList {
    pub data: Vec<Task>,
    pub page: i64,
    pub limit: i64,
    /// Number of tasks the caller owns, across all pages.
    pub total: i64,
}
