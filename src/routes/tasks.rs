use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{ListQuery, TaskInput, TaskList},
    repository::TaskRepository,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use validator::Validate;

fn task_not_found() -> AppError {
    AppError::NotFound("Task with that id not found".into())
}

/// Lists the authenticated user's tasks, one page at a time.
///
/// Tasks are ordered by last update, oldest first.
///
/// ## Query Parameters:
/// - `page` (optional, default 1): 1-based page number.
/// - `limit` (optional, default 10): page size.
///
/// ## Responses:
/// - `200 OK`: `{data, page, limit, total}` where `total` counts all of the user's tasks.
/// - `400 Bad Request`: `page` or `limit` below 1 or not a number.
/// - `401 Unauthorized`: missing or invalid token.
#[get("")]
pub async fn list_tasks(
    tasks: web::Data<TaskRepository>,
    user: CurrentUser,
    query: web::Query<ListQuery>,
) -> Result<impl Responder, AppError> {
    query.validate()?;
    let ListQuery { page, limit } = query.into_inner();

    let result = tasks.list(user.id(), page, limit).await?;

    Ok(HttpResponse::Ok().json(TaskList {
        data: result.items,
        page,
        limit,
        total: result.total,
    }))
}

/// Creates a new task owned by the authenticated user.
///
/// ## Responses:
/// - `201 Created`: the new task.
/// - `400 Bad Request`: malformed body or failed field rules.
/// - `401 Unauthorized`: missing or invalid token.
#[post("")]
pub async fn create_task(
    tasks: web::Data<TaskRepository>,
    user: CurrentUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = tasks.create(user.id(), task_data.into_inner()).await?;

    Ok(HttpResponse::Created().json(task))
}

/// Retrieves one of the authenticated user's tasks.
///
/// ## Responses:
/// - `200 OK`: the task.
/// - `401 Unauthorized`: missing or invalid token.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[get("/{id}")]
pub async fn get_task(
    tasks: web::Data<TaskRepository>,
    user: CurrentUser,
    task_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let task = tasks
        .get_owned(user.id(), task_id.into_inner())
        .await?
        .ok_or_else(task_not_found)?;

    Ok(HttpResponse::Ok().json(task))
}

/// Replaces the title and description of one of the authenticated user's tasks.
///
/// ## Responses:
/// - `200 OK`: the updated task.
/// - `400 Bad Request`: malformed body or failed field rules.
/// - `401 Unauthorized`: missing or invalid token.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[put("/{id}")]
pub async fn update_task(
    tasks: web::Data<TaskRepository>,
    user: CurrentUser,
    task_id: web::Path<i64>,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = tasks
        .update_owned(user.id(), task_id.into_inner(), task_data.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(task))
}

/// Deletes one of the authenticated user's tasks.
///
/// ## Responses:
/// - `204 No Content`: deleted.
/// - `401 Unauthorized`: missing or invalid token.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[delete("/{id}")]
pub async fn delete_task(
    tasks: web::Data<TaskRepository>,
    user: CurrentUser,
    task_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    tasks.delete_owned(user.id(), task_id.into_inner()).await?;

    Ok(HttpResponse::NoContent().finish())
}
