use super::{OwnedEntity, OwnedRepository, SqliteQueryAs};
use crate::models::{Task, TaskInput};

impl OwnedEntity for Task {
    type Fields = TaskInput;

    const NAME: &'static str = "Task";
    const TABLE: &'static str = "tasks";
    const ID_COLUMN: &'static str = "task_id";
    const COLUMNS: &'static str = "task_id, title, description, user_id, created_at, updated_at";
    const FIELD_COLUMNS: &'static [&'static str] = &["title", "description"];

    fn bind_fields<'q>(query: SqliteQueryAs<'q, Self>, fields: TaskInput) -> SqliteQueryAs<'q, Self> {
        query.bind(fields.title).bind(fields.description)
    }
}

pub type TaskRepository = OwnedRepository<Task>;
