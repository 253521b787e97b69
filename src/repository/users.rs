use sqlx::Sqlite;

use super::duplicate_or;
use crate::db::Database;
use crate::error::AppError;
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "user_id, name, email, password_hash, created_at, updated_at";

/// Access to the `users` table.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts a user. A taken email yields `AppError::Duplicate` and leaves no row behind.
    pub async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        self.db
            .unit_of_work(move |session| {
                Box::pin(async move {
                    let sql = format!(
                        "INSERT INTO users (name, email, password_hash) VALUES (?, ?, ?) RETURNING {}",
                        USER_COLUMNS
                    );
                    let user = sqlx::query_as::<Sqlite, User>(&sql)
                        .bind(new_user.name)
                        .bind(new_user.email)
                        .bind(new_user.password_hash)
                        .fetch_one(session.conn())
                        .await
                        .map_err(|err| duplicate_or("User with that email", err))?;
                    Ok(user)
                })
            })
            .await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_owned();
        self.db
            .unit_of_work(move |session| {
                Box::pin(async move {
                    let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
                    let user = sqlx::query_as::<Sqlite, User>(&sql)
                        .bind(email)
                        .fetch_optional(session.conn())
                        .await?;
                    Ok(user)
                })
            })
            .await
    }

    pub async fn get_by_id(&self, user_id: i64) -> Result<Option<User>, AppError> {
        self.db
            .unit_of_work(move |session| {
                Box::pin(async move {
                    let sql = format!("SELECT {} FROM users WHERE user_id = ?", USER_COLUMNS);
                    let user = sqlx::query_as::<Sqlite, User>(&sql)
                        .bind(user_id)
                        .fetch_optional(session.conn())
                        .await?;
                    Ok(user)
                })
            })
            .await
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        self.db
            .unit_of_work(|session| {
                Box::pin(async move {
                    let (count,) = sqlx::query_as::<Sqlite, (i64,)>("SELECT COUNT(*) FROM users")
                        .fetch_one(session.conn())
                        .await?;
                    Ok(count)
                })
            })
            .await
    }

    /// Deletes a user together with all of their tasks, in one unit of work.
    ///
    /// The tasks are removed explicitly so the no-orphans rule does not depend
    /// on the storage engine honouring `ON DELETE CASCADE`.
    pub async fn delete(&self, user_id: i64) -> Result<(), AppError> {
        self.db
            .unit_of_work(move |session| {
                Box::pin(async move {
                    let tasks = sqlx::query::<Sqlite>("DELETE FROM tasks WHERE user_id = ?")
                        .bind(user_id)
                        .execute(session.conn())
                        .await?;

                    let users = sqlx::query::<Sqlite>("DELETE FROM users WHERE user_id = ?")
                        .bind(user_id)
                        .execute(session.conn())
                        .await?;

                    if users.rows_affected() == 0 {
                        return Err(AppError::NotFound("User with that id not found".into()));
                    }
                    log::info!(
                        "deleted user {} and {} task(s)",
                        user_id,
                        tasks.rows_affected()
                    );
                    Ok(())
                })
            })
            .await
    }
}
