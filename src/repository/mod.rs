//! Data access for user-owned entities.
//!
//! [`OwnedRepository`] implements create/read/update/delete/list once for any
//! type implementing [`OwnedEntity`]. Each call runs in its own unit of work
//! (see [`Database::unit_of_work`]).
//!
//! Owned tables share two conventions: the owner column is `user_id` and the
//! list order key is `updated_at`.
//!
//! Point operations come in two flavours. `get_by_id`, `update` and `delete`
//! address a row by id alone. `get_owned`, `update_owned` and `delete_owned`
//! additionally require the row to belong to the given owner, and treat a row
//! owned by someone else exactly like a missing one. Request handlers only use
//! the owned flavour.

pub mod tasks;
pub mod users;

use std::marker::PhantomData;

use sqlx::query::QueryAs;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{FromRow, Sqlite};

use crate::db::{Database, Session, NOW};
use crate::error::{AppError, INVALID_REQUEST};

pub use tasks::TaskRepository;
pub use users::UserRepository;

const OWNER_COLUMN: &str = "user_id";

/// A `query_as` builder over SQLite returning rows of `E`.
pub type SqliteQueryAs<'q, E> = QueryAs<'q, Sqlite, E, SqliteArguments<'q>>;

/// Table metadata and field binding for an entity that belongs to a user.
pub trait OwnedEntity: for<'r> FromRow<'r, SqliteRow> + Send + Unpin + 'static {
    /// The caller-writable fields, used by both create and update.
    type Fields: Send + 'static;

    /// Human-readable name used in error messages.
    const NAME: &'static str;
    const TABLE: &'static str;
    const ID_COLUMN: &'static str;
    /// Select list matching the `FromRow` implementation.
    const COLUMNS: &'static str;
    /// Columns written from `Fields`, in the order `bind_fields` binds them.
    const FIELD_COLUMNS: &'static [&'static str];

    fn bind_fields<'q>(query: SqliteQueryAs<'q, Self>, fields: Self::Fields) -> SqliteQueryAs<'q, Self>;
}

/// One page of a listing plus the total number of matching rows.
#[derive(Debug)]
pub struct Page<E> {
    pub items: Vec<E>,
    pub total: i64,
}

/// Translates a unique-constraint violation into `AppError::Duplicate`.
pub(crate) fn duplicate_or(entity: &str, err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            log::info!("duplicate {} rejected", entity);
            AppError::Duplicate(format!("{} already exists", entity))
        }
        _ => err.into(),
    }
}

fn not_found<E: OwnedEntity>() -> AppError {
    AppError::NotFound(format!("{} with that id not found", E::NAME))
}

fn owner_clause(owner: Option<i64>) -> String {
    match owner {
        Some(_) => format!(" AND {} = ?", OWNER_COLUMN),
        None => String::new(),
    }
}

async fn count_rows<E: OwnedEntity>(
    session: &mut Session,
    owner: Option<i64>,
) -> Result<i64, AppError> {
    let sql = match owner {
        Some(_) => format!("SELECT COUNT(*) FROM {} WHERE {} = ?", E::TABLE, OWNER_COLUMN),
        None => format!("SELECT COUNT(*) FROM {}", E::TABLE),
    };
    let mut query = sqlx::query_as::<Sqlite, (i64,)>(&sql);
    if let Some(owner_id) = owner {
        query = query.bind(owner_id);
    }
    let (count,) = query.fetch_one(session.conn()).await?;
    Ok(count)
}

/// Generic CRUD over an [`OwnedEntity`].
pub struct OwnedRepository<E> {
    db: Database,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for OwnedRepository<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: OwnedEntity> OwnedRepository<E> {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    /// Inserts a row owned by `owner_id` and returns it with id and timestamps filled in.
    pub async fn create(&self, owner_id: i64, fields: E::Fields) -> Result<E, AppError> {
        self.db
            .unit_of_work(move |session| {
                Box::pin(async move {
                    let placeholders = vec!["?"; E::FIELD_COLUMNS.len() + 1].join(", ");
                    let sql = format!(
                        "INSERT INTO {} ({}, {}) VALUES ({}) RETURNING {}",
                        E::TABLE,
                        OWNER_COLUMN,
                        E::FIELD_COLUMNS.join(", "),
                        placeholders,
                        E::COLUMNS
                    );
                    let query = sqlx::query_as::<Sqlite, E>(&sql).bind(owner_id);
                    let row = E::bind_fields(query, fields)
                        .fetch_one(session.conn())
                        .await
                        .map_err(|err| duplicate_or(E::NAME, err))?;
                    Ok(row)
                })
            })
            .await
    }

    /// Point lookup. Absence is `Ok(None)`.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<E>, AppError> {
        self.find(id, None).await
    }

    /// Point lookup restricted to rows owned by `owner_id`.
    pub async fn get_owned(&self, owner_id: i64, id: i64) -> Result<Option<E>, AppError> {
        self.find(id, Some(owner_id)).await
    }

    /// Rows owned by `owner_id`, oldest update first, `limit` rows starting at
    /// `(page - 1) * limit`. `total` counts all rows of that owner.
    pub async fn list(&self, owner_id: i64, page: i64, limit: i64) -> Result<Page<E>, AppError> {
        if page < 1 || limit < 1 {
            return Err(AppError::ValidationError(INVALID_REQUEST.into()));
        }
        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| AppError::ValidationError(INVALID_REQUEST.into()))?;

        self.db
            .unit_of_work(move |session| {
                Box::pin(async move {
                    let sql = format!(
                        "SELECT {} FROM {} WHERE {} = ? ORDER BY updated_at ASC, {} ASC LIMIT ? OFFSET ?",
                        E::COLUMNS,
                        E::TABLE,
                        OWNER_COLUMN,
                        E::ID_COLUMN
                    );
                    let items = sqlx::query_as::<Sqlite, E>(&sql)
                        .bind(owner_id)
                        .bind(limit)
                        .bind(offset)
                        .fetch_all(session.conn())
                        .await?;
                    let total = count_rows::<E>(session, Some(owner_id)).await?;
                    Ok(Page { items, total })
                })
            })
            .await
    }

    /// Number of rows owned by `owner_id`.
    pub async fn count_owned(&self, owner_id: i64) -> Result<i64, AppError> {
        self.db
            .unit_of_work(move |session| Box::pin(count_rows::<E>(session, Some(owner_id))))
            .await
    }

    /// Number of rows in the whole table, regardless of owner.
    pub async fn count_all(&self) -> Result<i64, AppError> {
        self.db
            .unit_of_work(|session| Box::pin(count_rows::<E>(session, None)))
            .await
    }

    /// Overwrites the writable fields of row `id`. `NotFound` if there is no such row.
    pub async fn update(&self, id: i64, fields: E::Fields) -> Result<E, AppError> {
        self.modify(id, None, fields).await
    }

    /// Like [`update`](Self::update), but only for a row owned by `owner_id`.
    pub async fn update_owned(&self, owner_id: i64, id: i64, fields: E::Fields) -> Result<E, AppError> {
        self.modify(id, Some(owner_id), fields).await
    }

    /// Removes row `id`. `NotFound` if there is no such row.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.remove(id, None).await
    }

    /// Like [`delete`](Self::delete), but only for a row owned by `owner_id`.
    pub async fn delete_owned(&self, owner_id: i64, id: i64) -> Result<(), AppError> {
        self.remove(id, Some(owner_id)).await
    }

    async fn find(&self, id: i64, owner: Option<i64>) -> Result<Option<E>, AppError> {
        self.db
            .unit_of_work(move |session| {
                Box::pin(async move {
                    let sql = format!(
                        "SELECT {} FROM {} WHERE {} = ?{}",
                        E::COLUMNS,
                        E::TABLE,
                        E::ID_COLUMN,
                        owner_clause(owner)
                    );
                    let mut query = sqlx::query_as::<Sqlite, E>(&sql).bind(id);
                    if let Some(owner_id) = owner {
                        query = query.bind(owner_id);
                    }
                    let row = query.fetch_optional(session.conn()).await?;
                    Ok(row)
                })
            })
            .await
    }

    async fn modify(&self, id: i64, owner: Option<i64>, fields: E::Fields) -> Result<E, AppError> {
        self.db
            .unit_of_work(move |session| {
                Box::pin(async move {
                    let assignments = E::FIELD_COLUMNS
                        .iter()
                        .map(|column| format!("{} = ?", column))
                        .collect::<Vec<_>>()
                        .join(", ");
                    let sql = format!(
                        "UPDATE {} SET {}, updated_at = {} WHERE {} = ?{} RETURNING {}",
                        E::TABLE,
                        assignments,
                        NOW,
                        E::ID_COLUMN,
                        owner_clause(owner),
                        E::COLUMNS
                    );
                    let mut query = E::bind_fields(sqlx::query_as::<Sqlite, E>(&sql), fields).bind(id);
                    if let Some(owner_id) = owner {
                        query = query.bind(owner_id);
                    }
                    query
                        .fetch_optional(session.conn())
                        .await
                        .map_err(|err| duplicate_or(E::NAME, err))?
                        .ok_or_else(not_found::<E>)
                })
            })
            .await
    }

    async fn remove(&self, id: i64, owner: Option<i64>) -> Result<(), AppError> {
        self.db
            .unit_of_work(move |session| {
                Box::pin(async move {
                    let sql = format!(
                        "DELETE FROM {} WHERE {} = ?{}",
                        E::TABLE,
                        E::ID_COLUMN,
                        owner_clause(owner)
                    );
                    let mut query = sqlx::query::<Sqlite>(&sql).bind(id);
                    if let Some(owner_id) = owner {
                        query = query.bind(owner_id);
                    }
                    let result = query.execute(session.conn()).await?;
                    if result.rows_affected() == 0 {
                        return Err(not_found::<E>());
                    }
                    Ok(())
                })
            })
            .await
    }
}
