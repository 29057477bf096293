//! Persistence for email records.
//!
//! Route handlers talk to [`EmailStore`], which wraps any [`EmailRepository`].
//! Production uses [`PgEmailRepository`]; tests can swap in the in-memory
//! repository from `test_support`.

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::db::{ConnectionCache, ConnectionError, ConnectionState, PgConnector};
use crate::models::{EmailRecord, EmailRow, MalformedRow, NewEmailRecord, Vocabulary};
use crate::schema::{EmailRecordInput, FieldIssue, ValidationError};

/// Hard cap on records returned by the recent-records query.
pub const RECENT_LIMIT: i64 = 100;

/// A read or write failed after a connection was obtained.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("malformed stored record: {0}")]
    Malformed(#[from] MalformedRow),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Query(QueryError::Database(err))
    }
}

/// Storage operations needed by the HTTP surface.
#[rocket::async_trait]
pub trait EmailRepository: Send + Sync {
    /// Make sure the backing store is reachable.
    async fn ready(&self) -> Result<(), StoreError>;

    async fn insert(&self, record: NewEmailRecord) -> Result<EmailRecord, StoreError>;

    /// Newest records first, at most `limit` of them.
    async fn recent(&self, limit: i64) -> Result<Vec<EmailRecord>, StoreError>;

    fn connection_state(&self) -> ConnectionState;

    async fn close(&self) {}
}

/// Application-facing entry point shared through Rocket managed state.
#[derive(Clone)]
pub struct EmailStore {
    repository: Arc<dyn EmailRepository>,
}

impl EmailStore {
    pub fn new(repository: Arc<dyn EmailRepository>) -> Self {
        Self { repository }
    }

    pub fn postgres(config: DatabaseConfig) -> Self {
        Self::new(Arc::new(PgEmailRepository::new(config)))
    }

    /// Connect, validate and persist one submitted record.
    pub async fn save(&self, input: EmailRecordInput) -> Result<EmailRecord, StoreError> {
        self.repository.ready().await?;
        let record = input.validate()?;
        let saved = self.repository.insert(record).await?;
        log::info!(
            "saved email record {} ({} / {})",
            saved.id,
            saved.priority,
            saved.category
        );
        Ok(saved)
    }

    /// The most recent records, capped at [`RECENT_LIMIT`].
    pub async fn recent(&self) -> Result<Vec<EmailRecord>, StoreError> {
        self.repository.ready().await?;
        self.repository.recent(RECENT_LIMIT).await
    }

    pub async fn warm_up(&self) -> Result<(), StoreError> {
        self.repository.ready().await
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.repository.connection_state()
    }

    pub async fn close(&self) {
        self.repository.close().await;
    }
}

const SELECT_COLUMNS: &str = r#"
    id, subject, sender, summary, priority, action_required, category, sentiment,
    deadline, is_meeting, important_entities, suggested_action, created_at, updated_at
"#;

/// Postgres-backed repository that connects on first use.
pub struct PgEmailRepository {
    connection: ConnectionCache<PgConnector>,
}

impl PgEmailRepository {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            connection: ConnectionCache::new(PgConnector::new(config)),
        }
    }

    async fn pool(&self) -> Result<PgPool, StoreError> {
        Ok(self.connection.acquire().await?)
    }
}

/// SQLSTATE for `check_violation`.
const CHECK_VIOLATION: &str = "23514";

fn map_insert_error(err: sqlx::Error) -> StoreError {
    let constraint = match &err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(CHECK_VIOLATION) => {
            db_err.constraint().map(str::to_string)
        }
        _ => None,
    };

    match constraint.as_deref() {
        Some("email_records_subject_check") => {
            ValidationError::single(FieldIssue::Missing { field: "subject" }).into()
        }
        Some("email_records_sender_check") => {
            ValidationError::single(FieldIssue::Missing { field: "from" }).into()
        }
        Some(other) => {
            log::warn!("insert violated constraint {}", other);
            err.into()
        }
        None => err.into(),
    }
}

#[rocket::async_trait]
impl EmailRepository for PgEmailRepository {
    async fn ready(&self) -> Result<(), StoreError> {
        self.pool().await.map(|_| ())
    }

    async fn insert(&self, record: NewEmailRecord) -> Result<EmailRecord, StoreError> {
        let pool = self.pool().await?;

        let sql = format!(
            r#"
            INSERT INTO email_records (
                subject, sender, summary, priority, action_required, category, sentiment,
                deadline, is_meeting, important_entities, suggested_action
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {SELECT_COLUMNS}
            "#
        );

        let row: EmailRow = sqlx::query_as(&sql)
            .bind(&record.subject)
            .bind(&record.from)
            .bind(&record.summary)
            .bind(record.priority.as_str())
            .bind(record.action_required.as_str())
            .bind(record.category.as_str())
            .bind(record.sentiment.as_str())
            .bind(&record.deadline)
            .bind(record.is_meeting.as_str())
            .bind(&record.important_entities)
            .bind(&record.suggested_action)
            .fetch_one(&pool)
            .await
            .map_err(map_insert_error)?;

        Ok(EmailRecord::try_from(row).map_err(QueryError::from)?)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<EmailRecord>, StoreError> {
        let pool = self.pool().await?;

        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM email_records
            ORDER BY created_at DESC, seq DESC
            LIMIT $1
            "#
        );

        let rows: Vec<EmailRow> = sqlx::query_as(&sql)
            .bind(limit.clamp(0, RECENT_LIMIT))
            .fetch_all(&pool)
            .await?;

        let records = rows
            .into_iter()
            .map(EmailRecord::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(QueryError::from)?;

        Ok(records)
    }

    fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    async fn close(&self) {
        if let Some(pool) = self.connection.connected() {
            log::info!("closing database pool for {}", self.connection.target());
            pool.close().await;
        }
    }
}
