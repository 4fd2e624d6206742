use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;

use crate::core::history::SearchHistory;
use crate::models::{FilterFragment, HistoryKind, RecordHistoryRequest, SearchHistoryEntry};

/// Errors that can occur when persisting search history
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Per-session search history storage
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Stored history for a session, newest first
    async fn load(&self, session_id: &str) -> Result<SearchHistory, HistoryError>;

    /// Record a free-text search
    async fn record_text(&self, session_id: &str, query: &str) -> Result<SearchHistory, HistoryError>;

    /// Record any kind of search from an API request
    async fn record(&self, session_id: &str, request: RecordHistoryRequest) -> Result<SearchHistory, HistoryError>;

    async fn health_check(&self) -> Result<bool, HistoryError>;
}

/// PostgreSQL-backed search history, one capped list per session
///
/// Every write loads, aggregates and rewrites the session's list inside a
/// single transaction, so concurrent requests for one session cannot lose
/// increments.
pub struct HistoryRepository {
    pool: PgPool,
}

impl HistoryRepository {
    /// Connect and run migrations
    pub async fn new(database_url: &str, max_connections: u32, min_connections: u32) -> Result<Self, HistoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self, HistoryError> {
        tracing::info!("Connecting to history database");
        Self::new(url, max_connections.unwrap_or(10), min_connections.unwrap_or(1)).await
    }

    /// Drop a session's history
    pub async fn clear(&self, session_id: &str) -> Result<u64, HistoryError> {
        let result = sqlx::query("DELETE FROM search_history WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        tracing::info!("Cleared {} history entries for session {}", result.rows_affected(), session_id);
        Ok(result.rows_affected())
    }

    async fn update<F>(&self, session_id: &str, apply: F) -> Result<SearchHistory, HistoryError>
    where
        F: FnOnce(&mut SearchHistory, DateTime<Utc>) + Send,
    {
        let mut tx = self.pool.begin().await?;
        let mut history = load_with(&mut tx, session_id, true).await?;
        apply(&mut history, Utc::now());
        write_with(&mut tx, session_id, &history).await?;
        tx.commit().await?;

        tracing::debug!("Session {} history now holds {} entries", session_id, history.len());
        Ok(history)
    }
}

#[async_trait]
impl HistoryStore for HistoryRepository {
    async fn load(&self, session_id: &str) -> Result<SearchHistory, HistoryError> {
        let mut conn = self.pool.acquire().await?;
        load_with(&mut conn, session_id, false).await
    }

    async fn record_text(&self, session_id: &str, query: &str) -> Result<SearchHistory, HistoryError> {
        self.update(session_id, |history, now| history.record(query, now))
            .await
    }

    async fn record(&self, session_id: &str, request: RecordHistoryRequest) -> Result<SearchHistory, HistoryError> {
        let kind = request.kind.unwrap_or(HistoryKind::Text);
        if kind != HistoryKind::Text && request.filters.is_none() {
            return Err(HistoryError::InvalidInput(format!(
                "{} entries need a filter fragment",
                kind.as_str()
            )));
        }

        self.update(session_id, move |history, now| {
            history.record_facet(kind, &request.query, request.filters.unwrap_or_default(), now)
        })
        .await
    }

    async fn health_check(&self) -> Result<bool, HistoryError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

async fn load_with(conn: &mut PgConnection, session_id: &str, lock: bool) -> Result<SearchHistory, HistoryError> {
    let query = if lock {
        r#"
            SELECT query, searched_at, count, kind, filters
            FROM search_history
            WHERE session_id = $1
            ORDER BY position
            FOR UPDATE
        "#
    } else {
        r#"
            SELECT query, searched_at, count, kind, filters
            FROM search_history
            WHERE session_id = $1
            ORDER BY position
        "#
    };

    let rows = sqlx::query(query).bind(session_id).fetch_all(&mut *conn).await?;

    let entries = rows
        .iter()
        .map(|row| {
            let kind: Option<String> = row.try_get("kind")?;
            let filters: Option<Json<FilterFragment>> = row.try_get("filters")?;
            let count: i32 = row.try_get("count")?;
            Ok(SearchHistoryEntry {
                query: row.try_get("query")?,
                searched_at: row.try_get("searched_at")?,
                count: count.max(0) as u32,
                kind: kind.as_deref().and_then(HistoryKind::parse),
                filters: filters.map(|f| f.0),
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

    Ok(SearchHistory::from_entries(entries))
}

async fn write_with(conn: &mut PgConnection, session_id: &str, history: &SearchHistory) -> Result<(), HistoryError> {
    sqlx::query("DELETE FROM search_history WHERE session_id = $1")
        .bind(session_id)
        .execute(&mut *conn)
        .await?;

    for (position, entry) in history.entries().iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO search_history (session_id, position, query, searched_at, count, kind, filters)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session_id)
        .bind(position as i32)
        .bind(&entry.query)
        .bind(entry.searched_at)
        .bind(entry.count.min(i32::MAX as u32) as i32)
        .bind(entry.kind.map(|k| k.as_str()))
        .bind(entry.filters.clone().map(Json))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
