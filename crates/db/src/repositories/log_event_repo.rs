//! Repository for the `log_events` table.

use sqlx::{PgConnection, PgPool};

use crate::models::log_event::{CreateLogEvent, LogEvent};

/// Column list for log_events queries.
const COLUMNS: &str = "id, deposit_code, title, body, event_type, status, date";

/// Appends and lists deposit log events. Events are never updated.
pub struct LogEventRepo;

impl LogEventRepo {
    /// Append an event, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateLogEvent) -> Result<LogEvent, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::insert(&mut conn, input).await
    }

    /// Append an event on an open connection or transaction.
    pub(crate) async fn insert(
        conn: &mut PgConnection,
        input: &CreateLogEvent,
    ) -> Result<LogEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO log_events (deposit_code, title, body, event_type, status, date)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LogEvent>(&query)
            .bind(&input.deposit_code)
            .bind(&input.title)
            .bind(&input.body)
            .bind(input.event_type.as_str())
            .bind(input.status.as_str())
            .bind(input.date)
            .fetch_one(conn)
            .await
    }

    /// List every event recorded for a deposit code, oldest first.
    ///
    /// Includes events from earlier attempts of the same code.
    pub async fn list_by_deposit(
        pool: &PgPool,
        deposit_code: &str,
    ) -> Result<Vec<LogEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM log_events
             WHERE deposit_code = $1
             ORDER BY date ASC, id ASC"
        );
        sqlx::query_as::<_, LogEvent>(&query)
            .bind(deposit_code)
            .fetch_all(pool)
            .await
    }
}
