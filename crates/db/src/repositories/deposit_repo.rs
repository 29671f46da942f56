//! Repository for the `deposits` table.

use depositor_core::types::Timestamp;
use sqlx::{PgConnection, PgPool};

use crate::models::deposit::{CreateDeposit, Deposit, UpdateDeposit};
use crate::models::log_event::{CreateLogEvent, LogEvent};
use crate::models::status::DepositStatus;
use crate::repositories::LogEventRepo;

/// Column list for deposits queries.
const COLUMNS: &str = "id, code, pid, collection_acronym, xml_file_name, doi, prefix, \
    submission_status, feedback_status, is_xml_valid, submission_xml, doi_batch_id, \
    started_at, updated_at, submission_updated_at, feedback_updated_at";

/// Provides replace, lookup and transition operations for deposits.
pub struct DepositRepo;

impl DepositRepo {
    /// Replace the deposit for `input.code` with a fresh `waiting` row.
    ///
    /// Delete and insert run in one transaction, so readers always see
    /// either the previous attempt or the new one.
    pub async fn replace(pool: &PgPool, input: &CreateDeposit) -> Result<Deposit, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM deposits WHERE code = $1")
            .bind(&input.code)
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO deposits
                (code, pid, collection_acronym, xml_file_name, doi, prefix,
                 submission_status, started_at, updated_at, submission_updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $8)
             RETURNING {COLUMNS}"
        );
        let deposit = sqlx::query_as::<_, Deposit>(&query)
            .bind(&input.code)
            .bind(&input.pid)
            .bind(&input.collection_acronym)
            .bind(&input.xml_file_name)
            .bind(&input.doi)
            .bind(&input.prefix)
            .bind(DepositStatus::Waiting.as_str())
            .bind(input.started_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deposit)
    }

    /// Find the live deposit for a code.
    pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Deposit>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM deposits WHERE code = $1");
        sqlx::query_as::<_, Deposit>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Apply a transition. Returns `None` if no deposit has this code.
    pub async fn update(
        pool: &PgPool,
        code: &str,
        input: &UpdateDeposit,
        at: Timestamp,
    ) -> Result<Option<Deposit>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::update_on(&mut conn, code, input, at).await
    }

    /// Apply a transition and append its event in one transaction.
    ///
    /// The event is written even when no deposit row matches, since events
    /// are tied to the code and not to a row.
    pub async fn transition(
        pool: &PgPool,
        code: &str,
        input: &UpdateDeposit,
        event: &CreateLogEvent,
    ) -> Result<(Option<Deposit>, LogEvent), sqlx::Error> {
        let mut tx = pool.begin().await?;
        let deposit = Self::update_on(&mut tx, code, input, event.date).await?;
        let event = LogEventRepo::insert(&mut tx, event).await?;
        tx.commit().await?;
        Ok((deposit, event))
    }

    /// `updated_at` only moves forward, whatever `at` says.
    async fn update_on(
        conn: &mut PgConnection,
        code: &str,
        input: &UpdateDeposit,
        at: Timestamp,
    ) -> Result<Option<Deposit>, sqlx::Error> {
        let query = format!(
            "UPDATE deposits SET
                submission_status = COALESCE($2, submission_status),
                submission_updated_at = CASE WHEN $2::TEXT IS NULL THEN submission_updated_at
                    ELSE GREATEST(submission_updated_at, $7) END,
                feedback_status = COALESCE($3, feedback_status),
                feedback_updated_at = CASE WHEN $3::TEXT IS NULL THEN feedback_updated_at
                    ELSE GREATEST(feedback_updated_at, $7) END,
                is_xml_valid = COALESCE($4, is_xml_valid),
                submission_xml = COALESCE($5, submission_xml),
                doi_batch_id = COALESCE($6, doi_batch_id),
                updated_at = GREATEST(updated_at, $7)
             WHERE code = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Deposit>(&query)
            .bind(code)
            .bind(input.submission_status.map(DepositStatus::as_str))
            .bind(input.feedback_status.map(DepositStatus::as_str))
            .bind(input.is_xml_valid)
            .bind(&input.submission_xml)
            .bind(&input.doi_batch_id)
            .bind(at)
            .fetch_optional(conn)
            .await
    }
}
