//! Log event model.

use depositor_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `log_events` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LogEvent {
    pub id: DbId,
    pub deposit_code: String,
    pub title: String,
    pub body: Option<String>,
    pub event_type: String,
    pub status: String,
    pub date: Timestamp,
}

/// DTO for appending an event.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLogEvent {
    pub deposit_code: String,
    pub title: String,
    pub body: Option<String>,
    pub event_type: super::status::LogEventType,
    pub status: super::status::LogEventStatus,
    pub date: Timestamp,
}
