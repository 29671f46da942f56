//! Persistence seam for the pipeline.
//!
//! [`PgDepositStore`] writes through the `depositor-db` repositories;
//! [`MemoryStore`] keeps the same semantics in process for dry runs and
//! tests.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use depositor_db::models::deposit::{CreateDeposit, Deposit, UpdateDeposit};
use depositor_db::models::log_event::{CreateLogEvent, LogEvent};
use depositor_db::models::status::DepositStatus;
use depositor_db::repositories::{DepositRepo, LogEventRepo};
use depositor_db::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The row was removed between replace and transition.
    #[error("No deposit recorded for {0}")]
    MissingDeposit(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Storage for deposits and their event log.
///
/// Each method is one commit.
pub trait DepositStore: Send + Sync {
    /// Atomically replace any deposit with `input.code` by a fresh one.
    fn replace(
        &self,
        input: &CreateDeposit,
    ) -> impl Future<Output = Result<Deposit, StoreError>> + Send;

    /// Update a deposit and append the event describing the change.
    fn transition(
        &self,
        code: &str,
        update: &UpdateDeposit,
        event: &CreateLogEvent,
    ) -> impl Future<Output = Result<Deposit, StoreError>> + Send;

    /// Append an event without touching the deposit.
    fn log(&self, event: &CreateLogEvent) -> impl Future<Output = Result<LogEvent, StoreError>> + Send;

    fn find(&self, code: &str) -> impl Future<Output = Result<Option<Deposit>, StoreError>> + Send;

    /// Events for a code in chronological order, across all attempts.
    fn events(&self, code: &str) -> impl Future<Output = Result<Vec<LogEvent>, StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgDepositStore {
    pool: DbPool,
}

impl PgDepositStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl DepositStore for PgDepositStore {
    async fn replace(&self, input: &CreateDeposit) -> Result<Deposit, StoreError> {
        Ok(DepositRepo::replace(&self.pool, input).await?)
    }

    async fn transition(
        &self,
        code: &str,
        update: &UpdateDeposit,
        event: &CreateLogEvent,
    ) -> Result<Deposit, StoreError> {
        let (deposit, _) = DepositRepo::transition(&self.pool, code, update, event).await?;
        deposit.ok_or_else(|| StoreError::MissingDeposit(code.to_string()))
    }

    async fn log(&self, event: &CreateLogEvent) -> Result<LogEvent, StoreError> {
        Ok(LogEventRepo::create(&self.pool, event).await?)
    }

    async fn find(&self, code: &str) -> Result<Option<Deposit>, StoreError> {
        Ok(DepositRepo::find_by_code(&self.pool, code).await?)
    }

    async fn events(&self, code: &str) -> Result<Vec<LogEvent>, StoreError> {
        Ok(LogEventRepo::list_by_deposit(&self.pool, code).await?)
    }
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    deposits: HashMap<String, Deposit>,
    events: Vec<LogEvent>,
    next_deposit_id: i64,
    next_event_id: i64,
    unavailable: HashSet<String>,
}

/// In-process store with the same replace and transition rules as the
/// Postgres tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write for `code` fail with [`StoreError::Unavailable`].
    pub fn fail_writes_for(&self, code: impl Into<String>) {
        self.lock().unavailable.insert(code.into());
    }

    /// Every live deposit, in no particular order.
    pub fn deposits(&self) -> Vec<Deposit> {
        self.lock().deposits.values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemoryState {
    fn check_writable(&self, code: &str) -> Result<(), StoreError> {
        if self.unavailable.contains(code) {
            return Err(StoreError::Unavailable(format!("writes for {code} are failing")));
        }
        Ok(())
    }

    fn append(&mut self, event: &CreateLogEvent) -> LogEvent {
        self.next_event_id += 1;
        let event = LogEvent {
            id: self.next_event_id,
            deposit_code: event.deposit_code.clone(),
            title: event.title.clone(),
            body: event.body.clone(),
            event_type: event.event_type.as_str().to_string(),
            status: event.status.as_str().to_string(),
            date: event.date,
        };
        self.events.push(event.clone());
        event
    }
}

impl DepositStore for MemoryStore {
    async fn replace(&self, input: &CreateDeposit) -> Result<Deposit, StoreError> {
        let mut state = self.lock();
        state.check_writable(&input.code)?;
        state.next_deposit_id += 1;
        let deposit = Deposit {
            id: state.next_deposit_id,
            code: input.code.clone(),
            pid: input.pid.clone(),
            collection_acronym: input.collection_acronym.clone(),
            xml_file_name: input.xml_file_name.clone(),
            doi: input.doi.clone(),
            prefix: input.prefix.clone(),
            submission_status: DepositStatus::Waiting.as_str().to_string(),
            feedback_status: None,
            is_xml_valid: None,
            submission_xml: None,
            doi_batch_id: None,
            started_at: input.started_at,
            updated_at: input.started_at,
            submission_updated_at: input.started_at,
            feedback_updated_at: None,
        };
        state.deposits.insert(input.code.clone(), deposit.clone());
        Ok(deposit)
    }

    async fn transition(
        &self,
        code: &str,
        update: &UpdateDeposit,
        event: &CreateLogEvent,
    ) -> Result<Deposit, StoreError> {
        let mut state = self.lock();
        state.check_writable(code)?;
        let at = event.date;
        let deposit = state
            .deposits
            .get_mut(code)
            .ok_or_else(|| StoreError::MissingDeposit(code.to_string()))?;

        if let Some(status) = update.submission_status {
            deposit.submission_status = status.as_str().to_string();
            deposit.submission_updated_at = deposit.submission_updated_at.max(at);
        }
        if let Some(status) = update.feedback_status {
            deposit.feedback_status = Some(status.as_str().to_string());
            deposit.feedback_updated_at = Some(deposit.feedback_updated_at.map_or(at, |t| t.max(at)));
        }
        if let Some(valid) = update.is_xml_valid {
            deposit.is_xml_valid = Some(valid);
        }
        if let Some(xml) = &update.submission_xml {
            deposit.submission_xml = Some(xml.clone());
        }
        if let Some(batch_id) = &update.doi_batch_id {
            deposit.doi_batch_id = Some(batch_id.clone());
        }
        deposit.updated_at = deposit.updated_at.max(at);

        let deposit = deposit.clone();
        state.append(event);
        Ok(deposit)
    }

    async fn log(&self, event: &CreateLogEvent) -> Result<LogEvent, StoreError> {
        let mut state = self.lock();
        state.check_writable(&event.deposit_code)?;
        Ok(state.append(event))
    }

    async fn find(&self, code: &str) -> Result<Option<Deposit>, StoreError> {
        Ok(self.lock().deposits.get(code).cloned())
    }

    async fn events(&self, code: &str) -> Result<Vec<LogEvent>, StoreError> {
        let mut events: Vec<LogEvent> = self
            .lock()
            .events
            .iter()
            .filter(|e| e.deposit_code == code)
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.date, e.id));
        Ok(events)
    }
}
