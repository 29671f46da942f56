//! Deposit model: the latest deposit attempt for one document code.

use depositor_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::{DepositStatus, UnknownStatus};

/// A row from the `deposits` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Deposit {
    pub id: DbId,
    pub code: String,
    pub pid: String,
    pub collection_acronym: String,
    pub xml_file_name: String,
    pub doi: Option<String>,
    pub prefix: String,
    pub submission_status: String,
    pub feedback_status: Option<String>,
    pub is_xml_valid: Option<bool>,
    pub submission_xml: Option<String>,
    pub doi_batch_id: Option<String>,
    pub started_at: Timestamp,
    pub updated_at: Timestamp,
    pub submission_updated_at: Timestamp,
    pub feedback_updated_at: Option<Timestamp>,
}

impl Deposit {
    pub fn status(&self) -> Result<DepositStatus, UnknownStatus> {
        self.submission_status.parse()
    }

    pub fn feedback(&self) -> Result<Option<DepositStatus>, UnknownStatus> {
        self.feedback_status.as_deref().map(str::parse).transpose()
    }
}

/// DTO for a fresh deposit attempt. The row always starts out `waiting`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDeposit {
    pub code: String,
    pub pid: String,
    pub collection_acronym: String,
    pub xml_file_name: String,
    pub doi: Option<String>,
    pub prefix: String,
    pub started_at: Timestamp,
}

/// DTO for a status transition. `None` fields keep their stored value.
///
/// Setting `submission_status` also moves `submission_updated_at`, and
/// setting `feedback_status` moves `feedback_updated_at`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDeposit {
    pub submission_status: Option<DepositStatus>,
    pub feedback_status: Option<DepositStatus>,
    pub is_xml_valid: Option<bool>,
    pub submission_xml: Option<String>,
    pub doi_batch_id: Option<String>,
}
