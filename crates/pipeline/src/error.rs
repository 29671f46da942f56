use depositor_catalog::FetchError;

use crate::store::StoreError;

/// Failures that stop a single deposit without being recorded as a status.
///
/// Per-document problems (prefix mismatch, fetch failure, invalid XML) are
/// outcomes, not errors; these are the cases where state could not be
/// written or the document could not even be identified.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Deposit store error: {0}")]
    Store(#[from] StoreError),

    #[error("Catalog lookup failed: {0}")]
    Catalog(#[from] FetchError),
}
