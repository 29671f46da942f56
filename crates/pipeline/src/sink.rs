//! Hand-off of validated deposits to the registration agency.

use std::future::Future;

/// A validated deposit ready for registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub code: String,
    /// Rewritten, pretty-printed deposit XML.
    pub xml: String,
    /// Used to poll the agency for the submission status.
    pub doi_batch_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Registration agency unavailable: {0}")]
    Unavailable(String),

    #[error("Registration rejected: {0}")]
    Rejected(String),
}

/// Receives validated deposits. Failures never change persisted state.
pub trait SubmissionSink: Send + Sync {
    fn register(
        &self,
        request: &RegistrationRequest,
    ) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Records that a deposit is ready and leaves submission to a later step.
#[derive(Debug, Clone, Default)]
pub struct DeferredSubmission {
    test_mode: bool,
}

impl DeferredSubmission {
    /// `test_mode` selects the agency's test endpoint once submission is
    /// wired up.
    pub fn new(test_mode: bool) -> Self {
        Self { test_mode }
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode
    }
}

impl SubmissionSink for DeferredSubmission {
    async fn register(&self, request: &RegistrationRequest) -> Result<(), SinkError> {
        tracing::info!(
            code = %request.code,
            doi_batch_id = ?request.doi_batch_id,
            test_mode = self.test_mode,
            "Deposit validated, submission deferred",
        );
        Ok(())
    }
}
