//! Batch runs over catalog listings or explicit PID lists.

use chrono::NaiveDate;
use depositor_catalog::{CatalogProvider, DocumentQuery};
use futures::StreamExt;

use crate::error::PipelineError;
use crate::pipeline::{DepositOutcome, DepositPipeline};
use crate::sink::SubmissionSink;
use crate::store::DepositStore;

/// Documents of one collection updated within a date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub collection: String,
    /// One pass per ISSN; empty means a single unfiltered pass.
    pub issns: Vec<String>,
    pub from_date: NaiveDate,
    pub until_date: NaiveDate,
}

/// Per-outcome counts for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Documents attempted, including PIDs the catalog could not resolve.
    pub documents: usize,
    pub not_applicable: usize,
    pub fetch_failed: usize,
    pub invalid: usize,
    pub validated: usize,
    /// Listing errors and deposits whose state could not be recorded.
    pub failures: usize,
}

impl BatchSummary {
    fn record(&mut self, result: &Result<DepositOutcome, PipelineError>) {
        self.documents += 1;
        match result {
            Ok(DepositOutcome::NotApplicable) => self.not_applicable += 1,
            Ok(DepositOutcome::FetchFailed) => self.fetch_failed += 1,
            Ok(DepositOutcome::Invalid) => self.invalid += 1,
            Ok(DepositOutcome::Validated { .. }) => self.validated += 1,
            Err(_) => self.failures += 1,
        }
    }
}

/// Drives a [`DepositPipeline`] one document at a time.
pub struct BatchRunner<C, S, K> {
    pipeline: DepositPipeline<C, S, K>,
}

impl<C, S, K> BatchRunner<C, S, K>
where
    C: CatalogProvider,
    S: DepositStore,
    K: SubmissionSink,
{
    pub fn new(pipeline: DepositPipeline<C, S, K>) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &DepositPipeline<C, S, K> {
        &self.pipeline
    }

    /// Deposit every document the catalog lists for `request`.
    ///
    /// Failures are logged and counted; the run always goes on to the next
    /// document.
    pub async fn run(&self, request: &BatchRequest) -> BatchSummary {
        tracing::info!(collection = %request.collection, "Processing started");
        tracing::info!(from = %request.from_date, until = %request.until_date, "Date range");

        let passes: Vec<Option<&String>> = if request.issns.is_empty() {
            vec![None]
        } else {
            request.issns.iter().map(Some).collect()
        };

        let mut summary = BatchSummary::default();
        for issn in passes {
            let query = DocumentQuery {
                collection: request.collection.clone(),
                issn: issn.cloned(),
                from_date: request.from_date,
                until_date: request.until_date,
            };
            let mut documents = self.pipeline.catalog().list_documents(&query);
            while let Some(item) = documents.next().await {
                match item {
                    Ok(document) => {
                        let result = self.pipeline.deposit(&document).await;
                        if let Err(e) = &result {
                            tracing::error!(
                                collection = %document.collection_acronym,
                                pid = %document.publisher_id,
                                error = %e,
                                "Deposit failed",
                            );
                        }
                        summary.record(&result);
                    }
                    Err(e) => {
                        tracing::error!(issn = ?query.issn, error = %e, "Failed to list catalog documents");
                        summary.failures += 1;
                    }
                }
            }
        }

        log_summary(&summary);
        summary
    }

    /// Deposit an explicit list of PIDs from one collection.
    pub async fn run_pids(&self, collection: &str, pids: &[String]) -> BatchSummary {
        tracing::info!(collection = %collection, count = pids.len(), "Processing started");

        let mut summary = BatchSummary::default();
        for pid in pids {
            let result = self.pipeline.deposit_by_pid(pid, collection).await;
            if let Err(e) = &result {
                tracing::error!(collection = %collection, pid = %pid, error = %e, "Deposit failed");
            }
            summary.record(&result);
        }

        log_summary(&summary);
        summary
    }
}

fn log_summary(summary: &BatchSummary) {
    tracing::info!(
        documents = summary.documents,
        validated = summary.validated,
        invalid = summary.invalid,
        not_applicable = summary.not_applicable,
        fetch_failed = summary.fetch_failed,
        failures = summary.failures,
        "Processing finished",
    );
}
