//! Per-document deposit state machine.
//!
//! Every attempt starts from a fresh `waiting` row and ends in one of:
//!
//! - `notapplicable`: the DOI prefix is not the collection's,
//! - `error`: the XML could not be fetched, or failed validation,
//! - `waiting` with `is_xml_valid = true`: validated, pending submission.
//!
//! Each step is committed before the next one starts.

use depositor_catalog::{CatalogProvider, DocumentFormat, DocumentRecord};
use depositor_core::deposit::{deposit_code, doi_prefix, prefix_matches, xml_file_name};
use depositor_core::xml::{MetadataRewriter, SchemaValidator};
use depositor_db::models::deposit::{CreateDeposit, UpdateDeposit};
use depositor_db::models::log_event::CreateLogEvent;
use depositor_db::models::status::{DepositStatus, LogEventStatus, LogEventType};

use crate::clock::MonotonicClock;
use crate::error::PipelineError;
use crate::sink::{DeferredSubmission, RegistrationRequest, SubmissionSink};
use crate::store::DepositStore;

/// How a single deposit attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositOutcome {
    /// The DOI prefix does not belong to the collection.
    NotApplicable,
    /// The catalog could not supply the deposit XML.
    FetchFailed,
    /// The XML is malformed, could not be rewritten, or violates the schema.
    Invalid,
    /// The XML is valid and was handed to the submission sink.
    Validated { doi_batch_id: Option<String> },
}

pub struct DepositPipeline<C, S, K = DeferredSubmission> {
    catalog: C,
    store: S,
    sink: K,
    validator: SchemaValidator,
    rewriter: MetadataRewriter,
    prefix: String,
    clock: MonotonicClock,
}

impl<C, S> DepositPipeline<C, S, DeferredSubmission>
where
    C: CatalogProvider,
    S: DepositStore,
{
    /// `prefix` is the collection's DOI prefix, e.g. `10.1590`.
    pub fn new(
        catalog: C,
        store: S,
        validator: SchemaValidator,
        rewriter: MetadataRewriter,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            store,
            sink: DeferredSubmission::default(),
            validator,
            rewriter,
            prefix: prefix.into(),
            clock: MonotonicClock::new(),
        }
    }
}

impl<C, S, K> DepositPipeline<C, S, K>
where
    C: CatalogProvider,
    S: DepositStore,
    K: SubmissionSink,
{
    /// Replace the submission sink.
    pub fn with_sink<K2: SubmissionSink>(self, sink: K2) -> DepositPipeline<C, S, K2> {
        DepositPipeline {
            catalog: self.catalog,
            store: self.store,
            sink,
            validator: self.validator,
            rewriter: self.rewriter,
            prefix: self.prefix,
            clock: self.clock,
        }
    }

    pub fn with_clock(mut self, clock: MonotonicClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Look a document up by PID and deposit it.
    pub async fn deposit_by_pid(
        &self,
        pid: &str,
        collection: &str,
    ) -> Result<DepositOutcome, PipelineError> {
        let document = self.catalog.get_document(pid, collection).await?;
        self.deposit(&document).await
    }

    /// Run one deposit attempt for `document`.
    ///
    /// Per-document failures are recorded and returned as outcomes; an
    /// `Err` means the store could not record a step.
    pub async fn deposit(&self, document: &DocumentRecord) -> Result<DepositOutcome, PipelineError> {
        let code = deposit_code(&document.collection_acronym, &document.publisher_id);
        let prefix = doi_prefix(document.doi.as_deref());
        tracing::info!(code = %code, "Reading document");

        self.store
            .replace(&CreateDeposit {
                code: code.clone(),
                pid: document.publisher_id.clone(),
                collection_acronym: document.collection_acronym.clone(),
                xml_file_name: xml_file_name(&code),
                doi: document.doi.clone(),
                prefix: prefix.to_string(),
                started_at: self.clock.now(),
            })
            .await?;

        // --- Prefix gate ---
        if !prefix_matches(prefix, &self.prefix) {
            let title = format!(
                "Document DOI prefix ({prefix}) does not match the collection prefix ({})",
                self.prefix
            );
            tracing::warn!(code = %code, doi_prefix = %prefix, "Deposit not applicable");
            let update = UpdateDeposit {
                submission_status: Some(DepositStatus::NotApplicable),
                feedback_status: Some(DepositStatus::NotApplicable),
                ..Default::default()
            };
            let event = self.event(&code, LogEventType::General, LogEventStatus::NotApplicable, title, None);
            self.store.transition(&code, &update, &event).await?;
            return Ok(DepositOutcome::NotApplicable);
        }

        // --- Fetch ---
        let title = format!("Loading XML document from the catalog ({code})");
        let event = self.event(&code, LogEventType::Submission, LogEventStatus::Info, title, None);
        self.store.log(&event).await?;

        let xml = match self
            .catalog
            .get_document_xml(
                &document.publisher_id,
                &document.collection_acronym,
                DocumentFormat::XmlCrossref,
            )
            .await
        {
            Ok(xml) => xml,
            Err(e) => {
                tracing::error!(code = %code, error = %e, "Failed to load XML document");
                let title = format!("Failed to load XML document from the catalog ({code})");
                let update = UpdateDeposit {
                    submission_status: Some(DepositStatus::Error),
                    ..Default::default()
                };
                let event = self.event(
                    &code,
                    LogEventType::Submission,
                    LogEventStatus::Error,
                    title,
                    Some(e.to_string()),
                );
                self.store.transition(&code, &update, &event).await?;
                return Ok(DepositOutcome::FetchFailed);
            }
        };

        // --- Rewrite + validate ---
        let report = self.validator.validate(&xml, &self.rewriter);
        let submission_xml = report
            .xml
            .clone()
            .unwrap_or_else(|| String::from_utf8_lossy(&xml).into_owned());

        if !report.is_valid() {
            tracing::warn!(code = %code, well_formed = report.well_formed, "Deposit XML is invalid");
            let title = format!("XML is invalid for document ({code})");
            let update = UpdateDeposit {
                submission_status: Some(DepositStatus::Error),
                is_xml_valid: Some(false),
                submission_xml: Some(submission_xml),
                ..Default::default()
            };
            let event = self.event(
                &code,
                LogEventType::Submission,
                LogEventStatus::Error,
                title,
                report.error,
            );
            self.store.transition(&code, &update, &event).await?;
            return Ok(DepositOutcome::Invalid);
        }

        // --- Validated ---
        let doi_batch_id = report.doi_batch_id;
        tracing::info!(code = %code, doi_batch_id = ?doi_batch_id, "Deposit XML is valid");
        let update = UpdateDeposit {
            is_xml_valid: Some(true),
            submission_xml: Some(submission_xml.clone()),
            doi_batch_id: doi_batch_id.clone(),
            ..Default::default()
        };
        let event = self.event(
            &code,
            LogEventType::Submission,
            LogEventStatus::Success,
            "XML is valid, it will be submitted to the registration agency".to_string(),
            None,
        );
        self.store.transition(&code, &update, &event).await?;

        // --- Hand-off ---
        let request = RegistrationRequest {
            code: code.clone(),
            xml: submission_xml,
            doi_batch_id: doi_batch_id.clone(),
        };
        if let Err(e) = self.sink.register(&request).await {
            tracing::error!(code = %code, error = %e, "Submission hand-off failed");
        }

        Ok(DepositOutcome::Validated { doi_batch_id })
    }

    fn event(
        &self,
        code: &str,
        event_type: LogEventType,
        status: LogEventStatus,
        title: String,
        body: Option<String>,
    ) -> CreateLogEvent {
        CreateLogEvent {
            deposit_code: code.to_string(),
            title,
            body,
            event_type,
            status,
            date: self.clock.now(),
        }
    }
}
