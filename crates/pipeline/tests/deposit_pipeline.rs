//! State machine tests for `DepositPipeline` against the in-memory store.

mod common;

use std::sync::atomic::{AtomicI64, Ordering};

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use common::*;
use depositor_core::xml::{MetadataRewriter, XmlDocument, CROSSREF_NAMESPACE};
use depositor_db::models::deposit::Deposit;
use depositor_db::models::log_event::LogEvent;
use depositor_db::models::status::DepositStatus;
use depositor_pipeline::{
    DepositOutcome, DepositPipeline, DepositStore, MemoryStore, MonotonicClock, PipelineError,
    StoreError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn stored<K>(pipeline: &DepositPipeline<ScriptedCatalog, MemoryStore, K>, code: &str) -> Deposit
where
    K: depositor_pipeline::SubmissionSink,
{
    pipeline
        .store()
        .find(code)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("no deposit for {code}"))
}

async fn events<K>(pipeline: &DepositPipeline<ScriptedCatalog, MemoryStore, K>, code: &str) -> Vec<LogEvent>
where
    K: depositor_pipeline::SubmissionSink,
{
    pipeline.store().events(code).await.unwrap()
}

fn kinds(events: &[LogEvent]) -> Vec<(&str, &str)> {
    events
        .iter()
        .map(|e| (e.event_type.as_str(), e.status.as_str()))
        .collect()
}

// ---------------------------------------------------------------------------
// Prefix gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn foreign_prefix_is_not_applicable() {
    let doc = record("S0001", Some("10.9999/S0001"));
    let pipeline = pipeline(ScriptedCatalog::new().with_document(doc.clone(), Ok(DEPOSIT_XML)));

    let outcome = pipeline.deposit(&doc).await.unwrap();

    assert_eq!(outcome, DepositOutcome::NotApplicable);
    let deposit = stored(&pipeline, "scl_S0001").await;
    assert_eq!(deposit.status().unwrap(), DepositStatus::NotApplicable);
    assert_eq!(deposit.feedback().unwrap(), Some(DepositStatus::NotApplicable));
    assert_eq!(deposit.prefix, "10.9999");
    assert!(deposit.feedback_updated_at.is_some());

    let events = events(&pipeline, "scl_S0001").await;
    assert_eq!(kinds(&events), [("general", "notapplicable")]);
    assert!(events[0].title.contains("10.9999"), "{}", events[0].title);
    assert!(pipeline.catalog().xml_requests().is_empty());
}

#[tokio::test]
async fn document_without_doi_is_not_applicable() {
    let doc = record("S0002", None);
    let pipeline = pipeline(ScriptedCatalog::new());

    assert_eq!(pipeline.deposit(&doc).await.unwrap(), DepositOutcome::NotApplicable);
    assert_eq!(stored(&pipeline, "scl_S0002").await.prefix, "");
    assert!(pipeline.catalog().xml_requests().is_empty());
}

#[tokio::test]
async fn matching_prefix_proceeds_to_fetch() {
    let doc = record("S0001", Some("10.1590/S0001"));
    let pipeline = pipeline(ScriptedCatalog::new().with_document(doc.clone(), Ok(DEPOSIT_XML)));

    let outcome = pipeline.deposit(&doc).await.unwrap();

    assert_matches!(outcome, DepositOutcome::Validated { .. });
    assert_eq!(pipeline.catalog().xml_requests(), ["S0001"]);
}

#[tokio::test]
async fn prefix_comparison_ignores_case() {
    let doc = record("S0003", Some("10.ABC/S0003"));
    let catalog = ScriptedCatalog::new().with_document(doc.clone(), Ok(DEPOSIT_XML));
    let pipeline = DepositPipeline::new(catalog, MemoryStore::new(), validator(), rewriter(), "10.abc");

    assert_matches!(pipeline.deposit(&doc).await.unwrap(), DepositOutcome::Validated { .. });
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_failure_records_error() {
    let doc = scielo_record("S0001");
    let pipeline = pipeline(ScriptedCatalog::new().with_document(doc.clone(), Err("catalog timed out")));

    let outcome = pipeline.deposit(&doc).await.unwrap();

    assert_eq!(outcome, DepositOutcome::FetchFailed);
    let deposit = stored(&pipeline, "scl_S0001").await;
    assert_eq!(deposit.status().unwrap(), DepositStatus::Error);
    assert_eq!(deposit.is_xml_valid, None);
    assert_eq!(deposit.submission_xml, None);

    let events = events(&pipeline, "scl_S0001").await;
    assert_eq!(kinds(&events), [("submission", "info"), ("submission", "error")]);
    let body = events[1].body.as_deref().unwrap_or_default();
    assert!(body.contains("catalog timed out"), "{body}");
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_xml_is_validated_and_kept_waiting() {
    let doc = scielo_record("S0001");
    let pipeline = pipeline(ScriptedCatalog::new().with_document(doc.clone(), Ok(DEPOSIT_XML)));

    let outcome = pipeline.deposit(&doc).await.unwrap();

    assert_eq!(
        outcome,
        DepositOutcome::Validated {
            doi_batch_id: Some("a1b2c3d4e5".to_string())
        }
    );

    let deposit = stored(&pipeline, "scl_S0001").await;
    assert_eq!(deposit.status().unwrap(), DepositStatus::Waiting);
    assert_eq!(deposit.feedback().unwrap(), None);
    assert_eq!(deposit.is_xml_valid, Some(true));
    assert_eq!(deposit.doi_batch_id.as_deref(), Some("a1b2c3d4e5"));
    assert_eq!(deposit.submission_xml, Some(rewritten(DEPOSIT_XML)));
    assert_eq!(deposit.xml_file_name, "scl_S0001.xml");

    let events = events(&pipeline, "scl_S0001").await;
    assert_eq!(kinds(&events), [("submission", "info"), ("submission", "success")]);
}

#[tokio::test]
async fn submission_xml_carries_the_rewritten_identity() {
    let doc = scielo_record("S0001");
    let pipeline = pipeline(ScriptedCatalog::new().with_document(doc.clone(), Ok(DEPOSIT_XML)));

    pipeline.deposit(&doc).await.unwrap();

    let xml = stored(&pipeline, "scl_S0001").await.submission_xml.unwrap();
    let stored_doc = XmlDocument::parse(&xml).unwrap();
    let ns = Some(CROSSREF_NAMESPACE);
    assert_eq!(stored_doc.find_text(ns, "registrant").as_deref(), Some("SciELO"));
    assert_eq!(stored_doc.find_text(ns, "depositor_name").as_deref(), Some("SciELO"));
}

#[tokio::test]
async fn schema_violation_records_invalid_xml() {
    let doc = scielo_record("S0001");
    let xml = DEPOSIT_XML.replace("<issue>1</issue>", "<issue>1</issue><bogus/>");
    let pipeline = pipeline(ScriptedCatalog::new().with_document(doc.clone(), Ok(xml.as_str())));

    let outcome = pipeline.deposit(&doc).await.unwrap();

    assert_eq!(outcome, DepositOutcome::Invalid);
    let deposit = stored(&pipeline, "scl_S0001").await;
    assert_eq!(deposit.status().unwrap(), DepositStatus::Error);
    assert_eq!(deposit.is_xml_valid, Some(false));
    assert_eq!(deposit.doi_batch_id, None);

    // The stored XML is the rewritten document, not the fetched text.
    assert_eq!(deposit.submission_xml, Some(rewritten(&xml)));
    assert_ne!(deposit.submission_xml.as_deref(), Some(xml.as_str()));

    let events = events(&pipeline, "scl_S0001").await;
    assert_eq!(kinds(&events), [("submission", "info"), ("submission", "error")]);
    let body = events[1].body.as_deref().unwrap_or_default();
    assert!(body.contains("This element is not expected"), "{body}");
}

#[tokio::test]
async fn malformed_xml_keeps_the_fetched_text() {
    let doc = scielo_record("S0001");
    let raw = "<doi_batch>\n<head>";
    let pipeline = pipeline(ScriptedCatalog::new().with_document(doc.clone(), Ok(raw)));

    assert_eq!(pipeline.deposit(&doc).await.unwrap(), DepositOutcome::Invalid);
    let deposit = stored(&pipeline, "scl_S0001").await;
    assert_eq!(deposit.is_xml_valid, Some(false));
    assert_eq!(deposit.submission_xml.as_deref(), Some(raw));
}

#[tokio::test]
async fn missing_rewrite_target_is_invalid() {
    let doc = scielo_record("S0001");
    let xml = DEPOSIT_XML.replace("<email_address>doi@scielo.org</email_address>", "");
    let catalog = ScriptedCatalog::new().with_document(doc.clone(), Ok(xml.as_str()));
    let rewriter = MetadataRewriter::new(
        CROSSREF_NAMESPACE,
        Some("SciELO".to_string()),
        Some("crossref@scielo.org".to_string()),
    );
    let pipeline = DepositPipeline::new(catalog, MemoryStore::new(), validator(), rewriter, PREFIX);

    assert_eq!(pipeline.deposit(&doc).await.unwrap(), DepositOutcome::Invalid);
    let events = events(&pipeline, "scl_S0001").await;
    let body = events[1].body.as_deref().unwrap_or_default();
    assert!(body.contains("email_address' not found"), "{body}");
}

// ---------------------------------------------------------------------------
// Replacement and ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn redeposit_replaces_the_row_and_keeps_history() {
    let doc = scielo_record("S0001");
    let pipeline = pipeline(ScriptedCatalog::new().with_document(doc.clone(), Ok(DEPOSIT_XML)));

    pipeline.deposit(&doc).await.unwrap();
    let first = stored(&pipeline, "scl_S0001").await;
    pipeline.deposit(&doc).await.unwrap();
    let second = stored(&pipeline, "scl_S0001").await;

    assert_eq!(pipeline.store().deposits().len(), 1);
    assert_ne!(first.id, second.id);
    assert_eq!(events(&pipeline, "scl_S0001").await.len(), 4);
}

#[tokio::test]
async fn timestamps_never_go_backwards() {
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let calls = AtomicI64::new(0);
    // Every reading is a minute earlier than the previous one.
    let clock = MonotonicClock::with_source(move || {
        base - Duration::minutes(calls.fetch_add(1, Ordering::SeqCst))
    });

    let doc = scielo_record("S0001");
    let pipeline = pipeline(ScriptedCatalog::new().with_document(doc.clone(), Ok(DEPOSIT_XML)))
        .with_clock(clock);
    pipeline.deposit(&doc).await.unwrap();

    let deposit = stored(&pipeline, "scl_S0001").await;
    assert!(deposit.updated_at >= deposit.started_at);
    let events = events(&pipeline, "scl_S0001").await;
    assert!(events.windows(2).all(|w| w[0].date <= w[1].date));
    assert!(events.iter().all(|e| e.date >= deposit.started_at));
}

// ---------------------------------------------------------------------------
// Hand-off and failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validated_deposit_is_handed_to_the_sink() {
    let doc = scielo_record("S0001");
    let pipeline = pipeline(ScriptedCatalog::new().with_document(doc.clone(), Ok(DEPOSIT_XML)))
        .with_sink(RecordingSink::default());

    pipeline.deposit(&doc).await.unwrap();

    let requests = pipeline.sink().requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].code, "scl_S0001");
    assert_eq!(requests[0].doi_batch_id.as_deref(), Some("a1b2c3d4e5"));
    let deposit = stored(&pipeline, "scl_S0001").await;
    assert_eq!(deposit.submission_xml.as_deref(), Some(requests[0].xml.as_str()));
}

#[tokio::test]
async fn sink_failure_does_not_change_state() {
    let doc = scielo_record("S0001");
    let pipeline = pipeline(ScriptedCatalog::new().with_document(doc.clone(), Ok(DEPOSIT_XML)))
        .with_sink(FailingSink);

    assert_matches!(pipeline.deposit(&doc).await.unwrap(), DepositOutcome::Validated { .. });
    let deposit = stored(&pipeline, "scl_S0001").await;
    assert_eq!(deposit.status().unwrap(), DepositStatus::Waiting);
    assert_eq!(deposit.is_xml_valid, Some(true));
}

#[tokio::test]
async fn store_failure_is_an_error() {
    let doc = scielo_record("S0001");
    let pipeline = pipeline(ScriptedCatalog::new().with_document(doc.clone(), Ok(DEPOSIT_XML)));
    pipeline.store().fail_writes_for("scl_S0001");

    let result = pipeline.deposit(&doc).await;

    assert_matches!(result, Err(PipelineError::Store(StoreError::Unavailable(_))));
    assert!(pipeline.catalog().xml_requests().is_empty());
}

#[tokio::test]
async fn deposit_by_pid_looks_the_document_up() {
    let doc = scielo_record("S0001");
    let pipeline = pipeline(ScriptedCatalog::new().with_document(doc, Ok(DEPOSIT_XML)));

    assert_matches!(
        pipeline.deposit_by_pid("S0001", COLLECTION).await,
        Ok(DepositOutcome::Validated { .. })
    );
    assert_matches!(
        pipeline.deposit_by_pid("S9999", COLLECTION).await,
        Err(PipelineError::Catalog(_))
    );
    assert!(pipeline.store().find("scl_S9999").await.unwrap().is_none());
}
