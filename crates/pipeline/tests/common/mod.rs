//! Shared fixtures: a scripted catalog, recording sinks and a pipeline
//! wired to the in-memory store.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use depositor_catalog::{CatalogProvider, DocumentFormat, DocumentQuery, DocumentRecord, FetchError};
use depositor_core::xml::{MetadataRewriter, SchemaValidator, XmlDocument, CROSSREF_NAMESPACE};
use depositor_pipeline::{DepositPipeline, MemoryStore, RegistrationRequest, SinkError, SubmissionSink};
use futures::stream::{self, BoxStream, StreamExt};

pub const PREFIX: &str = "10.1590";
pub const COLLECTION: &str = "scl";
pub const DEPOSIT_XML: &str = include_str!("../fixtures/deposit.xml");

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Catalog answering from fixed tables. Failures are given as messages
/// and surface as HTTP 500 responses.
#[derive(Default)]
pub struct ScriptedCatalog {
    records: HashMap<String, DocumentRecord>,
    xml: HashMap<String, Result<String, String>>,
    listings: HashMap<Option<String>, Vec<Result<DocumentRecord, String>>>,
    xml_requests: Mutex<Vec<String>>,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document and what fetching its XML returns.
    pub fn with_document(mut self, record: DocumentRecord, xml: Result<&str, &str>) -> Self {
        let pid = record.publisher_id.clone();
        self.xml
            .insert(pid.clone(), xml.map(str::to_string).map_err(str::to_string));
        self.records.insert(pid, record);
        self
    }

    /// Script the listing returned for an ISSN (`None` for unfiltered).
    pub fn with_listing(
        mut self,
        issn: Option<&str>,
        items: Vec<Result<DocumentRecord, &str>>,
    ) -> Self {
        let items = items
            .into_iter()
            .map(|item| item.map_err(str::to_string))
            .collect();
        self.listings.insert(issn.map(str::to_string), items);
        self
    }

    /// PIDs whose XML was requested, in order.
    pub fn xml_requests(&self) -> Vec<String> {
        self.xml_requests.lock().unwrap().clone()
    }
}

fn server_error(message: &str) -> FetchError {
    FetchError::Api {
        status: 500,
        body: message.to_string(),
    }
}

impl CatalogProvider for ScriptedCatalog {
    async fn get_document(
        &self,
        publisher_id: &str,
        _collection: &str,
    ) -> Result<DocumentRecord, FetchError> {
        self.records
            .get(publisher_id)
            .cloned()
            .ok_or_else(|| FetchError::Decode(format!("document {publisher_id} not found")))
    }

    async fn get_document_xml(
        &self,
        publisher_id: &str,
        _collection: &str,
        format: DocumentFormat,
    ) -> Result<Vec<u8>, FetchError> {
        assert_eq!(format, DocumentFormat::XmlCrossref);
        self.xml_requests.lock().unwrap().push(publisher_id.to_string());
        match self.xml.get(publisher_id) {
            Some(Ok(xml)) => Ok(xml.clone().into_bytes()),
            Some(Err(message)) => Err(server_error(message)),
            None => Err(server_error("no such document")),
        }
    }

    fn list_documents<'a>(
        &'a self,
        query: &'a DocumentQuery,
    ) -> BoxStream<'a, Result<DocumentRecord, FetchError>> {
        let items: Vec<Result<DocumentRecord, FetchError>> = self
            .listings
            .get(&query.issn)
            .map(|items| {
                items
                    .iter()
                    .map(|item| item.clone().map_err(|message| server_error(&message)))
                    .collect()
            })
            .unwrap_or_default();
        stream::iter(items).boxed()
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSink {
    pub requests: Mutex<Vec<RegistrationRequest>>,
}

impl SubmissionSink for RecordingSink {
    async fn register(&self, request: &RegistrationRequest) -> Result<(), SinkError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }
}

pub struct FailingSink;

impl SubmissionSink for FailingSink {
    async fn register(&self, _request: &RegistrationRequest) -> Result<(), SinkError> {
        Err(SinkError::Unavailable("agency offline".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn record(pid: &str, doi: Option<&str>) -> DocumentRecord {
    DocumentRecord {
        collection_acronym: COLLECTION.to_string(),
        publisher_id: pid.to_string(),
        doi: doi.map(str::to_string),
    }
}

/// A document with a DOI under [`PREFIX`].
pub fn scielo_record(pid: &str) -> DocumentRecord {
    record(pid, Some(format!("{PREFIX}/{pid}").as_str()))
}

pub fn validator() -> SchemaValidator {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../schemas/crossref_deposit.xsd");
    SchemaValidator::from_file(path).expect("deposit schema loads")
}

pub fn rewriter() -> MetadataRewriter {
    MetadataRewriter::new(CROSSREF_NAMESPACE, Some("SciELO".to_string()), None)
}

/// `xml` after the [`rewriter`] identity, serialized the way the pipeline stores it.
pub fn rewritten(xml: &str) -> String {
    let mut doc = XmlDocument::parse(xml).expect("fixture is well-formed");
    rewriter().apply(&mut doc).expect("fixture has the identity elements");
    doc.to_pretty_string()
}

pub fn pipeline(catalog: ScriptedCatalog) -> DepositPipeline<ScriptedCatalog, MemoryStore> {
    DepositPipeline::new(catalog, MemoryStore::new(), validator(), rewriter(), PREFIX)
}
