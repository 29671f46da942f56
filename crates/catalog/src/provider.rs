//! Provider trait and the values it exchanges.

use std::future::Future;

use chrono::NaiveDate;
use futures::stream::BoxStream;

/// Identity of one document in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub collection_acronym: String,
    pub publisher_id: String,
    pub doi: Option<String>,
}

/// Serializations the catalog can export a document as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Crossref deposit XML.
    XmlCrossref,
}

impl DocumentFormat {
    /// Value of the `format` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentFormat::XmlCrossref => "xmlcrossref",
        }
    }
}

/// Filter for listing documents updated within a date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
    pub collection: String,
    /// Restrict to one journal; `None` lists the whole collection.
    pub issn: Option<String>,
    pub from_date: NaiveDate,
    pub until_date: NaiveDate,
}

/// Errors from fetching catalog data.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The catalog returned a non-2xx status code.
    #[error("Catalog API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response arrived but could not be understood.
    #[error("Unexpected catalog response: {0}")]
    Decode(String),
}

/// Read access to a document catalog.
pub trait CatalogProvider: Send + Sync {
    /// Look up the record for one document.
    fn get_document(
        &self,
        publisher_id: &str,
        collection: &str,
    ) -> impl Future<Output = Result<DocumentRecord, FetchError>> + Send;

    /// Fetch one document in the given serialization.
    fn get_document_xml(
        &self,
        publisher_id: &str,
        collection: &str,
        format: DocumentFormat,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;

    /// Lazily list the documents matching `query`.
    ///
    /// An item-level error does not end the stream; a failure to list
    /// further documents is yielded once and then the stream ends.
    fn list_documents<'a>(
        &'a self,
        query: &'a DocumentQuery,
    ) -> BoxStream<'a, Result<DocumentRecord, FetchError>>;
}
