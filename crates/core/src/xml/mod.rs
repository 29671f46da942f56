//! XML handling for deposit documents: libxml2-backed parsing and
//! serialization, the depositor identity rewriter, and schema validation.

pub mod document;
pub mod rewriter;
pub mod schema;

pub use document::XmlDocument;
pub use rewriter::MetadataRewriter;
pub use schema::{SchemaValidator, ValidationReport};

/// Namespace of Crossref 4.4.0 deposit documents.
pub const CROSSREF_NAMESPACE: &str = "http://www.crossref.org/schema/4.4.0";
