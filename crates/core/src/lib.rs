//! Core domain logic for the DOI depositor.
//!
//! Nothing here touches the database or the network:
//!
//! - [`deposit`]: deposit codes, file names and DOI prefix handling.
//! - [`issn`]: ISSN filter checking for batch runs.
//! - [`xml`]: libxml2 documents, [`MetadataRewriter`] and [`SchemaValidator`].
//! - [`error`]: parse, schema and rewrite errors.

pub mod deposit;
pub mod error;
pub mod issn;
pub mod types;
pub mod xml;

pub use error::{RewriteError, SchemaLoadError, SchemaViolation, Violation, XmlParseError};
pub use xml::{MetadataRewriter, SchemaValidator, ValidationReport, XmlDocument, CROSSREF_NAMESPACE};
