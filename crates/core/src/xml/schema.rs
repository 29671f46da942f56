//! XML Schema validation through libxml2.
//!
//! The schema is compiled once at load time so a broken schema fails
//! startup. libxml2 validation contexts cannot leave the thread that built
//! them, so each thread keeps its own compiled copy, built on first use,
//! and [`SchemaValidator`] itself only holds the schema's location.

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use libxml::error::StructuredError;
use libxml::schemas::{SchemaParserContext, SchemaValidationContext};

use crate::error::{SchemaLoadError, SchemaViolation, Violation};
use crate::xml::document::XmlDocument;
use crate::xml::rewriter::MetadataRewriter;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    static COMPILED: RefCell<HashMap<u64, SchemaValidationContext>> = RefCell::new(HashMap::new());
}

#[derive(Debug, Clone)]
enum SchemaSource {
    /// Imports and includes resolve relative to the file.
    File(PathBuf),
    Text(String),
}

/// A loaded schema, ready to validate documents from any thread.
#[derive(Debug)]
pub struct SchemaValidator {
    id: u64,
    source: SchemaSource,
    target_namespace: Option<String>,
}

/// Outcome of [`SchemaValidator::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// The bytes parsed as XML.
    pub well_formed: bool,
    /// Pretty-printed (and rewritten) document; `None` when not well-formed.
    pub xml: Option<String>,
    /// `head/doi_batch_id` of the document, when present and non-blank.
    pub doi_batch_id: Option<String>,
    /// Parse, rewrite or schema failure, if any.
    pub error: Option<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.well_formed && self.error.is_none()
    }
}

impl SchemaValidator {
    /// Load a schema from text. Relative imports resolve against the
    /// working directory.
    pub fn from_xsd(text: &str) -> Result<Self, SchemaLoadError> {
        let target_namespace = target_namespace(text.as_bytes())?;
        Self::load(SchemaSource::Text(text.to_string()), target_namespace)
    }

    /// Load the schema at `path` together with everything it imports.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaLoadError> {
        let path = path.as_ref();
        let text = std::fs::read(path).map_err(|source| SchemaLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let target_namespace = target_namespace(&text)?;
        Self::load(SchemaSource::File(path.to_path_buf()), target_namespace)
    }

    fn load(source: SchemaSource, target_namespace: Option<String>) -> Result<Self, SchemaLoadError> {
        let validator = Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            source,
            target_namespace,
        };
        let compiled = validator.compile()?;
        COMPILED.with(|cache| cache.borrow_mut().insert(validator.id, compiled));

        tracing::debug!(
            target_namespace = validator.target_namespace.as_deref().unwrap_or_default(),
            "Compiled schema"
        );
        Ok(validator)
    }

    fn compile(&self) -> Result<SchemaValidationContext, SchemaLoadError> {
        let mut parser = match &self.source {
            SchemaSource::File(path) => SchemaParserContext::from_file(&path.to_string_lossy()),
            SchemaSource::Text(text) => SchemaParserContext::from_buffer(text.as_str()),
        };
        SchemaValidationContext::from_parser(&mut parser).map_err(|errors| {
            let violations = violations(&errors);
            SchemaLoadError::Invalid(SchemaViolation { violations }.to_string())
        })
    }

    pub fn target_namespace(&self) -> Option<&str> {
        self.target_namespace.as_deref()
    }

    /// Check `doc` against the schema, collecting every violation.
    pub fn assert_valid(&self, doc: &XmlDocument) -> Result<(), SchemaViolation> {
        let outcome = COMPILED.with(|cache| -> Result<_, SchemaLoadError> {
            let mut cache = cache.borrow_mut();
            let context = match cache.entry(self.id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(self.compile()?),
            };
            Ok(context.validate_document(doc.as_libxml()))
        });

        let violations = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(errors)) => violations(&errors),
            Err(e) => vec![Violation {
                line: 0,
                message: e.to_string(),
            }],
        };
        Err(SchemaViolation { violations })
    }

    /// Parse `xml`, apply `rewriter`, then check the result.
    ///
    /// Never fails: every problem ends up in the report. The report owns
    /// plain strings only, so it can be held across `.await`.
    pub fn validate(&self, xml: &[u8], rewriter: &MetadataRewriter) -> ValidationReport {
        let mut document = match XmlDocument::parse_bytes(xml) {
            Ok(document) => document,
            Err(e) => {
                return ValidationReport {
                    well_formed: false,
                    xml: None,
                    doi_batch_id: None,
                    error: Some(e.to_string()),
                };
            }
        };

        let error = match rewriter.apply(&mut document) {
            Err(e) => Some(e.to_string()),
            Ok(_) => self.assert_valid(&document).err().map(|e| e.to_string()),
        };

        let namespace = self.target_namespace().unwrap_or(rewriter.namespace());
        let doi_batch_id = document
            .find_text(Some(namespace), "doi_batch_id")
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        ValidationReport {
            well_formed: true,
            xml: Some(document.to_pretty_string()),
            doi_batch_id,
            error,
        }
    }
}

impl Drop for SchemaValidator {
    fn drop(&mut self) {
        let _ = COMPILED.try_with(|cache| {
            if let Ok(mut cache) = cache.try_borrow_mut() {
                cache.remove(&self.id);
            }
        });
    }
}

fn target_namespace(schema: &[u8]) -> Result<Option<String>, SchemaLoadError> {
    let doc = XmlDocument::parse_bytes(schema)?;
    if doc.root_name().as_deref() != Some("schema") {
        return Err(SchemaLoadError::Invalid(
            "root element is not an XML Schema".to_string(),
        ));
    }
    Ok(doc.root_attribute("targetNamespace"))
}

fn violations(errors: &[StructuredError]) -> Vec<Violation> {
    let mut violations: Vec<Violation> = errors
        .iter()
        .map(|error| Violation {
            line: error
                .line
                .and_then(|line| usize::try_from(line).ok())
                .unwrap_or_default(),
            message: error
                .message
                .as_deref()
                .unwrap_or("Unknown schema error")
                .trim_end()
                .to_string(),
        })
        .collect();
    if violations.is_empty() {
        violations.push(Violation {
            line: 0,
            message: "Document does not conform to the schema".to_string(),
        });
    }
    violations
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
