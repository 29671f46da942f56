//! Error taxonomy for loading schemas and processing deposit documents.
//!
//! Only [`SchemaLoadError`] is fatal (startup). The other errors describe a
//! single document and are turned into a persisted status by the pipeline.

use std::fmt;

/// The XML text is not well-formed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}, line {line}")]
pub struct XmlParseError {
    /// 1-based line where the parser gave up.
    pub line: usize,
    pub message: String,
}

impl XmlParseError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// The schema document could not be read or compiled.
#[derive(Debug, thiserror::Error)]
pub enum SchemaLoadError {
    #[error("Failed to read schema {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema is not well-formed: {0}")]
    Parse(#[from] XmlParseError),

    /// libxml2 refused to compile the schema.
    #[error("Invalid schema: {0}")]
    Invalid(String),
}

/// One schema conformance failure, located by line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, line {}", self.message, self.line)
    }
}

/// The document does not conform to the schema.
///
/// Carries every violation found in document order; never empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct SchemaViolation {
    pub violations: Vec<Violation>,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

/// The metadata rewriter could not apply the configured identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    #[error("Element '{{{namespace}}}{name}' not found in document")]
    MissingElement {
        namespace: String,
        name: &'static str,
    },

    #[error("Failed to set the text of '{name}': {message}")]
    Content { name: &'static str, message: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
