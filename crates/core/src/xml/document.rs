//! Deposit documents, parsed and serialized by libxml2.
//!
//! libxml2 reads the encoding named in the XML declaration, so catalogs that
//! export Latin-1 documents are handled as they are. Serialization is always
//! UTF-8.

use std::ffi::CStr;
use std::fmt;

use libxml::bindings;
use libxml::parser::{Parser, ParserOptions};
use libxml::tree::{Document, Node, SaveOptions};

use crate::error::XmlParseError;

/// A well-formed XML document.
pub struct XmlDocument {
    doc: Document,
}

impl fmt::Debug for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlDocument")
            .field("root", &self.root_name())
            .finish_non_exhaustive()
    }
}

impl XmlDocument {
    pub fn parse(text: &str) -> Result<Self, XmlParseError> {
        Self::parse_bytes(text.as_bytes())
    }

    /// Parse raw bytes in whatever encoding they declare.
    ///
    /// Not recovering: the first well-formedness error fails the parse and
    /// is reported with its line. Entities are never fetched over the
    /// network.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, XmlParseError> {
        let options = ParserOptions {
            recover: false,
            no_net: true,
            ..ParserOptions::default()
        };

        reset_last_error();
        match Parser::default().parse_string_with_options(bytes, options) {
            Ok(doc) => Ok(Self { doc }),
            Err(e) => Err(last_error()
                .unwrap_or_else(|| XmlParseError::new(0, format!("Document is not well-formed ({e:?})")))),
        }
    }

    /// Local name of the root element.
    pub fn root_name(&self) -> Option<String> {
        self.doc.get_root_element().map(|root| root.get_name())
    }

    /// Value of an attribute on the root element.
    pub fn root_attribute(&self, name: &str) -> Option<String> {
        self.doc.get_root_element()?.get_property(name)
    }

    /// Text of the first element named `name` in `namespace`, in document
    /// order. `None` matches elements in no namespace.
    pub fn find_text(&self, namespace: Option<&str>, name: &str) -> Option<String> {
        self.find(namespace, name).map(|node| node.get_content())
    }

    pub(crate) fn find(&self, namespace: Option<&str>, name: &str) -> Option<Node> {
        let root = self.doc.get_root_element()?;
        first_match(&root, namespace, name)
    }

    /// Indented UTF-8 serialization, with the XML declaration.
    pub fn to_pretty_string(&self) -> String {
        self.doc.to_string_with_options(SaveOptions {
            format: true,
            ..SaveOptions::default()
        })
    }

    pub(crate) fn as_libxml(&self) -> &Document {
        &self.doc
    }
}

fn first_match(node: &Node, namespace: Option<&str>, name: &str) -> Option<Node> {
    let href = node.get_namespace().map(|ns| ns.get_href());
    if node.get_name() == name && href.as_deref() == namespace {
        return Some(node.clone());
    }
    node.get_child_elements()
        .iter()
        .find_map(|child| first_match(child, namespace, name))
}

fn reset_last_error() {
    // SAFETY: clears libxml2's per-thread error record.
    unsafe { bindings::xmlResetLastError() }
}

/// The error libxml2 recorded for the failed parse on this thread.
fn last_error() -> Option<XmlParseError> {
    // SAFETY: `xmlGetLastError` returns null or a pointer to the per-thread
    // error record, which stays valid until the next libxml2 call here. The
    // message is copied out before returning.
    unsafe {
        let error = bindings::xmlGetLastError();
        if error.is_null() || (*error).message.is_null() {
            return None;
        }
        let message = CStr::from_ptr((*error).message)
            .to_string_lossy()
            .trim_end()
            .to_string();
        let line = usize::try_from((*error).line).unwrap_or_default();
        Some(XmlParseError::new(line, message))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
