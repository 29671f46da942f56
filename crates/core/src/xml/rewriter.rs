//! Depositor identity rewriting.
//!
//! The registration agency requires the registrant and depositor fields of
//! the batch head to carry the operator's identity, whatever the catalog
//! exported. The rewrite happens before schema validation.

use crate::error::RewriteError;
use crate::xml::document::XmlDocument;

/// Rewrites `registrant`, `depositor_name` and `email_address` in place.
#[derive(Debug, Clone)]
pub struct MetadataRewriter {
    namespace: String,
    depositor_name: Option<String>,
    depositor_email: Option<String>,
}

impl MetadataRewriter {
    /// Empty values are treated as unset.
    pub fn new(
        namespace: impl Into<String>,
        depositor_name: Option<String>,
        depositor_email: Option<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            depositor_name: depositor_name.filter(|v| !v.is_empty()),
            depositor_email: depositor_email.filter(|v| !v.is_empty()),
        }
    }

    /// A rewriter that leaves documents untouched.
    pub fn disabled(namespace: impl Into<String>) -> Self {
        Self::new(namespace, None, None)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Apply the configured identity to `doc`.
    ///
    /// Fails if a configured value has no element to land in; elements
    /// before the failing one may already have been rewritten.
    pub fn apply<'d>(&self, doc: &'d mut XmlDocument) -> Result<&'d mut XmlDocument, RewriteError> {
        if let Some(name) = &self.depositor_name {
            self.set_text(doc, "registrant", name)?;
            self.set_text(doc, "depositor_name", name)?;
        }
        if let Some(email) = &self.depositor_email {
            self.set_text(doc, "email_address", email)?;
        }
        Ok(doc)
    }

    fn set_text(
        &self,
        doc: &mut XmlDocument,
        element: &'static str,
        value: &str,
    ) -> Result<(), RewriteError> {
        let mut target = doc
            .find(Some(self.namespace.as_str()), element)
            .ok_or_else(|| RewriteError::MissingElement {
                namespace: self.namespace.clone(),
                name: element,
            })?;
        target
            .set_content(value)
            .map_err(|e| RewriteError::Content {
                name: element,
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const NS: &str = "http://www.crossref.org/schema/4.4.0";

    const HEAD: &str = r#"<doi_batch xmlns="http://www.crossref.org/schema/4.4.0">
  <head>
    <doi_batch_id>b1</doi_batch_id>
    <depositor>
      <depositor_name/>
      <email_address>old@example.org</email_address>
    </depositor>
    <registrant/>
  </head>
</doi_batch>"#;

    fn text_of(doc: &XmlDocument, name: &str) -> String {
        doc.find_text(Some(NS), name).unwrap()
    }

    #[test]
    fn sets_registrant_and_depositor_name() {
        let mut doc = XmlDocument::parse(HEAD).unwrap();
        let rewriter = MetadataRewriter::new(NS, Some("SciELO".to_string()), None);
        rewriter.apply(&mut doc).unwrap();

        assert_eq!(text_of(&doc, "registrant"), "SciELO");
        assert_eq!(text_of(&doc, "depositor_name"), "SciELO");
        assert_eq!(text_of(&doc, "email_address"), "old@example.org");
    }

    #[test]
    fn sets_email_address() {
        let mut doc = XmlDocument::parse(HEAD).unwrap();
        let rewriter = MetadataRewriter::new(NS, None, Some("doi@scielo.org".to_string()));
        rewriter.apply(&mut doc).unwrap();

        assert_eq!(text_of(&doc, "email_address"), "doi@scielo.org");
        assert_eq!(text_of(&doc, "registrant"), "");
    }

    #[test]
    fn markup_characters_are_kept_as_text() {
        let mut doc = XmlDocument::parse(HEAD).unwrap();
        let rewriter = MetadataRewriter::new(NS, Some("Scientific <Electronic> Library".to_string()), None);
        rewriter.apply(&mut doc).unwrap();

        assert_eq!(text_of(&doc, "registrant"), "Scientific <Electronic> Library");
        let reparsed = XmlDocument::parse(&doc.to_pretty_string()).unwrap();
        assert_eq!(text_of(&reparsed, "depositor_name"), "Scientific <Electronic> Library");
    }

    #[test]
    fn empty_values_are_ignored() {
        let mut doc = XmlDocument::parse("<doi_batch/>").unwrap();
        let rewriter = MetadataRewriter::new(NS, Some(String::new()), Some(String::new()));
        assert!(rewriter.apply(&mut doc).is_ok());
    }

    #[test]
    fn missing_element_fails_loudly() {
        let mut doc = XmlDocument::parse(
            r#"<doi_batch xmlns="http://www.crossref.org/schema/4.4.0"><head><registrant/></head></doi_batch>"#,
        )
        .unwrap();
        let rewriter = MetadataRewriter::new(NS, Some("SciELO".to_string()), None);
        assert_matches!(
            rewriter.apply(&mut doc),
            Err(RewriteError::MissingElement { name: "depositor_name", .. })
        );
    }

    #[test]
    fn elements_outside_the_namespace_are_not_matched() {
        let mut doc =
            XmlDocument::parse("<doi_batch><head><registrant/><depositor_name/></head></doi_batch>")
                .unwrap();
        let rewriter = MetadataRewriter::new(NS, Some("SciELO".to_string()), None);
        assert_matches!(
            rewriter.apply(&mut doc),
            Err(RewriteError::MissingElement { name: "registrant", .. })
        );
    }
}
