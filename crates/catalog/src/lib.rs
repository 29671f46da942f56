//! Catalog access: the source of deposit documents and their XML.
//!
//! [`CatalogProvider`] is the seam the pipeline depends on;
//! [`ArticleMetaClient`] implements it over the ArticleMeta REST API.

pub mod articlemeta;
pub mod provider;

pub use articlemeta::ArticleMetaClient;
pub use provider::{CatalogProvider, DocumentFormat, DocumentQuery, DocumentRecord, FetchError};
