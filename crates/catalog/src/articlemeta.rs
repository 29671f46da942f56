//! REST client for the ArticleMeta catalog.
//!
//! Documents are looked up by `(code, collection)`; listings are paged
//! through the identifiers endpoint and resolved one document at a time.

use futures::stream::{self, BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::provider::{CatalogProvider, DocumentFormat, DocumentQuery, DocumentRecord, FetchError};

pub const DEFAULT_BASE_URL: &str = "http://articlemeta.scielo.org";

/// HTTP client for one ArticleMeta deployment.
pub struct ArticleMetaClient {
    client: reqwest::Client,
    base_url: String,
}

// ---- wire types ----

#[derive(Debug, Deserialize)]
struct ArticleResponse {
    code: String,
    collection: String,
    #[serde(default)]
    doi: Option<String>,
    #[serde(default)]
    article: Option<ArticleFields>,
}

/// Legacy ISIS fields; `v237` holds the DOI in older records.
#[derive(Debug, Default, Deserialize)]
struct ArticleFields {
    #[serde(default)]
    v237: Vec<Subfield>,
}

#[derive(Debug, Deserialize)]
struct Subfield {
    #[serde(rename = "_")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct IdentifiersPage {
    meta: PageMeta,
    #[serde(default)]
    objects: Vec<Identifier>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    total: u64,
    limit: u64,
    #[serde(default)]
    offset: u64,
}

#[derive(Debug, Deserialize)]
struct Identifier {
    code: String,
    collection: String,
}

impl ArticleResponse {
    fn into_record(self) -> DocumentRecord {
        let legacy_doi = self
            .article
            .and_then(|fields| fields.v237.into_iter().next())
            .map(|subfield| subfield.value);
        let doi = self
            .doi
            .filter(|doi| !doi.trim().is_empty())
            .or(legacy_doi)
            .map(|doi| doi.trim().to_string())
            .filter(|doi| !doi.is_empty());
        DocumentRecord {
            collection_acronym: self.collection,
            publisher_id: self.code,
            doi,
        }
    }
}

impl IdentifiersPage {
    /// Offset of the following page, if there is one.
    fn next_offset(&self) -> Option<u64> {
        if self.objects.is_empty() || self.meta.limit == 0 {
            return None;
        }
        let next = self.meta.offset.checked_add(self.meta.limit)?;
        (next < self.meta.total).then_some(next)
    }
}

impl ArticleMetaClient {
    /// Create a client for an ArticleMeta deployment.
    ///
    /// * `base_url` - e.g. `http://articlemeta.scielo.org`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn article_url(&self) -> String {
        format!("{}/api/v1/article/", self.base_url)
    }

    fn identifiers_url(&self) -> String {
        format!("{}/api/v1/article/identifiers/", self.base_url)
    }

    async fn identifiers_page(
        &self,
        query: &DocumentQuery,
        offset: u64,
    ) -> Result<IdentifiersPage, FetchError> {
        let mut params = vec![
            ("collection", query.collection.clone()),
            ("from", query.from_date.format("%Y-%m-%d").to_string()),
            ("until", query.until_date.format("%Y-%m-%d").to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(issn) = &query.issn {
            params.push(("issn", issn.clone()));
        }

        tracing::debug!(collection = %query.collection, issn = ?query.issn, offset, "Listing catalog identifiers");
        let response = self
            .client
            .get(self.identifiers_url())
            .query(&params)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Return the response unchanged on a success status, or an
    /// [`FetchError::Api`] carrying the status and body text.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(FetchError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FetchError> {
        let body = Self::ensure_success(response).await?.text().await?;
        decode(&body)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))
}

impl CatalogProvider for ArticleMetaClient {
    async fn get_document(
        &self,
        publisher_id: &str,
        collection: &str,
    ) -> Result<DocumentRecord, FetchError> {
        let response = self
            .client
            .get(self.article_url())
            .query(&[("code", publisher_id), ("collection", collection)])
            .send()
            .await?;

        // A missing document comes back as a JSON `null`.
        let article: Option<ArticleResponse> = Self::parse_response(response).await?;
        article.map(ArticleResponse::into_record).ok_or_else(|| {
            FetchError::Decode(format!(
                "document {publisher_id} not found in collection {collection}"
            ))
        })
    }

    async fn get_document_xml(
        &self,
        publisher_id: &str,
        collection: &str,
        format: DocumentFormat,
    ) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(self.article_url())
            .query(&[
                ("code", publisher_id),
                ("collection", collection),
                ("format", format.as_str()),
            ])
            .send()
            .await?;

        let body = Self::ensure_success(response).await?.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(FetchError::Decode(format!(
                "empty {} document for {publisher_id}",
                format.as_str()
            )));
        }
        Ok(body.to_vec())
    }

    fn list_documents<'a>(
        &'a self,
        query: &'a DocumentQuery,
    ) -> BoxStream<'a, Result<DocumentRecord, FetchError>> {
        let pages = stream::unfold(Some(0u64), move |offset| async move {
            let offset = offset?;
            match self.identifiers_page(query, offset).await {
                Ok(page) => {
                    let next = page.next_offset();
                    let ids: Vec<Result<Identifier, FetchError>> =
                        page.objects.into_iter().map(Ok).collect();
                    Some((ids, next))
                }
                // Yield the failure, then stop listing.
                Err(e) => Some((vec![Err(e)], None)),
            }
        });

        pages
            .flat_map(stream::iter)
            .then(move |id| async move {
                let id = id?;
                self.get_document(&id.code, &id.collection).await
            })
            .boxed()
    }
}
