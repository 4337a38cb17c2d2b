//! Core data models for the scholarly search client.
//!
//! This module contains the article metadata shown on a result page, the
//! page itself, and the sectioned summary of a single paper. The response
//! envelopes accept every shape the remote API is known to produce (a bare
//! object where a list is expected, the raw Atom-feed envelope) and normalize
//! them before anything else in the crate sees them.

use serde::{Deserialize, Deserializer, Serialize};

/// A value the API reports either as a single item or as a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Deserialize a field that may be absent, null, a single value or a list.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<OneOrMany<T>>::deserialize(deserializer)?;
    Ok(value.map(OneOrMany::into_vec).unwrap_or_default())
}

/// Collapses runs of whitespace (including the line breaks arXiv puts in
/// titles) into single spaces and trims the ends.
///
/// # Example
/// ```ignore
/// assert_eq!(collapse_whitespace("  Graph\n   Networks "), "Graph Networks");
/// ```
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A single author of an article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    /// Full name as reported by the API
    pub name: String,
}

/// Metadata for one article in a result page.
///
/// Read-only and sourced verbatim from the API response, apart from the
/// normalizations applied during deserialization: a bare author object becomes
/// a one-element list, the PDF link is recovered from the entry's link list when
/// the API does not report it directly, and the title has its whitespace
/// collapsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "RawArticle")]
pub struct ArticleSummary {
    /// Stable external identifier, usually the abstract page URL
    pub id: String,

    /// Link to the PDF, used as the summarization key
    #[serde(rename = "pdf", skip_serializing_if = "Option::is_none")]
    pub pdf_link: Option<String>,

    /// Article title
    pub title: String,

    /// Authors in publication order
    #[serde(rename = "author")]
    pub authors: Vec<Author>,

    /// Abstract text
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// Submission timestamp (ISO 8601)
    #[serde(rename = "published")]
    pub published_at: String,

    /// Last update timestamp (ISO 8601)
    #[serde(rename = "updated", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ArticleSummary {
    /// The trailing path segment of `id` (e.g. `2401.01234v1`).
    pub fn short_id(&self) -> &str {
        self.id
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.id)
    }

    /// Author names joined with `", "`.
    pub fn author_names(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Date part of the submission timestamp.
    pub fn published_date(&self) -> &str {
        date_part(&self.published_at)
    }

    /// Date part of the update timestamp, if any.
    pub fn updated_date(&self) -> Option<&str> {
        self.updated_at.as_deref().map(date_part)
    }
}

fn date_part(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or(timestamp)
}

/// Wire shape of an article, before normalization.
#[derive(Debug, Deserialize)]
struct RawArticle {
    id: String,

    #[serde(default, alias = "pdf_link")]
    pdf: Option<String>,

    #[serde(default)]
    title: String,

    #[serde(default, alias = "authors", deserialize_with = "one_or_many")]
    author: Vec<Author>,

    #[serde(default, rename = "abstract", alias = "summary")]
    abstract_text: Option<String>,

    #[serde(default)]
    published: Option<String>,

    #[serde(default)]
    updated: Option<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    link: Vec<RawLink>,
}

/// An Atom `<link>` element as converted to JSON by the API.
#[derive(Debug, Deserialize)]
struct RawLink {
    #[serde(rename = "@href", alias = "href")]
    href: String,

    #[serde(default, rename = "@title", alias = "title")]
    title: Option<String>,
}

impl From<RawArticle> for ArticleSummary {
    fn from(raw: RawArticle) -> Self {
        let pdf_link = raw
            .pdf
            .filter(|link| !link.trim().is_empty())
            .or_else(|| {
                raw.link
                    .into_iter()
                    .find(|link| link.title.as_deref() == Some("pdf"))
                    .map(|link| link.href)
            });

        let title = collapse_whitespace(&raw.title);

        Self {
            id: raw.id,
            pdf_link,
            title: if title.is_empty() {
                "Untitled".to_string()
            } else {
                title
            },
            authors: raw.author,
            abstract_text: raw
                .abstract_text
                .map(|text| text.trim().to_string())
                .unwrap_or_default(),
            published_at: raw.published.unwrap_or_default(),
            updated_at: raw.updated.filter(|u| !u.is_empty()),
        }
    }
}

/// One page of search results plus the total match count.
///
/// Produced by the result fetcher and owned by the controller; a page is
/// replaced wholesale by the next successful fetch, never merged.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResultPage {
    /// Articles on this page, in the order the API returned them
    pub items: Vec<ArticleSummary>,

    /// Total number of matches across all pages (0 when not reported)
    pub total_count: u64,

    /// Remote offset this page was requested with
    pub offset: u64,

    /// Page size this page was requested with
    pub page_size: u32,
}

impl ResultPage {
    /// Whether the page carries no articles.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of pages needed to show `total_count` results,
    /// `ceil(total_count / page_size)`.
    pub fn page_count(&self) -> u64 {
        page_count(self.total_count, self.page_size)
    }
}

/// `ceil(total / page_size)`, or 0 when either side is 0.
pub fn page_count(total: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size))
}

/// Response body of the search endpoints.
///
/// The canonical shape is `{ "arxiv": [..] | {..}, "totalResults": n }`; the raw
/// Atom-feed envelope `{ "arxiv": { "feed": { "entry": .., "opensearch:totalResults": .. } } }`
/// is accepted as well.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    arxiv: Option<ArxivPayload>,

    #[serde(default, rename = "totalResults", alias = "total_results")]
    total_results: Option<TotalResults>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ArxivPayload {
    Feed { feed: AtomFeed },
    Many(Vec<ArticleSummary>),
    One(ArticleSummary),
}

#[derive(Debug, Clone, Deserialize)]
struct AtomFeed {
    #[serde(default, deserialize_with = "one_or_many")]
    entry: Vec<ArticleSummary>,

    #[serde(default, rename = "opensearch:totalResults")]
    total_results: Option<TotalResults>,
}

/// A result count as a number, a numeric string, or an XML text node.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TotalResults {
    Count(u64),
    Text(String),
    Node {
        #[serde(rename = "#text")]
        text: String,
    },
}

impl TotalResults {
    fn value(&self) -> Option<u64> {
        match self {
            TotalResults::Count(n) => Some(*n),
            TotalResults::Text(text) | TotalResults::Node { text } => text.trim().parse().ok(),
        }
    }
}

impl SearchResponse {
    /// Split into the normalized item list and the total count.
    ///
    /// A single article is wrapped into a one-element list and a missing count
    /// defaults to 0.
    pub fn into_parts(self) -> (Vec<ArticleSummary>, u64) {
        let mut total = self.total_results.as_ref().and_then(TotalResults::value);

        let items = match self.arxiv {
            None => Vec::new(),
            Some(ArxivPayload::Many(items)) => items,
            Some(ArxivPayload::One(item)) => vec![item],
            Some(ArxivPayload::Feed { feed }) => {
                if total.is_none() {
                    total = feed.total_results.as_ref().and_then(TotalResults::value);
                }
                feed.entry
            }
        };

        (items, total.unwrap_or(0))
    }
}

/// One headed section of a generated summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummarySection {
    /// Section heading (e.g. "Methods")
    pub header: String,

    /// Markdown body
    #[serde(rename = "summary", alias = "body")]
    pub body: String,
}

/// Response body of the summarization endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryResponse {
    /// Sections in document order
    #[serde(default, deserialize_with = "one_or_many")]
    pub summary: Vec<SummarySection>,
}

/// Lifecycle status of a summary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    /// Nothing requested yet
    Ready,
    /// A request is in flight
    Generating,
    /// Sections are available
    Done,
    /// The last request failed
    Error,
}

/// The summary of one document together with its status.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SummaryResult {
    /// Title of the summarized document
    pub document_title: String,

    /// Generated sections (empty unless `status` is `Done`)
    pub sections: Vec<SummarySection>,

    /// Current status
    pub status: SummaryStatus,
}

impl SummaryResult {
    /// A finished summary.
    pub fn done(document_title: impl Into<String>, sections: Vec<SummarySection>) -> Self {
        Self {
            document_title: document_title.into(),
            sections,
            status: SummaryStatus::Done,
        }
    }
}
