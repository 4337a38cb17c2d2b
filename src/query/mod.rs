//! Search intent and its URL encoding.
//!
//! A [`QueryState`] is the canonical, immutable representation of what the
//! user is searching for: one or two keyword terms, the sort, and the page.
//! It is created either from the query string of a results URL
//! ([`QueryState::parse`]) or from a submitted search form
//! ([`form::AdvancedSearchForm`]), and every change produces a new state.
//!
//! # Usage
//!
//! ```rust
//! use scholarly_search::query::{QueryState, SearchMode, SortBy, SortOrder};
//!
//! let state = QueryState::parse("all=graph+neural+networks").unwrap();
//! assert_eq!(state.mode(), SearchMode::Simple);
//! assert_eq!(state.sort_by(), SortBy::Relevance);
//! assert_eq!(state.sort_order(), SortOrder::Descending);
//!
//! let next = state.with_page(3).unwrap();
//! assert_eq!(
//!     next.to_query_string(),
//!     "all=graph+neural+networks&sort_by=relevance&sort_order=descending&page=3"
//! );
//! ```

pub mod form;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, warn};
use url::form_urlencoded;

/// Number of results per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Errors produced while building or transforming a query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryError {
    /// Malformed or incomplete user input, reported against a form field
    #[error("Invalid {field}: {message}")]
    ParseError {
        /// Form field the error belongs to (e.g. `keyword1`)
        field: String,
        /// Human-readable reason
        message: String,
    },

    /// Page numbers start at 1
    #[error("Invalid page: {0} (pages start at 1)")]
    InvalidPage(i64),

    /// A field name no form control maps to
    #[error("Unknown query field: {0}")]
    UnknownField(String),
}

impl QueryError {
    fn parse(field: &str, message: impl Into<String>) -> Self {
        QueryError::ParseError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    fn blank_keyword() -> Self {
        Self::parse("keyword1", "a search keyword is required")
    }

    fn all_in_advanced(field: &str) -> Self {
        Self::parse(field, "`all` cannot be combined with a field-specific search")
    }
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Search field a keyword is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefix {
    All,
    Title,
    Author,
    Abstract,
    Comment,
    JournalReference,
    ReportNumber,
    IdList,
    SubjectCategory,
}

impl Prefix {
    /// Every prefix, in the order the search form lists them (`All` last).
    pub const VALUES: [Prefix; 9] = [
        Prefix::Title,
        Prefix::Author,
        Prefix::Abstract,
        Prefix::Comment,
        Prefix::JournalReference,
        Prefix::ReportNumber,
        Prefix::IdList,
        Prefix::SubjectCategory,
        Prefix::All,
    ];

    /// The query-parameter name for this prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Prefix::All => "all",
            Prefix::Title => "title",
            Prefix::Author => "author",
            Prefix::Abstract => "abstract",
            Prefix::Comment => "comment",
            Prefix::JournalReference => "journal_reference",
            Prefix::ReportNumber => "report_number",
            Prefix::IdList => "id_list",
            Prefix::SubjectCategory => "subject_category",
        }
    }

    /// Label shown next to the prefix selector.
    pub fn label(&self) -> &'static str {
        match self {
            Prefix::All => "All",
            Prefix::Title => "Title",
            Prefix::Author => "Author",
            Prefix::Abstract => "Abstract",
            Prefix::Comment => "Comment",
            Prefix::JournalReference => "Journal Reference",
            Prefix::ReportNumber => "Report Number",
            Prefix::IdList => "arXiv Id",
            Prefix::SubjectCategory => "Subject Category",
        }
    }
}

impl FromStr for Prefix {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Prefix::VALUES
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| QueryError::parse("prefix", format!("unknown prefix `{}`", s)))
    }
}

/// How the second term is joined to the first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BooleanOperator {
    #[default]
    And,
    Or,
    AndNot,
}

impl BooleanOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BooleanOperator::And => "AND",
            BooleanOperator::Or => "OR",
            BooleanOperator::AndNot => "ANDNOT",
        }
    }
}

impl FromStr for BooleanOperator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(BooleanOperator::And),
            "OR" => Ok(BooleanOperator::Or),
            "ANDNOT" | "AND NOT" => Ok(BooleanOperator::AndNot),
            _ => Err(QueryError::parse(
                "boolean_operator",
                format!("expected AND, OR or ANDNOT, got `{}`", s),
            )),
        }
    }
}

/// Result ordering criterion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortBy {
    #[default]
    Relevance,
    SubmittedDate,
    LastUpdatedDate,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::SubmittedDate => "submittedDate",
            SortBy::LastUpdatedDate => "lastUpdatedDate",
        }
    }
}

impl FromStr for SortBy {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relevance" => Ok(SortBy::Relevance),
            "submittedDate" => Ok(SortBy::SubmittedDate),
            "lastUpdatedDate" => Ok(SortBy::LastUpdatedDate),
            _ => Err(QueryError::parse(
                "sort_by",
                format!("expected relevance, submittedDate or lastUpdatedDate, got `{}`", s),
            )),
        }
    }
}

/// Result ordering direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascending" => Ok(SortOrder::Ascending),
            "descending" => Ok(SortOrder::Descending),
            _ => Err(QueryError::parse(
                "sort_order",
                format!("expected ascending or descending, got `{}`", s),
            )),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Prefix, BooleanOperator, SortBy, SortOrder);

/// Whether the query targets the one-term or the multi-term endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    Simple,
    Advanced,
}

/// A keyword matched against one search field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchTerm {
    /// Field to search in
    pub prefix: Prefix,

    /// Trimmed keyword, never blank inside a [`QueryState`]
    pub keyword: String,
}

impl SearchTerm {
    /// Create a term; the keyword is trimmed.
    pub fn new(prefix: Prefix, keyword: impl AsRef<str>) -> Self {
        Self {
            prefix,
            keyword: keyword.as_ref().trim().to_string(),
        }
    }

    fn is_blank(&self) -> bool {
        self.keyword.is_empty()
    }
}

/// A single edit coming from a form control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryField {
    PrimaryPrefix(Prefix),
    PrimaryKeyword(String),
    SecondaryPrefix(Prefix),
    SecondaryKeyword(String),
    Operator(BooleanOperator),
    SortBy(SortBy),
    SortOrder(SortOrder),
}

impl QueryField {
    /// Map a form control name and its raw value to an edit.
    ///
    /// Names follow the advanced search form: `prefix1`, `keyword1`,
    /// `prefix2`, `keyword2`, `boolean_operator`, `sort_by`, `sort_order`.
    pub fn from_name_value(name: &str, value: &str) -> QueryResult<Self> {
        Ok(match name {
            "prefix1" => QueryField::PrimaryPrefix(value.parse()?),
            "keyword1" => QueryField::PrimaryKeyword(value.to_string()),
            "prefix2" => QueryField::SecondaryPrefix(value.parse()?),
            "keyword2" => QueryField::SecondaryKeyword(value.to_string()),
            "boolean_operator" | "operator" => QueryField::Operator(value.parse()?),
            "sort_by" | "sortBy" => QueryField::SortBy(value.parse()?),
            "sort_order" | "orderBy" => QueryField::SortOrder(value.parse()?),
            other => return Err(QueryError::UnknownField(other.to_string())),
        })
    }
}

/// Canonical representation of the current search intent.
///
/// Invariants: the primary keyword is non-blank; a secondary term exists only
/// with a non-blank keyword; `all` never shares a query with a second term;
/// `page >= 1`. The [`SearchMode`] follows from the terms: a lone `all` term
/// is a simple search, anything else is advanced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryState {
    primary: SearchTerm,
    secondary: Option<SearchTerm>,
    operator: BooleanOperator,
    sort_by: SortBy,
    sort_order: SortOrder,
    page: u32,
    page_size: u32,
}

impl QueryState {
    /// A one-term query across all fields.
    pub fn simple(keyword: impl AsRef<str>) -> QueryResult<Self> {
        Self::from_terms(SearchTerm::new(Prefix::All, keyword), BooleanOperator::And, None)
    }

    /// A query against specific fields. A blank secondary term is dropped.
    ///
    /// Fails when a term uses [`Prefix::All`]; field-specific searches cannot
    /// include it.
    pub fn advanced(
        primary: SearchTerm,
        operator: BooleanOperator,
        secondary: Option<SearchTerm>,
    ) -> QueryResult<Self> {
        if primary.prefix == Prefix::All {
            return Err(QueryError::all_in_advanced("prefix1"));
        }
        Self::from_terms(primary, operator, secondary)
    }

    /// Build from terms, deriving the mode. Used by the search form.
    pub(crate) fn from_terms(
        primary: SearchTerm,
        operator: BooleanOperator,
        secondary: Option<SearchTerm>,
    ) -> QueryResult<Self> {
        if primary.is_blank() {
            return Err(QueryError::blank_keyword());
        }
        let state = Self {
            primary,
            secondary: secondary.filter(|t| !t.is_blank()),
            operator,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        };
        state.check_prefixes()?;
        Ok(state)
    }

    fn check_prefixes(&self) -> QueryResult<()> {
        match &self.secondary {
            Some(_) if self.primary.prefix == Prefix::All => Err(QueryError::all_in_advanced("prefix1")),
            Some(term) if term.prefix == Prefix::All => Err(QueryError::all_in_advanced("prefix2")),
            _ => Ok(()),
        }
    }

    /// Build a state from a results-view query string (leading `?` optional).
    ///
    /// Term parameters are taken in order of appearance: the first is the
    /// primary term, the first non-blank one after it the secondary term.
    /// A blank primary keyword is an error, and so is `all` next to a second
    /// term. Unrecognized sort values and page numbers fall back to their
    /// defaults. The `start`/`max_results` pair written by older links is
    /// converted into a page.
    pub fn parse(raw: &str) -> QueryResult<Self> {
        let raw = raw.trim();
        let raw = raw.strip_prefix('?').unwrap_or(raw);

        let mut terms: Vec<SearchTerm> = Vec::new();
        let mut operator: Option<String> = None;
        let mut sort_by: Option<String> = None;
        let mut sort_order: Option<String> = None;
        let mut page: Option<String> = None;
        let mut start: Option<String> = None;
        let mut max_results: Option<String> = None;

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            let slot = match key.as_ref() {
                "boolean_operator" => &mut operator,
                "sort_by" => &mut sort_by,
                "sort_order" => &mut sort_order,
                "page" => &mut page,
                "start" => &mut start,
                "max_results" => &mut max_results,
                name => {
                    match name.parse::<Prefix>() {
                        Ok(prefix) => terms.push(SearchTerm::new(prefix, value)),
                        Err(_) => debug!(param = name, "Ignoring unrecognized query parameter"),
                    }
                    continue;
                }
            };
            slot.get_or_insert_with(|| value.into_owned());
        }

        let mut terms = terms.into_iter();
        let primary = match terms.next() {
            Some(term) if !term.is_blank() => term,
            _ => return Err(QueryError::blank_keyword()),
        };
        let mut rest = terms.filter(|t| !t.is_blank());
        let secondary = rest.next();
        let surplus = rest.count();
        if surplus > 0 {
            warn!(surplus, "Only two search terms are supported; ignoring the rest");
        }

        let mut state = Self::from_terms(
            primary,
            lenient(operator.as_deref(), "boolean_operator"),
            secondary,
        )?;
        state.sort_by = lenient(sort_by.as_deref(), "sort_by");
        state.sort_order = lenient(sort_order.as_deref(), "sort_order");
        state.page = resolve_page(page.as_deref(), start.as_deref(), max_results.as_deref());
        Ok(state)
    }

    /// Apply a single form edit, returning the new state.
    ///
    /// Clearing the secondary keyword removes the second term. Edits that
    /// would put `all` next to a second term are rejected. The receiver is
    /// never modified.
    pub fn with_field(&self, field: QueryField) -> QueryResult<Self> {
        let mut next = self.clone();
        match field {
            QueryField::PrimaryPrefix(prefix) => next.primary.prefix = prefix,
            QueryField::PrimaryKeyword(keyword) => {
                let term = SearchTerm::new(next.primary.prefix, keyword);
                if term.is_blank() {
                    return Err(QueryError::blank_keyword());
                }
                next.primary = term;
            }
            QueryField::SecondaryPrefix(prefix) => match next.secondary.as_mut() {
                Some(term) => term.prefix = prefix,
                None => debug!(%prefix, "No second term to apply the prefix to"),
            },
            QueryField::SecondaryKeyword(keyword) => {
                let prefix = next
                    .secondary
                    .as_ref()
                    .map(|t| t.prefix)
                    .unwrap_or(Prefix::Title);
                let term = SearchTerm::new(prefix, keyword);
                next.secondary = Some(term).filter(|t| !t.is_blank());
            }
            QueryField::Operator(operator) => next.operator = operator,
            QueryField::SortBy(sort_by) => next.sort_by = sort_by,
            QueryField::SortOrder(sort_order) => next.sort_order = sort_order,
        }
        next.check_prefixes()?;
        Ok(next)
    }

    /// The same query on page `n`.
    pub fn with_page(&self, n: i64) -> QueryResult<Self> {
        let page = u32::try_from(n)
            .ok()
            .filter(|p| *p >= 1)
            .ok_or(QueryError::InvalidPage(n))?;
        Ok(Self {
            page,
            ..self.clone()
        })
    }

    /// The same query on page 1.
    pub fn first_page(&self) -> Self {
        Self {
            page: 1,
            ..self.clone()
        }
    }

    /// The same query with a different sort; the page is kept.
    pub fn with_sort(&self, sort_by: SortBy, sort_order: SortOrder) -> Self {
        Self {
            sort_by,
            sort_order,
            ..self.clone()
        }
    }

    /// The same query with a different page size (values below 1 become 1).
    pub fn with_page_size(&self, page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            ..self.clone()
        }
    }

    /// Canonical query string.
    ///
    /// Field order is fixed: primary term, `boolean_operator` (advanced mode,
    /// or a non-default operator), secondary term, `sort_by`, `sort_order`,
    /// `page`. Spaces are encoded as `+`.
    pub fn to_query_string(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        out.append_pair(self.primary.prefix.as_str(), &self.primary.keyword);
        if self.mode() == SearchMode::Advanced || self.operator != BooleanOperator::default() {
            out.append_pair("boolean_operator", self.operator.as_str());
        }
        if let Some(term) = &self.secondary {
            out.append_pair(term.prefix.as_str(), &term.keyword);
        }
        out.append_pair("sort_by", self.sort_by.as_str());
        out.append_pair("sort_order", self.sort_order.as_str());
        out.append_pair("page", &self.page.to_string());
        out.finish()
    }

    /// `Simple` for a lone `all` term, `Advanced` otherwise.
    pub fn mode(&self) -> SearchMode {
        if self.secondary.is_none() && self.primary.prefix == Prefix::All {
            SearchMode::Simple
        } else {
            SearchMode::Advanced
        }
    }

    pub fn primary(&self) -> &SearchTerm {
        &self.primary
    }

    /// The second term and the operator joining it, if present.
    pub fn secondary(&self) -> Option<(BooleanOperator, &SearchTerm)> {
        self.secondary.as_ref().map(|t| (self.operator, t))
    }

    /// All terms in order.
    pub fn terms(&self) -> Vec<&SearchTerm> {
        std::iter::once(&self.primary)
            .chain(self.secondary.as_ref())
            .collect()
    }

    pub fn operator(&self) -> BooleanOperator {
        self.operator
    }

    pub fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// 0-based index of the first result on this page.
    pub fn first_result_index(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:\"{}\"", self.primary.prefix, self.primary.keyword)?;
        if let Some((operator, term)) = self.secondary() {
            write!(f, " {} {}:\"{}\"", operator, term.prefix, term.keyword)?;
        }
        Ok(())
    }
}

/// Parse an optional raw value, falling back to the default when absent or invalid.
fn lenient<T>(raw: Option<&str>, name: &str) -> T
where
    T: FromStr + Default,
{
    match raw.map(str::trim) {
        None | Some("") => T::default(),
        Some(value) => value.parse().unwrap_or_else(|_| {
            warn!(param = name, value, "Unrecognized value, using default");
            T::default()
        }),
    }
}

fn resolve_page(page: Option<&str>, start: Option<&str>, max_results: Option<&str>) -> u32 {
    if let Some(raw) = page {
        match raw.trim().parse::<u32>() {
            Ok(n) if n >= 1 => return n,
            _ => warn!(value = raw, "Invalid page number, using page 1"),
        }
    }

    let start = start.and_then(|s| s.trim().parse::<u64>().ok());
    let size = max_results
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(u64::from(DEFAULT_PAGE_SIZE));
    match start {
        Some(start) => u32::try_from(start / size + 1).unwrap_or(u32::MAX),
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(raw: &str) {
        let first = QueryState::parse(raw).unwrap();
        let encoded = first.to_query_string();
        let second = QueryState::parse(&encoded).unwrap();
        assert_eq!(first, second, "round-trip of `{}` via `{}`", raw, encoded);
        assert_eq!(encoded, second.to_query_string());
    }

    #[test]
    fn test_parse_simple_defaults() {
        let state = QueryState::parse("?all=graph+neural+networks").unwrap();
        assert_eq!(state.mode(), SearchMode::Simple);
        assert_eq!(state.primary(), &SearchTerm::new(Prefix::All, "graph neural networks"));
        assert!(state.secondary().is_none());
        assert_eq!(state.sort_by(), SortBy::Relevance);
        assert_eq!(state.sort_order(), SortOrder::Descending);
        assert_eq!(state.page(), 1);
        assert_eq!(state.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_parse_advanced_from_form_url() {
        let raw = "sort_order=ascending&sort_by=submittedDate&start=0&max_results=10\
                   &title=attention&boolean_operator=ANDNOT&author=vaswani";
        let state = QueryState::parse(raw).unwrap();

        assert_eq!(state.mode(), SearchMode::Advanced);
        assert_eq!(state.primary(), &SearchTerm::new(Prefix::Title, "attention"));
        let (operator, second) = state.secondary().unwrap();
        assert_eq!(operator, BooleanOperator::AndNot);
        assert_eq!(second, &SearchTerm::new(Prefix::Author, "vaswani"));
        assert_eq!(state.sort_by(), SortBy::SubmittedDate);
        assert_eq!(state.sort_order(), SortOrder::Ascending);
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn test_mode_follows_terms_not_parameter_count() {
        let state = QueryState::parse("all=x&sort_by=relevance&sort_order=descending&start=0&max_results=5").unwrap();
        assert_eq!(state.mode(), SearchMode::Simple);

        // A single field-specific term is an advanced search.
        let state = QueryState::parse("title=x&sort_by=relevance&sort_order=descending").unwrap();
        assert_eq!(state.mode(), SearchMode::Advanced);
        assert_eq!(state.primary().prefix, Prefix::Title);
        assert!(state.secondary().is_none());
    }

    #[test]
    fn test_parse_fails_on_blank_primary() {
        assert!(matches!(
            QueryState::parse("all=%20%20"),
            Err(QueryError::ParseError { ref field, .. }) if field == "keyword1"
        ));
        assert!(QueryState::parse("sort_by=relevance").is_err());
        assert!(QueryState::parse("").is_err());
        assert!(QueryState::parse("title=&author=someone").is_err());

        // Blank second term is simply dropped.
        let state = QueryState::parse("title=a&boolean_operator=AND&author=").unwrap();
        assert!(state.secondary().is_none());
    }

    #[test]
    fn test_lenient_fallbacks() {
        let state = QueryState::parse("all=x&sort_by=popularity&sort_order=sideways&page=0").unwrap();
        assert_eq!(state.sort_by(), SortBy::Relevance);
        assert_eq!(state.sort_order(), SortOrder::Descending);
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn test_legacy_start_converts_to_page() {
        let state = QueryState::parse("all=x&start=10&max_results=5").unwrap();
        assert_eq!(state.page(), 3);

        let state = QueryState::parse("all=x&start=10&max_results=5&page=2").unwrap();
        assert_eq!(state.page(), 2);
    }

    #[test]
    fn test_surplus_terms_ignored() {
        let state = QueryState::parse("title=a&boolean_operator=OR&author=b&abstract=c").unwrap();
        assert_eq!(state.terms().len(), 2);
    }

    #[test]
    fn test_blank_terms_skipped_before_secondary() {
        let state = QueryState::parse("title=a&author=&abstract=c").unwrap();
        let (_, second) = state.secondary().unwrap();
        assert_eq!(second, &SearchTerm::new(Prefix::Abstract, "c"));
    }

    #[test]
    fn test_all_not_combined_with_second_term() {
        for raw in ["all=x&boolean_operator=AND&title=y", "title=y&all=x"] {
            assert!(
                matches!(QueryState::parse(raw), Err(QueryError::ParseError { .. })),
                "`{}` should be rejected",
                raw
            );
        }
        assert!(QueryState::advanced(SearchTerm::new(Prefix::All, "x"), BooleanOperator::And, None).is_err());
        assert!(QueryState::advanced(
            SearchTerm::new(Prefix::Title, "x"),
            BooleanOperator::And,
            Some(SearchTerm::new(Prefix::All, "y")),
        )
        .is_err());

        // A blank `all` next to a real term is simply dropped.
        let state = QueryState::parse("title=x&all=").unwrap();
        assert!(state.secondary().is_none());
    }

    #[test]
    fn test_canonical_encoding() {
        let state = QueryState::parse("all=graph neural networks").unwrap();
        assert_eq!(
            state.to_query_string(),
            "all=graph+neural+networks&sort_by=relevance&sort_order=descending&page=1"
        );

        let state = QueryState::parse("author=b&sort_order=ascending&title=a&boolean_operator=OR&page=4").unwrap();
        assert_eq!(
            state.to_query_string(),
            "author=b&boolean_operator=OR&title=a&sort_by=relevance&sort_order=ascending&page=4"
        );
        assert_eq!(state.to_query_string(), state.to_query_string());
    }

    #[test]
    fn test_roundtrip() {
        roundtrip("all=graph+neural+networks");
        roundtrip("title=a+b&boolean_operator=OR&author=c&sort_by=lastUpdatedDate&sort_order=ascending&page=7");
        roundtrip("title=single&boolean_operator=ANDNOT");
        roundtrip("journal_reference=Phys.+Rev.&start=20&max_results=10");
        roundtrip("id_list=2401.00001&sort_by=bogus");
        roundtrip("all=caf%C3%A9+%26+cr%C3%A8me");
    }

    #[test]
    fn test_with_page() {
        let state = QueryState::simple("transformers").unwrap();
        assert_eq!(state.with_page(0), Err(QueryError::InvalidPage(0)));
        assert_eq!(state.with_page(-3), Err(QueryError::InvalidPage(-3)));

        let next = state.with_page(4).unwrap();
        assert_eq!(next.page(), 4);
        assert_eq!(next.primary(), state.primary());
        assert_eq!(next.sort_by(), state.sort_by());
        assert_eq!(state.page(), 1);
        assert_eq!(next.first_result_index(), 15);
    }

    #[test]
    fn test_with_field_is_pure() {
        let state = QueryState::advanced(SearchTerm::new(Prefix::Title, "a"), BooleanOperator::And, None).unwrap();
        let next = state
            .with_field(QueryField::SecondaryKeyword("b".to_string()))
            .unwrap()
            .with_field(QueryField::SecondaryPrefix(Prefix::Abstract))
            .unwrap()
            .with_field(QueryField::Operator(BooleanOperator::Or))
            .unwrap();

        assert!(state.secondary().is_none());
        let (operator, term) = next.secondary().unwrap();
        assert_eq!(operator, BooleanOperator::Or);
        assert_eq!(term, &SearchTerm::new(Prefix::Abstract, "b"));

        assert_eq!(
            next.with_field(QueryField::PrimaryKeyword("  ".to_string())),
            Err(QueryError::blank_keyword())
        );
        let cleared = next.with_field(QueryField::SecondaryKeyword(String::new())).unwrap();
        assert!(cleared.secondary().is_none());
        assert_eq!(QueryState::parse(&cleared.to_query_string()).unwrap(), cleared);
    }

    #[test]
    fn test_second_term_requires_field_prefix() {
        let state = QueryState::simple("a").unwrap();
        let err = state
            .with_field(QueryField::SecondaryKeyword("b".to_string()))
            .unwrap_err();
        assert!(matches!(err, QueryError::ParseError { ref field, .. } if field == "prefix1"));

        let next = state
            .with_field(QueryField::PrimaryPrefix(Prefix::Title))
            .unwrap()
            .with_field(QueryField::SecondaryKeyword("b".to_string()))
            .unwrap();
        assert_eq!(next.mode(), SearchMode::Advanced);
        assert_eq!(QueryState::parse(&next.to_query_string()).unwrap(), next);

        assert!(next.with_field(QueryField::SecondaryPrefix(Prefix::All)).is_err());
        assert!(next.with_field(QueryField::PrimaryPrefix(Prefix::All)).is_err());
    }

    #[test]
    fn test_operator_edit_survives_round_trip_in_simple_mode() {
        let state = QueryState::simple("a")
            .unwrap()
            .with_field(QueryField::Operator(BooleanOperator::Or))
            .unwrap();
        assert_eq!(state.mode(), SearchMode::Simple);
        assert_eq!(QueryState::parse(&state.to_query_string()).unwrap(), state);
    }

    #[test]
    fn test_field_names() {
        assert_eq!(
            QueryField::from_name_value("sort_by", "submittedDate").unwrap(),
            QueryField::SortBy(SortBy::SubmittedDate)
        );
        assert_eq!(
            QueryField::from_name_value("operator", "AND NOT").unwrap(),
            QueryField::Operator(BooleanOperator::AndNot)
        );
        assert!(matches!(
            QueryField::from_name_value("colour", "blue"),
            Err(QueryError::UnknownField(_))
        ));
        assert!(QueryField::from_name_value("prefix1", "nope").is_err());
    }

    #[test]
    fn test_display() {
        let state = QueryState::parse("title=a&boolean_operator=OR&author=b").unwrap();
        assert_eq!(state.to_string(), "title:\"a\" OR author:\"b\"");
    }
}
