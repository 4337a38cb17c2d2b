//! Search form submission.
//!
//! The landing page offers a single search box and an expandable advanced
//! form with two prefixed keyword rows. Both produce a [`QueryState`] on
//! submit; the results view then works from that state (or its query string).

use super::{
    BooleanOperator, Prefix, QueryError, QueryField, QueryResult, QueryState, SearchTerm, SortBy,
    SortOrder,
};

/// Submit the simple search box. Blank input submits nothing.
pub fn simple_search(text: &str) -> Option<QueryState> {
    QueryState::simple(text).ok()
}

/// State of the advanced search form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvancedSearchForm {
    pub prefix1: Prefix,
    pub keyword1: String,
    pub operator: BooleanOperator,
    pub prefix2: Prefix,
    pub keyword2: String,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl Default for AdvancedSearchForm {
    fn default() -> Self {
        Self {
            prefix1: Prefix::Title,
            keyword1: String::new(),
            operator: BooleanOperator::And,
            prefix2: Prefix::Title,
            keyword2: String::new(),
            sort_by: SortBy::Relevance,
            sort_order: SortOrder::Descending,
        }
    }
}

impl AdvancedSearchForm {
    /// Update one control by name (`prefix1`, `keyword1`, `boolean_operator`,
    /// `prefix2`, `keyword2`, `sort_by`, `sort_order`).
    ///
    /// Unlike [`QueryState::with_field`] a blank keyword is accepted here; the
    /// form is only validated on submit.
    pub fn set(&mut self, name: &str, value: &str) -> QueryResult<()> {
        match QueryField::from_name_value(name, value)? {
            QueryField::PrimaryPrefix(prefix) => self.prefix1 = prefix,
            QueryField::PrimaryKeyword(keyword) => self.keyword1 = keyword,
            QueryField::SecondaryPrefix(prefix) => self.prefix2 = prefix,
            QueryField::SecondaryKeyword(keyword) => self.keyword2 = keyword,
            QueryField::Operator(operator) => self.operator = operator,
            QueryField::SortBy(sort_by) => self.sort_by = sort_by,
            QueryField::SortOrder(sort_order) => self.sort_order = sort_order,
        }
        Ok(())
    }

    /// Validate and build the query.
    ///
    /// Fails with a `keyword1` [`QueryError::ParseError`] when the first
    /// keyword is blank. The second row only counts when its keyword is
    /// non-blank. A single row is a simple search only when its prefix is
    /// `all`; any other prefix goes to the field-specific search.
    pub fn submit(&self) -> QueryResult<QueryState> {
        let primary = SearchTerm::new(self.prefix1, &self.keyword1);
        let secondary = SearchTerm::new(self.prefix2, &self.keyword2);

        let state = QueryState::from_terms(primary, self.operator, Some(secondary))?;
        Ok(state.with_sort(self.sort_by, self.sort_order))
    }

    /// Whether submitting would fail validation.
    pub fn keyword_error(&self) -> Option<QueryError> {
        self.submit().err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SearchMode;

    #[test]
    fn test_simple_search() {
        assert!(simple_search("   ").is_none());
        let state = simple_search("  diffusion models ").unwrap();
        assert_eq!(state.primary(), &SearchTerm::new(Prefix::All, "diffusion models"));
        assert_eq!(state.mode(), SearchMode::Simple);
    }

    #[test]
    fn test_blank_first_keyword_rejected() {
        let mut form = AdvancedSearchForm::default();
        form.set("keyword2", "ignored").unwrap();

        let err = form.submit().unwrap_err();
        assert!(matches!(err, QueryError::ParseError { ref field, .. } if field == "keyword1"));
        assert_eq!(form.keyword_error(), Some(err));
    }

    #[test]
    fn test_single_field_row_submits_advanced_query() {
        let mut form = AdvancedSearchForm::default();
        form.set("prefix1", "author").unwrap();
        form.set("keyword1", " hinton ").unwrap();
        form.set("boolean_operator", "OR").unwrap();
        form.set("sort_by", "lastUpdatedDate").unwrap();

        let state = form.submit().unwrap();
        assert_eq!(state.mode(), SearchMode::Advanced);
        assert_eq!(state.primary(), &SearchTerm::new(Prefix::Author, "hinton"));
        assert!(state.secondary().is_none());
        assert_eq!(state.sort_by(), SortBy::LastUpdatedDate);
        assert_eq!(QueryState::parse(&state.to_query_string()).unwrap(), state);
    }

    #[test]
    fn test_single_all_row_submits_simple_query() {
        let mut form = AdvancedSearchForm::default();
        form.set("prefix1", "all").unwrap();
        form.set("keyword1", "graphs").unwrap();
        assert_eq!(form.submit().unwrap().mode(), SearchMode::Simple);

        form.set("keyword2", "trees").unwrap();
        assert!(form.submit().is_err());
    }

    #[test]
    fn test_two_rows_submit_advanced_query() {
        let mut form = AdvancedSearchForm::default();
        form.set("keyword1", "graph").unwrap();
        form.set("boolean_operator", "ANDNOT").unwrap();
        form.set("prefix2", "abstract").unwrap();
        form.set("keyword2", "survey").unwrap();
        form.set("sort_order", "ascending").unwrap();

        let state = form.submit().unwrap();
        assert_eq!(state.mode(), SearchMode::Advanced);
        let (operator, second) = state.secondary().unwrap();
        assert_eq!(operator, BooleanOperator::AndNot);
        assert_eq!(second, &SearchTerm::new(Prefix::Abstract, "survey"));
        assert_eq!(state.sort_order(), SortOrder::Ascending);
        assert_eq!(QueryState::parse(&state.to_query_string()).unwrap(), state);
    }

    #[test]
    fn test_unknown_control_rejected() {
        let mut form = AdvancedSearchForm::default();
        assert!(matches!(form.set("subject", "cs"), Err(QueryError::UnknownField(_))));
        assert_eq!(form, AdvancedSearchForm::default());
    }
}
