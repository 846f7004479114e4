//! Query-parameter filters for list endpoints

pub mod fulltext;

pub use fulltext::FullTextQuery;

use crate::models::book::Book;

/// Attributes of a book that can be filtered on
pub const BOOK_FILTERS: &[&str] = &["title"];

/// Parameters that drive pagination rather than filtering
const RESERVED_PARAMS: &[&str] = &["page"];

/// A single predicate applied to a book query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterClause {
    /// Full-text boolean-mode match on the title
    TitleMatch(FullTextQuery),
}

impl FilterClause {
    pub fn matches(&self, book: &Book) -> bool {
        match self {
            FilterClause::TitleMatch(query) => query.matches(&book.title),
        }
    }
}

/// Filter built from the query string of a list request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    clauses: Vec<FilterClause>,
    ignored: Vec<String>,
}

impl BookFilter {
    /// Build from raw `(name, value)` query pairs.
    ///
    /// Unknown parameters never fail; their names are kept in [`Self::ignored`].
    /// Blank values are skipped.
    pub fn from_params<'a, I>(params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut filter = Self::default();

        for (name, value) in params {
            if RESERVED_PARAMS.contains(&name) {
                continue;
            }
            match name {
                "title" => {
                    if value.trim().is_empty() {
                        continue;
                    }
                    filter.clauses.push(FilterClause::TitleMatch(FullTextQuery::parse(value)));
                }
                other => {
                    if !filter.ignored.iter().any(|n| n == other) {
                        filter.ignored.push(other.to_string());
                    }
                }
            }
        }

        filter
    }

    pub fn title(term: &str) -> Self {
        Self::from_params([("title", term)])
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    /// Names of parameters that are not filters
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, book: &Book) -> bool {
        self.clauses.iter().all(|clause| clause.matches(book))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book::tests::sample_book;

    #[test]
    fn test_title_param_becomes_clause() {
        let filter = BookFilter::from_params([("title", "Book"), ("page", "2")]);
        assert_eq!(filter.clauses().len(), 1);
        assert!(filter.ignored().is_empty());
    }

    #[test]
    fn test_unknown_params_are_ignored() {
        let filter = BookFilter::from_params([("genre", "sf"), ("sort", "price"), ("genre", "x")]);
        assert!(filter.is_empty());
        assert_eq!(filter.ignored(), &["genre".to_string(), "sort".to_string()]);
    }

    #[test]
    fn test_blank_title_is_skipped() {
        assert!(BookFilter::title("   ").is_empty());
    }

    #[test]
    fn test_matches_book_titles() {
        let filter = BookFilter::title("Book");
        assert!(filter.matches(&sample_book(1, "Book 1")));
        assert!(filter.matches(&sample_book(2, "Book 2")));
        assert!(!filter.matches(&sample_book(3, "Another")));
        assert!(BookFilter::default().matches(&sample_book(3, "Another")));
    }
}
