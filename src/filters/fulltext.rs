//! Boolean-mode full-text queries.
//!
//! Words are runs of letters, digits and underscores, compared case-insensitively.
//! `+word` is required, `-word` excluded, `word*` matches by prefix and
//! unmarked words are optional. Without required words at least one optional
//! word has to match.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}_]+").expect("valid word pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Required,
    Excluded,
    Optional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub word: String,
    pub kind: TermKind,
    pub prefix: bool,
}

impl Term {
    fn hits(&self, words: &HashSet<String>) -> bool {
        if self.prefix {
            words.iter().any(|w| w.starts_with(&self.word))
        } else {
            words.contains(&self.word)
        }
    }

    fn to_tsquery(&self) -> String {
        if self.prefix {
            format!("{}:*", self.word)
        } else {
            self.word.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullTextQuery {
    terms: Vec<Term>,
}

impl FullTextQuery {
    pub fn parse(input: &str) -> Self {
        let mut terms = Vec::new();

        for token in input.split_whitespace() {
            let (kind, rest) = match token.chars().next() {
                Some('+') => (TermKind::Required, &token[1..]),
                Some('-') => (TermKind::Excluded, &token[1..]),
                _ => (TermKind::Optional, token),
            };
            let prefix = rest.ends_with('*');

            let words: Vec<String> = WORD.find_iter(rest).map(|m| m.as_str().to_lowercase()).collect();
            let last = words.len().saturating_sub(1);
            for (index, word) in words.into_iter().enumerate() {
                terms.push(Term {
                    word,
                    kind,
                    prefix: prefix && index == last,
                });
            }
        }

        Self { terms }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether the query can match anything at all
    pub fn has_positive_terms(&self) -> bool {
        self.terms.iter().any(|t| t.kind != TermKind::Excluded)
    }

    pub fn matches(&self, text: &str) -> bool {
        let words = words_of(text);

        if self.of_kind(TermKind::Excluded).any(|t| t.hits(&words)) {
            return false;
        }

        let mut required = self.of_kind(TermKind::Required).peekable();
        if required.peek().is_some() {
            return required.all(|t| t.hits(&words));
        }

        self.of_kind(TermKind::Optional).any(|t| t.hits(&words))
    }

    /// Render as a PostgreSQL `tsquery` expression.
    ///
    /// Returns `None` when the query has no positive words and so matches nothing.
    pub fn to_tsquery(&self) -> Option<String> {
        let required: Vec<String> = self.of_kind(TermKind::Required).map(Term::to_tsquery).collect();
        let optional: Vec<String> = self.of_kind(TermKind::Optional).map(Term::to_tsquery).collect();

        let mut parts = if !required.is_empty() {
            required
        } else if !optional.is_empty() {
            vec![format!("({})", optional.join(" | "))]
        } else {
            return None;
        };

        parts.extend(self.of_kind(TermKind::Excluded).map(|t| format!("!{}", t.to_tsquery())));
        Some(parts.join(" & "))
    }

    fn of_kind(&self, kind: TermKind) -> impl Iterator<Item = &Term> + '_ {
        self.terms.iter().filter(move |t| t.kind == kind)
    }
}

fn words_of(text: &str) -> HashSet<String> {
    WORD.find_iter(text).map(|m| m.as_str().to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_word_matches_whole_words() {
        let query = FullTextQuery::parse("Book");
        assert!(query.matches("Book 1"));
        assert!(query.matches("my BOOK"));
        assert!(!query.matches("Another"));
        assert!(!query.matches("Bookshelf"));
    }

    #[test]
    fn test_optional_words_match_any() {
        let query = FullTextQuery::parse("dune hobbit");
        assert!(query.matches("Dune Messiah"));
        assert!(query.matches("The Hobbit"));
        assert!(!query.matches("Neuromancer"));
    }

    #[test]
    fn test_required_and_excluded() {
        let query = FullTextQuery::parse("+dune -messiah");
        assert!(query.matches("Dune"));
        assert!(!query.matches("Dune Messiah"));
        assert!(!query.matches("Children of Dun"));
    }

    #[test]
    fn test_prefix_wildcard() {
        let query = FullTextQuery::parse("book*");
        assert!(query.matches("Bookshelf stories"));
        assert!(!query.matches("Shelf"));
    }

    #[test]
    fn test_only_excluded_matches_nothing() {
        let query = FullTextQuery::parse("-dune");
        assert!(!query.matches("Foundation"));
        assert!(!query.has_positive_terms());
        assert_eq!(query.to_tsquery(), None);
    }

    #[test]
    fn test_punctuation_is_stripped() {
        let query = FullTextQuery::parse("\"o'reilly\" (guide)");
        let words: Vec<_> = query.terms().iter().map(|t| t.word.as_str()).collect();
        assert_eq!(words, vec!["o", "reilly", "guide"]);
    }

    #[test]
    fn test_tsquery_rendering() {
        assert_eq!(FullTextQuery::parse("Book").to_tsquery().as_deref(), Some("(book)"));
        assert_eq!(
            FullTextQuery::parse("dune hobbit*").to_tsquery().as_deref(),
            Some("(dune | hobbit:*)")
        );
        assert_eq!(
            FullTextQuery::parse("+dune +frank -messiah").to_tsquery().as_deref(),
            Some("dune & frank & !messiah")
        );
    }
}
