//! Query construction.
//!
//! A search is expressed as a simple `name[:tag]` string plus an optional
//! advanced query string. [`QueryBuilder`] compiles the pair into an
//! engine-neutral [`ImageQuery`] tree that document index engines translate
//! into their own query types.

use crate::schema;

/// Sentinel that matches every document.
pub const MATCH_ALL: &str = "*";

/// Default edit distance for fuzzy name matching.
pub const DEFAULT_FUZZINESS: u8 = 1;

/// Structured query against the image index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageQuery {
    /// Every document.
    MatchAll,

    /// Terms within `distance` edits of `term`.
    Fuzzy {
        /// Target field.
        field: String,
        /// Term to approximate.
        term: String,
        /// Maximum edit distance.
        distance: u8,
    },

    /// Exact token match.
    Term {
        /// Target field.
        field: String,
        /// Token to match.
        value: String,
    },

    /// Free-form query string, e.g. `+Label.os:ubuntu -Label.version:xenial`.
    QueryString(String),

    /// Documents with one of the given identifiers.
    DocIds(Vec<String>),

    /// Disjunction of clauses. No clause is required; an empty disjunction
    /// matches nothing.
    Should(Vec<ImageQuery>),
}

impl ImageQuery {
    /// Creates an exact-token query.
    #[must_use]
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a query matching a single document identifier.
    #[must_use]
    pub fn doc_id(id: impl Into<String>) -> Self {
        Self::DocIds(vec![id.into()])
    }
}

/// Compiles `(simple, advanced)` query pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryBuilder {
    fuzziness: u8,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    /// Creates a builder with the default fuzziness.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fuzziness: DEFAULT_FUZZINESS,
        }
    }

    /// Sets the edit distance used for name matching.
    #[must_use]
    pub const fn with_fuzziness(mut self, fuzziness: u8) -> Self {
        self.fuzziness = fuzziness;
        self
    }

    /// Builds the query for a simple and an advanced query string.
    ///
    /// `*` in either position matches everything. A non-empty `simple` is
    /// split on its first `:`: the left side fuzzily matches `Name`, the
    /// right side (or the whole string when there is no `:`) exactly matches
    /// `Tag`. A non-empty `advanced` is added as a query-string clause. All
    /// clauses are optional.
    ///
    /// # Examples
    ///
    /// ```
    /// use dim_core::{ImageQuery, QueryBuilder};
    ///
    /// let builder = QueryBuilder::new();
    /// assert_eq!(builder.build("*", ""), ImageQuery::MatchAll);
    ///
    /// let ImageQuery::Should(clauses) = builder.build("nginx:1.25", "") else {
    ///     panic!("expected a disjunction");
    /// };
    /// assert_eq!(clauses.len(), 2);
    /// ```
    #[must_use]
    pub fn build(&self, simple: &str, advanced: &str) -> ImageQuery {
        tracing::debug!(simple, advanced, "Building query clause");

        if simple == MATCH_ALL || advanced == MATCH_ALL {
            return ImageQuery::MatchAll;
        }

        let mut clauses = Vec::with_capacity(3);

        if !simple.is_empty() {
            let (name, tag) = simple.split_once(':').unwrap_or((simple, simple));
            tracing::debug!(name, tag, "Adding name and tag clauses");
            clauses.push(ImageQuery::Fuzzy {
                field: schema::NAME.to_string(),
                term: name.to_lowercase(),
                distance: self.fuzziness,
            });
            clauses.push(ImageQuery::term(schema::TAG, tag));
        }

        if !advanced.is_empty() {
            tracing::debug!("Adding advanced clause");
            clauses.push(ImageQuery::QueryString(advanced.to_string()));
        }

        ImageQuery::Should(clauses)
    }
}

/// Builds a query with the default [`QueryBuilder`].
#[must_use]
pub fn build_query(simple: &str, advanced: &str) -> ImageQuery {
    QueryBuilder::new().build(simple, advanced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_all_sentinels() {
        assert_eq!(build_query("*", ""), ImageQuery::MatchAll);
        assert_eq!(build_query("", "*"), ImageQuery::MatchAll);
        assert_eq!(build_query("nginx", "*"), ImageQuery::MatchAll);
    }

    #[test]
    fn test_name_and_tag() {
        let query = build_query("foo:bar", "");
        assert_eq!(
            query,
            ImageQuery::Should(vec![
                ImageQuery::Fuzzy {
                    field: "Name".to_string(),
                    term: "foo".to_string(),
                    distance: DEFAULT_FUZZINESS,
                },
                ImageQuery::term("Tag", "bar"),
            ])
        );
    }

    #[test]
    fn test_simple_without_tag_matches_both_fields() {
        let ImageQuery::Should(clauses) = build_query("Nginx", "") else {
            panic!("expected a disjunction");
        };
        assert!(matches!(&clauses[0], ImageQuery::Fuzzy { term, .. } if term == "nginx"));
        assert_eq!(clauses[1], ImageQuery::term("Tag", "Nginx"));
    }

    #[test]
    fn test_split_on_first_colon() {
        let ImageQuery::Should(clauses) = build_query("a:b:c", "") else {
            panic!("expected a disjunction");
        };
        assert!(matches!(&clauses[0], ImageQuery::Fuzzy { term, .. } if term == "a"));
        assert_eq!(clauses[1], ImageQuery::term("Tag", "b:c"));
    }

    #[test]
    fn test_advanced_clause() {
        let query = build_query("", "+Label.os:ubuntu -Label.version:xenial");
        assert_eq!(
            query,
            ImageQuery::Should(vec![ImageQuery::QueryString(
                "+Label.os:ubuntu -Label.version:xenial".to_string()
            )])
        );
    }

    #[test]
    fn test_simple_and_advanced_combined() {
        let ImageQuery::Should(clauses) = build_query("nginx", "Labels:os") else {
            panic!("expected a disjunction");
        };
        assert_eq!(clauses.len(), 3);
        assert_eq!(clauses[2], ImageQuery::QueryString("Labels:os".to_string()));
    }

    #[test]
    fn test_empty_input_is_not_match_all() {
        assert_eq!(build_query("", ""), ImageQuery::Should(Vec::new()));
    }

    #[test]
    fn test_custom_fuzziness() {
        let ImageQuery::Should(clauses) = QueryBuilder::new().with_fuzziness(2).build("foo", "")
        else {
            panic!("expected a disjunction");
        };
        assert!(matches!(clauses[0], ImageQuery::Fuzzy { distance: 2, .. }));
    }
}
