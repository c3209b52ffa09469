// Key Filter Engine
//
// Compiles a filter expression into a predicate over setting keys.
//
// Grammar:
// - empty expression        -> every key matches
// - `prefix*`               -> keys starting with `prefix`
// - `a, b, c`               -> keys exactly equal to one of the names
// - `name`                  -> keys exactly equal to `name`
//
// `*` may appear once, only as the final character, and never together
// with `,`.

use std::collections::BTreeSet;
use std::str::FromStr;

const WILDCARD: char = '*';
const SEPARATOR: char = ',';

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid filter `{expression}`: {reason}")]
    Invalid {
        expression: String,
        reason: &'static str,
    },
}

impl FilterError {
    fn invalid(expression: &str, reason: &'static str) -> Self {
        FilterError::Invalid {
            expression: expression.to_string(),
            reason,
        }
    }
}

/// Compiled key predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Filter {
    /// No filter given.
    #[default]
    All,

    /// Trailing-wildcard match on the characters before `*`.
    Prefix(String),

    /// Exact match against any of the listed names.
    Exact(BTreeSet<String>),
}

impl Filter {
    /// Parse a filter expression.
    pub fn new(expression: &str) -> Result<Self, FilterError> {
        if expression.trim().is_empty() {
            return Ok(Filter::All);
        }

        if let Some(position) = expression.find(WILDCARD) {
            if expression.contains(SEPARATOR) {
                return Err(FilterError::invalid(
                    expression,
                    "a wildcard cannot be combined with a list of names",
                ));
            }
            // `*` is one byte, so the last valid position is len - 1.
            if position != expression.len() - 1 {
                return Err(FilterError::invalid(
                    expression,
                    "the wildcard is only allowed as the final character",
                ));
            }
            return Ok(Filter::Prefix(expression[..position].to_string()));
        }

        let mut names = BTreeSet::new();
        for name in expression.split(SEPARATOR).map(str::trim) {
            if name.is_empty() {
                return Err(FilterError::invalid(
                    expression,
                    "list entries must not be empty",
                ));
            }
            names.insert(name.to_string());
        }

        Ok(Filter::Exact(names))
    }

    /// Parse an optional expression; `None` matches everything.
    pub fn from_optional(expression: Option<&str>) -> Result<Self, FilterError> {
        expression.map_or(Ok(Filter::All), Filter::new)
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            Filter::All => true,
            Filter::Prefix(prefix) => key.starts_with(prefix.as_str()),
            Filter::Exact(names) => names.contains(key),
        }
    }

    /// Keep only the matching keys, preserving order.
    pub fn apply<I, S>(&self, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        keys.into_iter()
            .map(Into::into)
            .filter(|key| self.matches(key))
            .collect()
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(expression: &str) -> Filter {
        Filter::new(expression).unwrap()
    }

    #[test]
    fn empty_expression_matches_everything() {
        let f = filter("");
        assert_eq!(f, Filter::All);
        assert!(f.matches(""));
        assert!(f.matches("anything"));

        assert_eq!(filter("   "), Filter::All);
        assert_eq!(Filter::from_optional(None).unwrap(), Filter::All);
    }

    #[test]
    fn trailing_wildcard_is_a_prefix_match() {
        let f = filter("abc*");
        assert!(f.matches("abc"));
        assert!(f.matches("abcdef"));
        assert!(!f.matches("xabc"));
        assert!(!f.matches("ab"));
    }

    #[test]
    fn lone_wildcard_matches_everything() {
        let f = filter("*");
        assert_eq!(f, Filter::Prefix(String::new()));
        assert!(f.matches(""));
        assert!(f.matches("app/db/url"));
    }

    #[test]
    fn list_is_exact_match_or() {
        let f = filter("a,b,c");
        assert!(f.matches("a"));
        assert!(f.matches("b"));
        assert!(f.matches("c"));
        assert!(!f.matches("ab"));
        assert!(!f.matches("d"));
    }

    #[test]
    fn list_entries_are_trimmed() {
        let f = filter(" app.name ,  app.port");
        assert!(f.matches("app.name"));
        assert!(f.matches("app.port"));
        assert!(!f.matches(" app.name "));
    }

    #[test]
    fn single_name_is_exact() {
        let f = filter("app.name");
        assert!(f.matches("app.name"));
        assert!(!f.matches("app.name2"));
        assert!(!f.matches("app"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let f = filter("a.c");
        assert!(f.matches("a.c"));
        assert!(!f.matches("abc"));

        let f = filter("(x)+*");
        assert!(f.matches("(x)+y"));
        assert!(!f.matches("xx"));
    }

    #[test]
    fn wildcard_with_list_is_rejected() {
        assert!(matches!(Filter::new("a*,b"), Err(FilterError::Invalid { .. })));
        assert!(matches!(Filter::new("a,b*"), Err(FilterError::Invalid { .. })));
    }

    #[test]
    fn wildcard_not_at_end_is_rejected() {
        for expression in ["a*b*", "*a", "a*b", "**"] {
            let err = Filter::new(expression).unwrap_err();
            assert!(
                err.to_string().contains(expression),
                "unexpected error: {err}"
            );
        }
    }

    #[test]
    fn empty_list_entry_is_rejected() {
        assert!(Filter::new("a,,b").is_err());
        assert!(Filter::new("a, ").is_err());
    }

    #[test]
    fn apply_keeps_order() {
        let f: Filter = "svc*".parse().unwrap();
        let kept = f.apply(["svc.b", "other", "svc.a"]);
        assert_eq!(kept, vec!["svc.b".to_string(), "svc.a".to_string()]);
    }
}
