//! Record predicate.

use crate::record::{Record, publication_name};
use crate::targets::TargetLookup;

/// Outcome of evaluating a record against the target set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match<'a> {
    /// The record belongs to this target publication.
    Target(&'a str),
    /// Not a target; also covers records without a usable `container-title`.
    NoMatch,
}

impl<'a> Match<'a> {
    /// The matched publication name, if any.
    pub fn publication(self) -> Option<&'a str> {
        match self {
            Match::Target(name) => Some(name),
            Match::NoMatch => None,
        }
    }

    pub fn is_match(self) -> bool {
        matches!(self, Match::Target(_))
    }
}

/// Decide whether `record` should be forwarded to a sink.
///
/// Malformed shapes are never errors: archives legitimately contain records
/// that are not titled works.
pub fn evaluate<'a, T>(record: &'a Record, targets: &T) -> Match<'a>
where
    T: TargetLookup + ?Sized,
{
    match publication_name(record) {
        Some(name) if targets.is_target(name) => Match::Target(name),
        _ => Match::NoMatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::{AnyPublication, TargetSet};
    use serde_json::json;

    fn heredity_only() -> TargetSet {
        let mut set = TargetSet::new();
        set.insert("Heredity", true);
        set
    }

    #[test]
    fn test_match_on_first_title() {
        let targets = heredity_only();
        let record = json!({"container-title": ["Heredity"], "DOI": "10.1038/x"});
        assert_eq!(evaluate(&record, &targets), Match::Target("Heredity"));
        assert_eq!(evaluate(&record, &targets).publication(), Some("Heredity"));
    }

    #[test]
    fn test_only_first_title_counts() {
        let targets = heredity_only();
        let record = json!({"container-title": ["Nature", "Heredity"]});
        assert_eq!(evaluate(&record, &targets), Match::NoMatch);
    }

    #[test]
    fn test_non_target_publication() {
        let targets = heredity_only();
        let record = json!({"container-title": ["Nature"]});
        assert!(!evaluate(&record, &targets).is_match());
    }

    #[test]
    fn test_malformed_shapes_never_match() {
        let targets = heredity_only();
        for record in [
            json!({}),
            json!({"container-title": []}),
            json!({"container-title": "Heredity"}),
            json!({"container-title": [null, "Heredity"]}),
            json!({"container-title": [{"name": "Heredity"}]}),
            json!("Heredity"),
            json!(null),
        ] {
            assert_eq!(evaluate(&record, &targets), Match::NoMatch, "{record}");
        }
    }

    #[test]
    fn test_disabled_target_never_matches() {
        let mut targets = TargetSet::new();
        targets.insert("Heredity", false);
        let record = json!({"container-title": ["Heredity"]});
        assert_eq!(evaluate(&record, &targets), Match::NoMatch);
    }

    #[test]
    fn test_works_through_trait_object() {
        let targets = heredity_only();
        let lookup: &dyn TargetLookup = &targets;
        let record = json!({"container-title": ["Heredity"]});
        assert!(evaluate(&record, lookup).is_match());
    }

    #[test]
    fn test_any_publication_still_requires_title() {
        let record = json!({"container-title": ["Nature"]});
        assert_eq!(evaluate(&record, &AnyPublication), Match::Target("Nature"));
        assert_eq!(evaluate(&json!({"DOI": "10.1/x"}), &AnyPublication), Match::NoMatch);
    }
}
