//! Target publication sets.
//!
//! The predicate only needs a yes/no lookup, so the set's origin (the
//! compiled-in list, a text file, the persisted `journals` table, or no
//! filter at all) stays behind the [`TargetLookup`] trait.

use crate::{Error, Result};
use std::collections::HashMap;
use std::io::BufRead;

/// Journals extracted when no other target source is configured.
pub const BUILTIN_JOURNALS: &[&str] = &[
    "Journal of Genetic Counselling",
    "European Journal of Human Genetics",
    "American Journal of Human Genetics",
    "Heredity",
    "Human Genetics",
    "Journal of Community Genetics",
    "Familial Cancer",
    "Human Genetics and Genomic Advances",
    "Human Genomics",
    "Genetic Epidemiology",
];

/// Decides whether a publication name is in scope.
pub trait TargetLookup {
    /// Exact, case-sensitive membership test.
    fn is_target(&self, name: &str) -> bool;
}

/// Mapping from publication name to an enablement flag.
///
/// Read-only for the duration of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    entries: HashMap<String, bool>,
}

impl TargetSet {
    /// Create an empty target set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled-in journal list, all enabled.
    pub fn builtin() -> Self {
        BUILTIN_JOURNALS.iter().map(|name| (name.to_string(), true)).collect()
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, name: impl Into<String>, enabled: bool) {
        self.entries.insert(name.into(), enabled);
    }

    /// Parse a plain-text target list: one journal per line.
    ///
    /// Blank lines and lines starting with `#` are skipped. Names are trimmed;
    /// every listed journal is enabled.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut set = Self::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let name = line.trim();
            if name.is_empty() || name.starts_with('#') {
                continue;
            }
            if name.contains('\t') {
                return Err(Error::InvalidTarget {
                    line: idx + 1,
                    reason: "tab characters are not allowed in journal names".to_string(),
                });
            }
            set.insert(name, true);
        }
        Ok(set)
    }

    /// Number of entries, enabled or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the set has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of enabled entries.
    pub fn enabled_count(&self) -> usize {
        self.entries.values().filter(|enabled| **enabled).count()
    }

    /// Enabled names in sorted order.
    pub fn enabled_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

impl TargetLookup for TargetSet {
    fn is_target(&self, name: &str) -> bool {
        self.entries.get(name).copied().unwrap_or(false)
    }
}

/// Matches every publication name.
///
/// Pass-through mode: every record carrying a `container-title` is in scope,
/// which lets the SQLite sink discover journals outside any curated list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnyPublication;

impl TargetLookup for AnyPublication {
    fn is_target(&self, _name: &str) -> bool {
        true
    }
}

impl FromIterator<(String, bool)> for TargetSet {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_builtin_contains_all_journals() {
        let set = TargetSet::builtin();
        assert_eq!(set.len(), BUILTIN_JOURNALS.len());
        assert_eq!(set.enabled_count(), BUILTIN_JOURNALS.len());
        assert!(set.is_target("Heredity"));
        assert!(set.is_target("Human Genetics and Genomic Advances"));
    }

    #[test]
    fn test_exact_match_only() {
        let set = TargetSet::builtin();
        assert!(!set.is_target("heredity"));
        assert!(!set.is_target("Heredity "));
        assert!(!set.is_target("Nature"));
    }

    #[test]
    fn test_disabled_entry_is_not_target() {
        let mut set = TargetSet::new();
        set.insert("Heredity", true);
        set.insert("Nature", false);
        assert!(set.is_target("Heredity"));
        assert!(!set.is_target("Nature"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.enabled_names(), vec!["Heredity"]);
    }

    #[test]
    fn test_from_reader_skips_comments_and_blanks() {
        let input = "# genetics\nHeredity\n\n  Human Genomics  \n#Nature\n";
        let set = TargetSet::from_reader(Cursor::new(input)).unwrap();
        assert_eq!(set.enabled_names(), vec!["Heredity", "Human Genomics"]);
        assert!(!set.is_target("#Nature"));
    }

    #[test]
    fn test_from_reader_rejects_tabs() {
        let input = "Heredity\nHuman\tGenomics\n";
        let err = TargetSet::from_reader(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, Error::InvalidTarget { line: 2, .. }));
    }

    #[test]
    fn test_any_publication_matches_everything() {
        assert!(AnyPublication.is_target("Heredity"));
        assert!(AnyPublication.is_target("Nature"));
    }
}
