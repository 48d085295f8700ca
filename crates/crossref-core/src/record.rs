//! Accessors for the record fields the pipeline interprets.
//!
//! Records are kept as generic JSON values: archives mix many record shapes
//! and everything except `container-title` and `DOI` is opaque payload that
//! sinks pass through untouched.

use serde_json::Value;

/// One bibliographic work, as decoded from an archive.
pub type Record = Value;

/// Field holding the ordered list of publication titles.
pub const CONTAINER_TITLE_FIELD: &str = "container-title";

/// Field holding the work's DOI.
pub const DOI_FIELD: &str = "DOI";

/// Returns the first `container-title` entry when it is a string.
///
/// Missing fields, non-array values, empty arrays, and non-string first
/// elements all yield `None`.
pub fn publication_name(record: &Record) -> Option<&str> {
    record
        .get(CONTAINER_TITLE_FIELD)?
        .as_array()?
        .first()?
        .as_str()
}

/// Returns the record's DOI when it is a non-empty string.
pub fn doi(record: &Record) -> Option<&str> {
    record
        .get(DOI_FIELD)?
        .as_str()
        .filter(|doi| !doi.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_publication_name_first_entry() {
        let record = json!({"container-title": ["Heredity", "Heredity (Edinb)"]});
        assert_eq!(publication_name(&record), Some("Heredity"));
    }

    #[test]
    fn test_publication_name_absent_shapes() {
        assert_eq!(publication_name(&json!({})), None);
        assert_eq!(publication_name(&json!({"container-title": []})), None);
        assert_eq!(publication_name(&json!({"container-title": "Heredity"})), None);
        assert_eq!(publication_name(&json!({"container-title": [42]})), None);
        assert_eq!(publication_name(&json!({"container-title": null})), None);
        assert_eq!(publication_name(&json!(["Heredity"])), None);
    }

    #[test]
    fn test_doi() {
        assert_eq!(doi(&json!({"DOI": "10.1038/hdy.2011.1"})), Some("10.1038/hdy.2011.1"));
        assert_eq!(doi(&json!({"DOI": ""})), None);
        assert_eq!(doi(&json!({"DOI": 10})), None);
        assert_eq!(doi(&json!({"doi": "10.1/x"})), None);
    }
}
