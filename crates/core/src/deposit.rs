//! Deposit identity helpers: document codes, file names and DOI prefixes.

/// Build the composite deposit code `{collection}_{pid}`.
///
/// ```
/// use depositor_core::deposit::deposit_code;
///
/// assert_eq!(deposit_code("scl", "S0001-37652000000100001"), "scl_S0001-37652000000100001");
/// ```
pub fn deposit_code(collection_acronym: &str, publisher_id: &str) -> String {
    format!("{collection_acronym}_{publisher_id}")
}

/// File name used for the submission XML of a deposit code.
pub fn xml_file_name(code: &str) -> String {
    format!("{code}.xml")
}

/// Extract the DOI prefix: everything before the first `/`.
///
/// A DOI without `/` is its own prefix; an absent DOI has an empty prefix.
pub fn doi_prefix(doi: Option<&str>) -> &str {
    match doi {
        Some(doi) => doi.split('/').next().unwrap_or_default(),
        None => "",
    }
}

/// Case-insensitive comparison between a document prefix and the
/// collection's registered prefix.
pub fn prefix_matches(doi_prefix: &str, collection_prefix: &str) -> bool {
    doi_prefix.to_lowercase() == collection_prefix.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_joins_collection_and_pid() {
        assert_eq!(deposit_code("scl", "S0001"), "scl_S0001");
    }

    #[test]
    fn file_name_appends_extension() {
        assert_eq!(xml_file_name("scl_S0001"), "scl_S0001.xml");
    }

    #[test]
    fn prefix_is_text_before_first_slash() {
        assert_eq!(doi_prefix(Some("10.1590/S0001/x")), "10.1590");
    }

    #[test]
    fn prefix_of_doi_without_slash_is_whole_doi() {
        assert_eq!(doi_prefix(Some("10.1590")), "10.1590");
    }

    #[test]
    fn prefix_of_missing_doi_is_empty() {
        assert_eq!(doi_prefix(None), "");
    }

    #[test]
    fn prefix_match_ignores_case() {
        assert!(prefix_matches("10.1590", "10.1590"));
        assert!(prefix_matches("10.ABCD", "10.abcd"));
        assert!(!prefix_matches("10.9999", "10.1590"));
        assert!(!prefix_matches("", "10.1590"));
    }
}
