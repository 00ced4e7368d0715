use pulse_catalog::title::{clean_doi, is_doi, normalize_title};

#[test]
fn folds_case_and_punctuation() {
    assert_eq!(normalize_title("Foo"), "foo");
    assert_eq!(normalize_title("FOO!"), "foo");
    assert_eq!(normalize_title("F.o.o"), "foo");
}

#[test]
fn whitespace_is_ignored() {
    assert_eq!(
        normalize_title("A  Study\tof\nThings"),
        normalize_title("a study of things")
    );
}

#[test]
fn keeps_digits() {
    assert_eq!(normalize_title("COVID-19 in 2020"), "covid19in2020");
}

#[test]
fn empty_title_normalizes_to_empty() {
    assert_eq!(normalize_title(""), "");
    assert_eq!(normalize_title("  ...  "), "");
}

#[test]
fn clean_doi_strips_resolver_prefixes() {
    for raw in [
        "10.1371/journal.pone.0000001",
        "https://doi.org/10.1371/journal.pone.0000001",
        "http://dx.doi.org/10.1371/journal.pone.0000001",
        "doi:10.1371/journal.pone.0000001",
        "  DOI: 10.1371/JOURNAL.PONE.0000001 ",
    ] {
        assert_eq!(
            clean_doi(raw).as_deref(),
            Some("10.1371/journal.pone.0000001"),
            "failed for {raw:?}"
        );
    }
}

#[test]
fn clean_doi_rejects_non_dois() {
    assert_eq!(clean_doi(""), None);
    assert_eq!(clean_doi("10."), None);
    assert_eq!(clean_doi("isbn:978-3-16-148410-0"), None);
}

#[test]
fn is_doi_requires_directory_prefix() {
    assert!(is_doi("10.1000/182"));
    assert!(!is_doi("11.1000/182"));
}
