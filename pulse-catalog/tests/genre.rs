use pulse_catalog::genre::guess_genre;

#[test]
fn no_type_no_doi_is_article() {
    assert_eq!(guess_genre(None, None, None), "article");
}

#[test]
fn blank_type_is_treated_as_absent() {
    assert_eq!(guess_genre(Some("  "), None, None), "article");
}

#[test]
fn preprint_doi_wins_regardless_of_type() {
    for work_type in [None, Some("journal-article"), Some("poster"), Some("dataset"), Some("other")] {
        assert_eq!(
            guess_genre(work_type, Some("10.1101/2020.01.01.123456"), None),
            "preprint",
            "type {work_type:?}"
        );
    }
}

#[test]
fn preprint_url_fragment_is_recognized() {
    assert_eq!(
        guess_genre(Some("other"), None, Some("https://arxiv.org/abs/1234.5678")),
        "preprint"
    );
}

#[test]
fn underscored_type_falls_back_to_hyphenated_form() {
    assert_eq!(guess_genre(Some("dataset_raw"), None, None), "dataset-raw");
    assert_eq!(guess_genre(Some("conference_paper"), None, None), "conference-paper");
}

#[test]
fn dataset_type() {
    assert_eq!(guess_genre(Some("data_set"), None, None), "dataset");
    assert_eq!(guess_genre(Some("Dataset"), None, None), "dataset");
}

#[test]
fn dataset_repository_doi() {
    assert_eq!(
        guess_genre(Some("other"), Some("10.5061/dryad.abc123"), None),
        "dataset"
    );
    assert_eq!(
        guess_genre(Some("other"), None, Some("https://www.gbif.org/dataset/1")),
        "dataset"
    );
}

#[test]
fn figshare_articles_are_preprints() {
    assert_eq!(
        guess_genre(Some("journal-article"), Some("10.6084/m9.figshare.123"), None),
        "preprint"
    );
    assert_eq!(
        guess_genre(Some("lecture_slides"), Some("10.6084/m9.figshare.123"), None),
        "lecture-slides"
    );
}

#[test]
fn poster_and_abstract() {
    assert_eq!(guess_genre(Some("conference-poster"), None, None), "poster");
    assert_eq!(guess_genre(Some("conference-abstract"), None, None), "abstract");
}

#[test]
fn journal_article() {
    assert_eq!(guess_genre(Some("journal-article"), Some("10.1371/x"), None), "article");
}

#[test]
fn fallback_keeps_the_raw_type_case() {
    assert_eq!(guess_genre(Some("Book_Chapter"), None, None), "Book-Chapter");
    assert_eq!(guess_genre(Some(" report "), None, None), "report");
}

#[test]
fn dataset_fragment_without_type_is_still_article() {
    assert_eq!(guess_genre(None, Some("10.5061/dryad.abc"), None), "article");
}
