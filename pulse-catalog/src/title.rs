//! Title folding and DOI cleanup used for matching outputs.

/// Fold a title down to its comparable core: lowercase letters and digits
/// only, with whitespace and punctuation removed.
///
/// # Examples
///
/// ```
/// use pulse_catalog::title::normalize_title;
///
/// assert_eq!(normalize_title("The Cell: A Review."), "thecellareview");
/// assert_eq!(normalize_title("  Über-Analyse  "), "überanalyse");
/// ```
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

const DOI_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi.org/",
    "dx.doi.org/",
    "doi:",
];

/// Strip resolver URLs and `doi:` prefixes from a DOI and lowercase it.
///
/// Returns `None` when what remains does not look like a DOI.
///
/// # Examples
///
/// ```
/// use pulse_catalog::title::clean_doi;
///
/// assert_eq!(clean_doi("https://doi.org/10.1234/ABC").as_deref(), Some("10.1234/abc"));
/// assert_eq!(clean_doi("doi: 10.5555/x").as_deref(), Some("10.5555/x"));
/// assert_eq!(clean_doi("not a doi"), None);
/// ```
pub fn clean_doi(raw: &str) -> Option<String> {
    let mut doi = raw.trim().to_lowercase();
    for prefix in DOI_PREFIXES {
        if let Some(rest) = doi.strip_prefix(prefix) {
            doi = rest.trim().to_string();
            break;
        }
    }
    if is_doi(&doi) { Some(doi) } else { None }
}

/// Whether a string starts with the DOI directory indicator.
pub fn is_doi(s: &str) -> bool {
    s.starts_with("10.") && s.len() > 3
}
