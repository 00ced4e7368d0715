//! Duplicate resolution for candidate outputs.
//!
//! Candidates are folded one at a time into a growing collection, first seen
//! wins. Outputs sharing a normalized title are compared by doi, then isbn.

use pulse_catalog::types::Output;

/// What [`resolve`] did with a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Appended at the given position.
    Added(usize),
    /// Took the place of the doi-less output at the given position.
    Replaced(usize),
    /// Already represented; the collection is unchanged.
    Duplicate,
}

/// Merge `candidate` into `existing`.
///
/// A candidate whose doi is already held anywhere in `existing` (compared
/// case-insensitively) is a duplicate, so the result never carries a doi
/// twice. Otherwise:
///
/// 1. No title match: add.
/// 2. A title match without a doi is replaced by a candidate that has one,
///    keeping its position.
/// 3. Same doi: duplicate.
/// 4. Different dois: add, unless both isbns are set and equal, in which case
///    the next title match is tried. Running out of matches is a duplicate.
/// 5. A candidate without a doi that matches a title is a duplicate.
pub fn resolve(candidate: Output, existing: &mut Vec<Output>) -> Resolution {
    if candidate
        .doi
        .as_deref()
        .is_some_and(|doi| doi_held(doi, existing))
    {
        return Resolution::Duplicate;
    }

    let title_matches: Vec<usize> = existing
        .iter()
        .enumerate()
        .filter(|(_, o)| o.normalized_title() == candidate.normalized_title())
        .map(|(i, _)| i)
        .collect();

    if title_matches.is_empty() {
        existing.push(candidate);
        return Resolution::Added(existing.len() - 1);
    }

    let Some(candidate_doi) = candidate.doi.clone() else {
        return Resolution::Duplicate;
    };

    for i in title_matches {
        let current = &existing[i];
        match current.doi {
            None => {
                existing[i] = candidate;
                return Resolution::Replaced(i);
            }
            Some(ref doi) if *doi == candidate_doi => return Resolution::Duplicate,
            Some(_) => {
                let same_isbn = matches!(
                    (&candidate.isbn, &current.isbn),
                    (Some(a), Some(b)) if a == b
                );
                if !same_isbn {
                    existing.push(candidate);
                    return Resolution::Added(existing.len() - 1);
                }
            }
        }
    }

    Resolution::Duplicate
}

fn doi_held(doi: &str, existing: &[Output]) -> bool {
    existing
        .iter()
        .filter_map(|o| o.doi.as_deref())
        .any(|held| held.eq_ignore_ascii_case(doi))
}

/// Deduplicate a whole candidate list, in order.
pub fn distinct_outputs(candidates: impl IntoIterator<Item = Output>) -> Vec<Output> {
    let mut distinct = Vec::new();
    for candidate in candidates {
        resolve(candidate, &mut distinct);
    }
    distinct
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(title: &str, doi: Option<&str>, isbn: Option<&str>) -> Output {
        let mut output = Output::new(Some(title.to_string()));
        output.doi = doi.map(str::to_string);
        output.isbn = isbn.map(str::to_string);
        output
    }

    #[test]
    fn doi_replaces_title_only_output_then_duplicate_is_dropped() {
        let mut set = Vec::new();
        let p1 = output("Foo", None, None);
        let p2 = output("Foo", Some("10.1/x"), None);
        let p3 = output("Foo", Some("10.1/x"), None);
        let p2_id = p2.id.clone();

        assert_eq!(resolve(p1, &mut set), Resolution::Added(0));
        assert_eq!(resolve(p2, &mut set), Resolution::Replaced(0));
        assert_eq!(resolve(p3, &mut set), Resolution::Duplicate);
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].id, p2_id);
    }

    #[test]
    fn title_match_is_case_and_punctuation_blind() {
        let mut set = vec![output("The Cell.", None, None)];
        assert_eq!(
            resolve(output("the cell", None, None), &mut set),
            Resolution::Duplicate
        );
    }

    #[test]
    fn known_doi_under_new_title_is_skipped() {
        let mut set = vec![output("Foo", Some("10.1/x"), None)];
        assert_eq!(
            resolve(output("Foo: extended", Some("10.1/x"), None), &mut set),
            Resolution::Duplicate
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn different_dois_are_distinct_works() {
        let mut set = vec![output("Methods", Some("10.1/a"), None)];
        assert_eq!(
            resolve(output("Methods", Some("10.1/b"), None), &mut set),
            Resolution::Added(1)
        );
    }

    #[test]
    fn different_dois_with_differing_isbns_are_distinct() {
        let mut set = vec![output("Methods", Some("10.1/a"), Some("111"))];
        assert_eq!(
            resolve(output("Methods", Some("10.1/b"), Some("222")), &mut set),
            Resolution::Added(1)
        );

        let mut set = vec![output("Methods", Some("10.1/a"), None)];
        assert_eq!(
            resolve(output("Methods", Some("10.1/b"), Some("222")), &mut set),
            Resolution::Added(1)
        );
    }

    #[test]
    fn equal_isbns_fall_through_to_no_op() {
        let mut set = vec![output("Handbook", Some("10.1/a"), Some("978"))];
        assert_eq!(
            resolve(output("Handbook", Some("10.1/b"), Some("978")), &mut set),
            Resolution::Duplicate
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn equal_isbn_falls_through_to_next_title_match() {
        let mut set = vec![
            output("Handbook", Some("10.1/a"), Some("978")),
            output("Handbook", None, None),
        ];
        assert_eq!(
            resolve(output("Handbook", Some("10.1/b"), Some("978")), &mut set),
            Resolution::Replaced(1)
        );
    }

    #[test]
    fn doi_less_candidate_matching_title_is_duplicate() {
        let mut set = vec![output("Foo", Some("10.1/x"), None)];
        assert_eq!(resolve(output("Foo", None, None), &mut set), Resolution::Duplicate);
    }

    #[test]
    fn doi_held_under_another_title_blocks_replacement() {
        let outputs = distinct_outputs(vec![
            output("Bar", Some("10.1/x"), None),
            output("Foo", None, None),
            output("Foo", Some("10.1/X"), None),
        ]);
        let dois: Vec<Option<&str>> = outputs.iter().map(|o| o.doi.as_deref()).collect();
        assert_eq!(dois, vec![Some("10.1/x"), None]);
    }

    #[test]
    fn distinct_outputs_keeps_first_seen_order() {
        let outputs = distinct_outputs(vec![
            output("B", None, None),
            output("A", None, None),
            output("B", Some("10.1/b"), None),
            output("C", None, None),
        ]);
        let titles: Vec<&str> = outputs.iter().map(|o| o.display_title()).collect();
        assert_eq!(titles, vec!["B", "A", "C"]);
        assert_eq!(outputs[0].doi.as_deref(), Some("10.1/b"));
    }
}
