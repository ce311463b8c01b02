use std::collections::HashSet;

use crate::models::PaperIdentity;

/// Papers of `new` that do not appear in `old`
///
/// Papers are compared on their full identity (uri, title, doi), so a paper
/// whose title or DOI changed in the catalog is enriched again. Duplicates
/// in `new` are reported once, in first-occurrence order.
pub fn find_new_papers(new: &[PaperIdentity], old: &[PaperIdentity]) -> Vec<PaperIdentity> {
    let known: HashSet<(&str, &str, &str)> = old.iter().map(PaperIdentity::identity_key).collect();
    let mut seen = HashSet::new();

    new.iter()
        .filter(|paper| {
            let key = paper.identity_key();
            !known.contains(&key) && seen.insert(key)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(uri: &str, title: &str, doi: Option<&str>) -> PaperIdentity {
        PaperIdentity::new(uri, title, doi.map(String::from))
    }

    #[test]
    fn test_set_difference() {
        let old = vec![paper("u1", "One Paper Title", Some("10.1/a"))];
        let new = vec![
            paper("u1", "One Paper Title", Some("10.1/a")),
            paper("u2", "Two Paper Title", None),
        ];

        assert_eq!(
            find_new_papers(&new, &old),
            vec![paper("u2", "Two Paper Title", None)]
        );
    }

    #[test]
    fn test_changed_doi_is_new() {
        let old = vec![paper("u1", "One Paper Title", None)];
        let new = vec![paper("u1", "One Paper Title", Some("10.1/a"))];

        assert_eq!(find_new_papers(&new, &old).len(), 1);
    }

    #[test]
    fn test_empty_and_blank_doi_are_equal() {
        let old = vec![paper("u1", "One Paper Title", Some(""))];
        let new = vec![paper("u1", "One Paper Title", None)];

        assert!(find_new_papers(&new, &old).is_empty());
    }

    #[test]
    fn test_duplicates_reported_once() {
        let new = vec![
            paper("u2", "Two Paper Title", None),
            paper("u1", "One Paper Title", None),
            paper("u2", "Two Paper Title", None),
        ];

        let found = find_new_papers(&new, &[]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].uri, "u2");
        assert_eq!(found[1].uri, "u1");
    }
}
