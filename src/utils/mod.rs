//! Utility modules supporting the harvester.
//!
//! - [`HttpClient`]: shared reqwest client with sensible defaults
//! - [`process_abstract`]: lossy normalization of abstract text for matching
//! - [`title_term_count`]: whitespace term count used to gate title lookups
//!
//! # Abstract normalization
//!
//! ```rust
//! use paper_harvest::utils::process_abstract;
//!
//! assert_eq!(process_abstract("<p>Hello  World</p>"), "hello world");
//! ```

mod http;
mod text;

pub use http::HttpClient;
pub use text::process_abstract;

/// Number of whitespace-separated terms in a title
pub fn title_term_count(title: &str) -> usize {
    title.split_whitespace().count()
}

/// Case-insensitive exact title comparison used to verify title lookups
pub fn titles_match(candidate: &str, queried: &str) -> bool {
    candidate.trim().to_lowercase() == queried.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_term_count() {
        assert_eq!(title_term_count("AI"), 1);
        assert_eq!(title_term_count("Deep  Learning"), 2);
        assert_eq!(title_term_count("Deep Learning Methods Survey"), 4);
        assert_eq!(title_term_count("   "), 0);
    }

    #[test]
    fn test_titles_match() {
        assert!(titles_match("Deep Learning Survey", "deep learning survey"));
        assert!(titles_match(" Deep Learning Survey ", "DEEP LEARNING SURVEY"));
        assert!(!titles_match("Deep Learning Survey", "Deep Learning Surveys"));
    }
}
