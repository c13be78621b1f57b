//! Tag autocompletion.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Limits for [`TagFinder::search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagSearchOptions {
    /// Tag strings scanned at most.
    pub query_limit: usize,
    /// Tags returned at most.
    pub return_limit: usize,
    /// Shorter keywords match too much and return nothing.
    pub min_keyword_length: usize,
}

impl Default for TagSearchOptions {
    fn default() -> Self {
        Self {
            query_limit: 75,
            return_limit: 25,
            min_keyword_length: 3,
        }
    }
}

/// Finds tags starting with a keyword in comma separated tag strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagFinder;

impl TagFinder {
    pub fn new() -> Self {
        Self
    }

    /// Tags beginning with `keyword`, first occurrence order, no duplicates.
    ///
    /// Only tag strings containing `keyword`, ignoring ASCII case, count
    /// towards `query_limit`. The prefix match itself is case sensitive.
    pub fn search<'a, I>(&self, corpus: I, keyword: &str, options: &TagSearchOptions) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if keyword.chars().count() < options.min_keyword_length {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut results = Vec::new();
        let candidates = corpus
            .into_iter()
            .filter(|tags| contains_ignore_ascii_case(tags, keyword))
            .take(options.query_limit);

        for tags in candidates {
            for tag in tags.split(',').map(str::trim) {
                if tag.starts_with(keyword) && seen.insert(tag) {
                    results.push(tag.to_string());
                }
            }
        }

        results.truncate(options.return_limit);
        results
    }
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    let (haystack, needle) = (haystack.as_bytes(), needle.as_bytes());
    needle.is_empty()
        || haystack
            .windows(needle.len())
            .any(|window| window.eq_ignore_ascii_case(needle))
}
