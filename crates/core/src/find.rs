//! Find controller interface and a reference implementation
//!
//! The text layer only reads find state: whether a search is active, the
//! query length, the highlight-all flag, the selected match and each page's
//! ascending match offsets. [`FindState`] is a self-contained controller that
//! searches page text itself.

use crate::highlight::{HighlightState, MatchRequest};
use std::collections::BTreeMap;

/// The selected match: page index plus match index within the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SelectedMatch {
    pub page_index: usize,
    pub match_index: usize,
}

impl SelectedMatch {
    pub fn new(page_index: usize, match_index: usize) -> Self {
        Self {
            page_index,
            match_index,
        }
    }
}

/// Read-only view of the find controller
pub trait FindController {
    /// A search is running
    fn is_active(&self) -> bool;

    /// Query length in characters
    fn query_len(&self) -> usize;

    /// Paint every match, not only the selected one
    fn highlight_all(&self) -> bool;

    /// The selected match, if any
    fn selected(&self) -> Option<SelectedMatch>;

    /// Ascending character offsets of the matches on `page`
    fn page_matches(&self, page: usize) -> &[usize];

    /// Highlight flags for `page`
    fn highlight_state(&self, page: usize) -> HighlightState {
        let selected = self.selected().filter(|s| s.page_index == page);
        HighlightState {
            highlight_all: self.highlight_all(),
            selected_page: selected.is_some(),
            selected_match: selected.map(|s| s.match_index),
        }
    }

    /// Paint request for `page`, or `None` while no search is active
    fn match_request(&self, page: usize) -> Option<MatchRequest<'_>> {
        if !self.is_active() {
            return None;
        }
        Some(MatchRequest {
            offsets: self.page_matches(page),
            query_len: self.query_len(),
            state: self.highlight_state(page),
        })
    }
}

fn fold(c: char, case_sensitive: bool) -> char {
    if case_sensitive {
        c
    } else {
        c.to_lowercase().next().unwrap_or(c)
    }
}

/// Character offsets of every non-overlapping occurrence of `query`
///
/// Scanning resumes after each hit. Case folding is per character so offsets
/// stay valid in the original text.
pub fn find_offsets(text: &str, query: &str, case_sensitive: bool) -> Vec<usize> {
    let needle: Vec<char> = query.chars().map(|c| fold(c, case_sensitive)).collect();
    if needle.is_empty() {
        return Vec::new();
    }
    let haystack: Vec<char> = text.chars().map(|c| fold(c, case_sensitive)).collect();

    let mut offsets = Vec::new();
    let mut start = 0;
    while start + needle.len() <= haystack.len() {
        if haystack[start..start + needle.len()] == needle[..] {
            offsets.push(start);
            start += needle.len();
        } else {
            start += 1;
        }
    }
    offsets
}

/// In-memory find controller over a set of page texts
#[derive(Debug, Clone, Default)]
pub struct FindState {
    /// Current query
    query: String,

    /// Match case exactly
    case_sensitive: bool,

    /// Paint every match
    highlight_all: bool,

    /// Full text per page
    pages: BTreeMap<usize, String>,

    /// Match offsets per page (only pages with matches)
    matches: BTreeMap<usize, Vec<usize>>,

    /// Currently selected match
    selected: Option<SelectedMatch>,
}

impl FindState {
    /// Create an idle controller
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the text of a page; re-runs an active search
    pub fn set_page_text(&mut self, page: usize, text: impl Into<String>) {
        self.pages.insert(page, text.into());
        if !self.query.is_empty() {
            self.refresh_page(page);
        }
    }

    /// Start a search; returns the total number of matches
    ///
    /// An empty query ends the search. The first match becomes selected.
    pub fn search(&mut self, query: &str) -> usize {
        if query.is_empty() {
            self.clear();
            return 0;
        }

        self.query = query.to_string();
        self.matches.clear();
        let pages: Vec<usize> = self.pages.keys().copied().collect();
        for page in pages {
            self.refresh_page(page);
        }

        self.selected = self.ordered().first().copied();
        log::debug!("search {:?}: {} matches", self.query, self.match_count());
        self.match_count()
    }

    /// End the search
    pub fn clear(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.selected = None;
    }

    /// Current query
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Toggle highlight-all
    pub fn set_highlight_all(&mut self, highlight_all: bool) {
        self.highlight_all = highlight_all;
    }

    /// Toggle case sensitivity and re-run the search
    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        if self.case_sensitive == case_sensitive {
            return;
        }
        self.case_sensitive = case_sensitive;
        if !self.query.is_empty() {
            let query = self.query.clone();
            self.search(&query);
        }
    }

    /// Total matches across pages
    pub fn match_count(&self) -> usize {
        self.matches.values().map(Vec::len).sum()
    }

    /// Select a specific match; returns false if it does not exist
    pub fn select(&mut self, page_index: usize, match_index: usize) -> bool {
        let exists = self
            .matches
            .get(&page_index)
            .is_some_and(|m| match_index < m.len());
        if exists {
            self.selected = Some(SelectedMatch::new(page_index, match_index));
        }
        exists
    }

    /// Move to the next match, wrapping around
    pub fn next_match(&mut self) -> Option<SelectedMatch> {
        self.step(true)
    }

    /// Move to the previous match, wrapping around
    pub fn previous_match(&mut self) -> Option<SelectedMatch> {
        self.step(false)
    }

    fn step(&mut self, forward: bool) -> Option<SelectedMatch> {
        let ordered = self.ordered();
        if ordered.is_empty() {
            return None;
        }

        let len = ordered.len();
        let current = self
            .selected
            .and_then(|s| ordered.iter().position(|m| *m == s));
        let next = match (current, forward) {
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
            (None, true) => 0,
            (None, false) => len - 1,
        };

        self.selected = Some(ordered[next]);
        self.selected
    }

    /// All matches in page order
    fn ordered(&self) -> Vec<SelectedMatch> {
        self.matches
            .iter()
            .flat_map(|(&page, offsets)| (0..offsets.len()).map(move |i| SelectedMatch::new(page, i)))
            .collect()
    }

    fn refresh_page(&mut self, page: usize) {
        let Some(text) = self.pages.get(&page) else {
            return;
        };
        let offsets = find_offsets(text, &self.query, self.case_sensitive);
        if offsets.is_empty() {
            self.matches.remove(&page);
        } else {
            self.matches.insert(page, offsets);
        }

        if let Some(selected) = self.selected {
            if selected.page_index == page
                && selected.match_index >= self.page_matches(page).len()
            {
                self.selected = None;
            }
        }
    }
}

impl FindController for FindState {
    fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    fn query_len(&self) -> usize {
        self.query.chars().count()
    }

    fn highlight_all(&self) -> bool {
        self.highlight_all
    }

    fn selected(&self) -> Option<SelectedMatch> {
        self.selected
    }

    fn page_matches(&self, page: usize) -> &[usize] {
        self.matches.get(&page).map(Vec::as_slice).unwrap_or(&[])
    }
}
