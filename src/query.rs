//! Question-to-tab matching.
//!
//! Matching is a plain case-insensitive substring test with no ranking:
//!
//! 1. the first tab whose title occurs in the question;
//! 2. otherwise the first tab whose URL occurs in the question;
//! 3. otherwise the first tab, if there is one.
//!
//! Step 3 means a non-empty tab list always produces a match.

use serde::Serialize;
use std::collections::VecDeque;

use crate::models::TabRecord;

/// Number of question/answer pairs [`ChatHistory`] keeps.
pub const HISTORY_LIMIT: usize = 5;

pub fn match_tab<'a>(question: &str, tabs: &'a [TabRecord]) -> Option<&'a TabRecord> {
    let question = question.to_lowercase();

    tabs.iter()
        .find(|tab| contains_nonempty(&question, &tab.title))
        .or_else(|| tabs.iter().find(|tab| contains_nonempty(&question, &tab.url)))
        .or_else(|| tabs.first())
}

fn contains_nonempty(haystack_lower: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack_lower.contains(&needle.to_lowercase())
}

/// Placeholder answer shown for the matched tab.
pub fn answer(question: &str, tab: &TabRecord) -> String {
    let url = if tab.url.is_empty() {
        "Unknown URL"
    } else {
        tab.url.as_str()
    };
    format!(
        "Simulated answer for your question '{}' based on {}.",
        question, url
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEntry {
    pub question: String,
    pub answer: String,
}

/// The most recent [`HISTORY_LIMIT`] questions and answers, oldest first.
#[derive(Debug, Default)]
pub struct ChatHistory {
    entries: VecDeque<ChatEntry>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        if self.entries.len() == HISTORY_LIMIT {
            self.entries.pop_front();
        }
        self.entries.push_back(ChatEntry {
            question: question.into(),
            answer: answer.into(),
        });
    }

    pub fn entries(&self) -> Vec<ChatEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tabs() -> Vec<TabRecord> {
        vec![
            TabRecord::new("https://docs.rs/serde", "serde - Rust"),
            TabRecord::new("https://example.com", "Example Domain"),
            TabRecord::new("https://news.ycombinator.com/", "Hacker News"),
        ]
    }

    #[test]
    fn test_match_by_title_case_insensitive() {
        let tabs = tabs();
        let hit = match_tab("What is on HACKER NEWS today?", &tabs).unwrap();
        assert_eq!(hit.title, "Hacker News");
    }

    #[test]
    fn test_match_by_url() {
        let tabs = tabs();
        let hit = match_tab("tell me about https://example.com", &tabs).unwrap();
        assert_eq!(hit.url, "https://example.com");

        let hit = match_tab("summarize https://news.ycombinator.com/ please", &tabs).unwrap();
        assert_eq!(hit.title, "Hacker News");
    }

    #[test]
    fn test_url_must_appear_verbatim() {
        let tabs = vec![
            TabRecord::new("https://a.dev", "Alpha"),
            TabRecord::new("https://example.com/", "Ex"),
        ];
        // "example.com" alone is not the URL, so this falls back to the first tab.
        let hit = match_tab("tell me about example.com", &tabs).unwrap();
        assert_eq!(hit.url, "https://a.dev");

        let hit = match_tab("tell me about HTTPS://EXAMPLE.COM/ now", &tabs).unwrap();
        assert_eq!(hit.url, "https://example.com/");
    }

    #[test]
    fn test_title_pass_runs_before_url_pass() {
        let tabs = vec![
            TabRecord::new("https://example.com", "Example Domain"),
            TabRecord::new("https://other.org", "Notes"),
        ];
        let hit = match_tab("my notes about https://example.com", &tabs).unwrap();
        assert_eq!(hit.title, "Notes");
    }

    #[test]
    fn test_first_match_in_list_order() {
        let tabs = vec![
            TabRecord::new("https://a.dev", "Rust"),
            TabRecord::new("https://b.dev", "Rust"),
        ];
        let hit = match_tab("rust?", &tabs).unwrap();
        assert_eq!(hit.url, "https://a.dev");
    }

    #[test]
    fn test_empty_list_is_none() {
        assert!(match_tab("random unrelated text", &[]).is_none());
    }

    #[test]
    fn test_fallback_to_first_tab() {
        let tabs = vec![
            TabRecord::new("https://a.dev", "Alpha"),
            TabRecord::new("https://b.dev", "Beta"),
        ];
        let hit = match_tab("nothing related here", &tabs).unwrap();
        assert_eq!(hit.title, "Alpha");
    }

    #[test]
    fn test_empty_fields_never_match() {
        let tabs = vec![
            TabRecord::new("https://a.dev", "Alpha"),
            TabRecord::new("", ""),
        ];
        let hit = match_tab("anything", &tabs).unwrap();
        assert_eq!(hit.title, "Alpha");
    }

    #[test]
    fn test_answer_text() {
        let tab = TabRecord::new("https://example.com", "Example");
        assert_eq!(
            answer("what is this?", &tab),
            "Simulated answer for your question 'what is this?' based on https://example.com."
        );
        assert!(answer("q", &TabRecord::new("", "")).ends_with("based on Unknown URL."));
    }

    #[test]
    fn test_history_keeps_last_five() {
        let mut history = ChatHistory::new();
        assert!(history.is_empty());
        for i in 0..7 {
            history.push(format!("q{}", i), format!("a{}", i));
        }
        let entries = history.entries();
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(entries.first().unwrap().question, "q2");
        assert_eq!(entries.last().unwrap().answer, "a6");
    }
}
