//! BlacklistSet: labels that must never be annotated on this page

use std::collections::HashSet;

use super::normalize::normalize_label;

/// Set of folded labels
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlacklistSet {
    labels: HashSet<String>,
}

impl BlacklistSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a pipe-delimited label list (`"eau|Nappe phréatique"`)
    pub fn parse(list: &str) -> Self {
        list.split('|')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect()
    }

    pub fn insert(&mut self, label: &str) {
        self.labels.insert(normalize_label(label));
    }

    /// Folded comparison, so case and accents never matter
    pub fn contains(&self, label: &str) -> bool {
        !self.labels.is_empty() && self.labels.contains(&normalize_label(label))
    }

    /// Membership test for a label that is already folded
    pub fn contains_normalized(&self, normalized: &str) -> bool {
        self.labels.contains(normalized)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for BlacklistSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = Self::new();
        for label in iter {
            set.insert(label);
        }
        set
    }
}
