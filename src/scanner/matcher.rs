//! MatchEngine: First-occurrence term tagging
//!
//! For one term and one region:
//! 1. Raw pass: case-insensitive search for the label, bounded so the match
//!    is neither preceded nor followed by a word character. The first hit
//!    in document order is wrapped in a marker.
//! 2. Folded pass: the same search on uppercased, accent-stripped text with
//!    the folded label. This pass is independent of the first one, so a term
//!    can be tagged twice in a region when the two passes land on different
//!    spans (`ETE ... été`). Duplicates that land on the same span end up
//!    nested and are removed by cleanup.
//!
//! Blacklisted terms skip both passes. A candidate touching a marker of
//! another term is skipped and the search goes on, so a longer term that
//! claimed a span first keeps it whole and the shorter term lands on its
//! next free occurrence.
//!
//! Matches never cross a prose segment; a match spanning several text
//! leaves (e.g. `eau <b>potable</b>`) wraps each portion in its own marker.

use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

use crate::dom::{ContentTree, NodeId};
use crate::error::{GlossError, Result};
use crate::glossary::{normalize_label, BlacklistSet, FoldedText, Term};
use crate::scanner::text::{collect_segments, TextSegment};

/// Compiled program size cap for a single label pattern
pub const DEFAULT_PATTERN_SIZE_LIMIT: usize = 1 << 20;

// =============================================================================
// Types
// =============================================================================

/// Result of one tagging attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Label is in the blacklist; nothing was searched
    Blacklisted,
    /// Neither pass found the label
    NoMatch,
    /// Markers created by the raw and folded passes
    Tagged { raw: Vec<NodeId>, folded: Vec<NodeId> },
}

impl MatchOutcome {
    pub fn is_tagged(&self) -> bool {
        matches!(self, MatchOutcome::Tagged { .. })
    }

    pub fn marker_count(&self) -> usize {
        match self {
            MatchOutcome::Tagged { raw, folded } => raw.len() + folded.len(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
struct TermPatterns {
    raw: Regex,
    folded: Regex,
}

// =============================================================================
// MatchEngine
// =============================================================================

/// Tags terms into a `ContentTree`. Patterns are compiled on first use and
/// cached per label, failures included.
#[derive(Debug)]
pub struct MatchEngine {
    patterns: HashMap<String, std::result::Result<TermPatterns, String>>,
    size_limit: usize,
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchEngine {
    pub fn new() -> Self {
        Self::with_size_limit(DEFAULT_PATTERN_SIZE_LIMIT)
    }

    /// Engine whose per-label pattern programs may not exceed `limit` bytes
    pub fn with_size_limit(limit: usize) -> Self {
        Self {
            patterns: HashMap::new(),
            size_limit: limit,
        }
    }

    /// Number of labels compiled (or failed) so far
    pub fn cached_patterns(&self) -> usize {
        self.patterns.len()
    }

    /// Tag the first occurrence of `term` in `region`. Returns true when at
    /// least one marker was created.
    pub fn tag_first_occurrence(
        &mut self,
        tree: &mut ContentTree,
        region: NodeId,
        term: &Term,
        term_index: usize,
    ) -> Result<bool> {
        let outcome = self.tag_term(tree, region, term, term_index, &BlacklistSet::default())?;
        Ok(outcome.is_tagged())
    }

    /// Full tagging step: blacklist check, raw pass, folded pass
    pub fn tag_term(
        &mut self,
        tree: &mut ContentTree,
        region: NodeId,
        term: &Term,
        term_index: usize,
        blacklist: &BlacklistSet,
    ) -> Result<MatchOutcome> {
        let folded_label = normalize_label(&term.label);
        if blacklist.contains_normalized(&folded_label) {
            return Ok(MatchOutcome::Blacklisted);
        }

        let patterns = self.patterns_for(&term.label, &folded_label)?;

        let raw = tag_pass(tree, region, term_index, |segment| {
            bounded_matches_where(&patterns.raw, &segment.text, |s, e| {
                segment.is_free_for(s, e, term_index)
            })
            .next()
        })?;

        let folded = tag_pass(tree, region, term_index, |segment| {
            let folded = FoldedText::new(&segment.text);
            let hit = bounded_matches_where(&patterns.folded, &folded.text, |s, e| {
                folded
                    .source_range(s, e)
                    .is_some_and(|(s, e)| segment.is_free_for(s, e, term_index))
            })
            .find_map(|(s, e)| folded.source_range(s, e));
            hit
        })?;

        if raw.is_empty() && folded.is_empty() {
            Ok(MatchOutcome::NoMatch)
        } else {
            Ok(MatchOutcome::Tagged { raw, folded })
        }
    }

    fn patterns_for(&mut self, label: &str, folded_label: &str) -> Result<TermPatterns> {
        let limit = self.size_limit;
        let entry = self
            .patterns
            .entry(label.to_string())
            .or_insert_with(|| compile(label, folded_label, limit));

        entry.clone().map_err(|message| GlossError::Pattern {
            label: label.to_string(),
            message,
        })
    }
}

fn compile(label: &str, folded_label: &str, limit: usize) -> std::result::Result<TermPatterns, String> {
    let raw = RegexBuilder::new(&regex::escape(label))
        .case_insensitive(true)
        .size_limit(limit)
        .build()
        .map_err(|e| e.to_string())?;
    let folded = RegexBuilder::new(&regex::escape(folded_label))
        .size_limit(limit)
        .build()
        .map_err(|e| e.to_string())?;
    Ok(TermPatterns { raw, folded })
}

// =============================================================================
// Matching helpers
// =============================================================================

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Matches of `regex` in `text` that are not glued to a word character on
/// either side. Candidates failing the check are retried one char later, so
/// `eau` still finds `eau` in `eaux eau`.
pub fn bounded_matches<'a>(regex: &'a Regex, text: &'a str) -> impl Iterator<Item = (usize, usize)> + 'a {
    bounded_matches_where(regex, text, |_, _| true)
}

/// `bounded_matches` restricted to candidates `accept` agrees with. A
/// refused candidate is retried one char later, like a glued one.
pub fn bounded_matches_where<'a, A>(
    regex: &'a Regex,
    text: &'a str,
    accept: A,
) -> impl Iterator<Item = (usize, usize)> + 'a
where
    A: Fn(usize, usize) -> bool + 'a,
{
    let mut pos = 0;
    std::iter::from_fn(move || {
        while pos <= text.len() {
            let m = regex.find_at(text, pos)?;
            let (start, end) = (m.start(), m.end());
            let step = text[start..].chars().next().map_or(1, char::len_utf8);
            let before_ok = !text[..start].chars().next_back().is_some_and(is_word_char);
            let after_ok = !text[end..].chars().next().is_some_and(is_word_char);
            if before_ok && after_ok && end > start && accept(start, end) {
                pos = end;
                return Some((start, end));
            }
            pos = start + step;
        }
        None
    })
}

/// Search each prose segment in order; wrap the first hit
fn tag_pass<F>(tree: &mut ContentTree, region: NodeId, term_index: usize, find: F) -> Result<Vec<NodeId>>
where
    F: Fn(&TextSegment) -> Option<(usize, usize)>,
{
    for segment in collect_segments(tree, region) {
        if let Some((start, end)) = find(&segment) {
            return wrap_span(tree, &segment, start, end, term_index);
        }
    }
    Ok(Vec::new())
}

/// Wrap `[start, end)` of a segment in markers, splitting text leaves at the
/// span edges. One marker per touched leaf.
fn wrap_span(
    tree: &mut ContentTree,
    segment: &TextSegment,
    start: usize,
    end: usize,
    term_index: usize,
) -> Result<Vec<NodeId>> {
    let mut markers = Vec::new();
    for leaf in segment.leaves_in(start, end) {
        let local_start = start.max(leaf.range.start) - leaf.range.start;
        let local_end = end.min(leaf.range.end) - leaf.range.start;

        let mut target = leaf.node;
        if local_start > 0 {
            target = tree.split_text(target, local_start)?;
        }
        let span_len = local_end - local_start;
        if tree.text(target).map_or(0, str::len) > span_len {
            tree.split_text(target, span_len)?;
        }

        let marker = tree.create_marker(term_index);
        tree.wrap(target, marker)?;
        markers.push(marker);
    }
    Ok(markers)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn term(label: &str) -> Term {
        Term::new(label, "1", "def")
    }

    fn region(markup: &str) -> (ContentTree, NodeId) {
        let tree = ContentTree::parse_html(markup).unwrap();
        let root = tree.root();
        (tree, root)
    }

    /// Text of markers that are not inside another marker
    fn marked_texts(tree: &ContentTree, region: NodeId) -> Vec<String> {
        tree.markers_in(region)
            .into_iter()
            .filter(|&m| !tree.parent(m).is_some_and(|p| tree.is_marker(p)))
            .map(|m| tree.text_content(m))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Requirement 1: First occurrence only, case-insensitive
    // -------------------------------------------------------------------------
    #[test]
    fn test_tags_first_occurrence_only() {
        let (mut tree, root) = region("<p>Eau claire, eau trouble, EAU.</p>");
        let mut engine = MatchEngine::new();

        let tagged = engine.tag_first_occurrence(&mut tree, root, &term("eau"), 0).unwrap();
        assert!(tagged);
        assert_eq!(marked_texts(&tree, root), vec!["Eau"]);
        assert_eq!(tree.text_content(root), "Eau claire, eau trouble, EAU.");
    }

    // -------------------------------------------------------------------------
    // Requirement 2: Word boundaries
    // -------------------------------------------------------------------------
    #[test]
    fn test_respects_word_boundaries() {
        let (mut tree, root) = region("<p>Les eaux et le bureau. L'eau.</p>");
        let mut engine = MatchEngine::new();

        engine.tag_first_occurrence(&mut tree, root, &term("eau"), 0).unwrap();
        let p = tree.first_element("p").unwrap();
        assert_eq!(
            tree.inner_html(p),
            "Les eaux et le bureau. L'<span class=\"_geau_glossary_concept\" data-term-index=\"0\">\
             <span class=\"_geau_glossary_concept\" data-term-index=\"0\">eau</span></span>."
        );
    }

    #[test]
    fn test_no_match_has_no_side_effect() {
        let (mut tree, root) = region("<p>rien ici</p>");
        let before = tree.to_html(root);
        let mut engine = MatchEngine::new();

        let outcome = engine
            .tag_term(&mut tree, root, &term("eau"), 0, &BlacklistSet::default())
            .unwrap();
        assert_eq!(outcome, MatchOutcome::NoMatch);
        assert_eq!(tree.to_html(root), before);
    }

    // -------------------------------------------------------------------------
    // Requirement 3: Punctuation and one-char labels still participate
    // -------------------------------------------------------------------------
    #[test]
    fn test_punctuation_label() {
        let (mut tree, root) = region("<p>Le C++ et le C.</p>");
        let mut engine = MatchEngine::new();

        assert!(engine.tag_first_occurrence(&mut tree, root, &term("C++"), 0).unwrap());
        assert_eq!(marked_texts(&tree, root), vec!["C++"]);
    }

    #[test]
    fn test_single_char_label() {
        let (mut tree, root) = region("<p>pH et P total</p>");
        let mut engine = MatchEngine::new();

        assert!(engine.tag_first_occurrence(&mut tree, root, &term("P"), 0).unwrap());
        assert_eq!(marked_texts(&tree, root), vec!["P"]);
    }

    // -------------------------------------------------------------------------
    // Requirement 4: Folded pass is independent
    // -------------------------------------------------------------------------
    #[test]
    fn test_folded_pass_tags_unaccented_rendering() {
        let (mut tree, root) = region("<p>ETE sec puis été humide</p>");
        let mut engine = MatchEngine::new();

        let outcome = engine
            .tag_term(&mut tree, root, &term("été"), 3, &BlacklistSet::default())
            .unwrap();
        match outcome {
            MatchOutcome::Tagged { raw, folded } => {
                assert_eq!(raw.len(), 1);
                assert_eq!(folded.len(), 1);
                assert_eq!(tree.text_content(raw[0]), "été");
                assert_eq!(tree.text_content(folded[0]), "ETE");
            }
            other => panic!("expected tags, got {:?}", other),
        }
    }

    #[test]
    fn test_both_passes_on_same_span_nest() {
        let (mut tree, root) = region("<p>L'eau</p>");
        let mut engine = MatchEngine::new();

        let outcome = engine
            .tag_term(&mut tree, root, &term("Eau"), 0, &BlacklistSet::default())
            .unwrap();
        assert_eq!(outcome.marker_count(), 2);
        let markers = tree.markers_in(root);
        assert_eq!(tree.parent(markers[1]), Some(markers[0]));
    }

    // -------------------------------------------------------------------------
    // Requirement 5: Blacklist skips both passes
    // -------------------------------------------------------------------------
    #[test]
    fn test_blacklisted_term_is_skipped() {
        let (mut tree, root) = region("<p>L'Étiage et l'etiage</p>");
        let mut engine = MatchEngine::new();
        let blacklist = BlacklistSet::parse("étiage");

        let outcome = engine
            .tag_term(&mut tree, root, &term("Etiage"), 0, &blacklist)
            .unwrap();
        assert_eq!(outcome, MatchOutcome::Blacklisted);
        assert!(tree.markers_in(root).is_empty());
        assert_eq!(engine.cached_patterns(), 0);
    }

    // -------------------------------------------------------------------------
    // Requirement 6: Spans across inline elements, never across blocks
    // -------------------------------------------------------------------------
    #[test]
    fn test_match_across_inline_leaves_wraps_each_portion() {
        let (mut tree, root) = region("<p>de l'eau <b>potable</b> ici</p>");
        let mut engine = MatchEngine::new();

        engine.tag_first_occurrence(&mut tree, root, &term("eau potable"), 0).unwrap();
        assert_eq!(marked_texts(&tree, root), vec!["eau ", "potable"]);
        assert_eq!(tree.text_content(root), "de l'eau potable ici");
    }

    #[test]
    fn test_no_match_across_blocks() {
        let (mut tree, root) = region("<div><p>eau</p><p>potable</p></div>");
        let mut engine = MatchEngine::new();

        assert!(!engine.tag_first_occurrence(&mut tree, root, &term("eau potable"), 0).unwrap());
    }

    #[test]
    fn test_script_content_is_ignored() {
        let (mut tree, root) = region("<div><script>eau</script><p>de l'eau</p></div>");
        let mut engine = MatchEngine::new();

        engine.tag_first_occurrence(&mut tree, root, &term("eau"), 0).unwrap();
        assert_eq!(marked_texts(&tree, root), vec!["eau"]);
        let markers = tree.markers_in(root);
        let p = tree.first_element("p").unwrap();
        assert!(tree.is_inclusive_descendant(markers[0], p));
    }

    // -------------------------------------------------------------------------
    // Requirement 7: Spans claimed by another term are off limits
    // -------------------------------------------------------------------------
    #[test]
    fn test_shorter_label_skips_claimed_span() {
        let (mut tree, root) = region("<p>L'eau potable est vitale. Une eau trouble.</p>");
        let mut engine = MatchEngine::new();

        engine.tag_first_occurrence(&mut tree, root, &term("eau potable"), 0).unwrap();
        let outcome = engine
            .tag_term(&mut tree, root, &term("eau"), 1, &BlacklistSet::default())
            .unwrap();

        let raw = match outcome {
            MatchOutcome::Tagged { raw, .. } => raw,
            other => panic!("expected tags, got {:?}", other),
        };
        assert_eq!(raw.len(), 1);
        assert_eq!(tree.text_content(raw[0]), "eau");
        assert_eq!(tree.marker_term(tree.parent(raw[0]).unwrap()), None);
        assert_eq!(marked_texts(&tree, root), vec!["eau potable", "eau"]);
    }

    #[test]
    fn test_label_straddling_a_marker_is_refused() {
        let (mut tree, root) = region("<p>L'eau potable est rare</p>");
        let mut engine = MatchEngine::new();

        engine.tag_first_occurrence(&mut tree, root, &term("eau potable"), 0).unwrap();
        let outcome = engine
            .tag_term(&mut tree, root, &term("potable est"), 1, &BlacklistSet::default())
            .unwrap();

        assert_eq!(outcome, MatchOutcome::NoMatch);
        assert_eq!(marked_texts(&tree, root), vec!["eau potable"]);
        assert!(tree
            .markers_in(root)
            .iter()
            .all(|&m| tree.marker_term(m).map(|t| t.index) == Some(0)));
    }

    #[test]
    fn test_bounded_matches_where_retries_refused_candidate() {
        let regex = RegexBuilder::new("aa").build().unwrap();
        let hits: Vec<(usize, usize)> = bounded_matches_where(&regex, "aaa aa", |s, _| s != 4).collect();
        assert!(hits.is_empty());

        let hits: Vec<(usize, usize)> = bounded_matches_where(&regex, "x aa aa", |s, _| s > 2).collect();
        assert_eq!(hits, vec![(5, 7)]);
    }

    // -------------------------------------------------------------------------
    // Requirement 8: Pattern failures surface per term
    // -------------------------------------------------------------------------
    #[test]
    fn test_oversized_pattern_fails_and_is_cached() {
        let (mut tree, root) = region("<p>eau</p>");
        let mut engine = MatchEngine::with_size_limit(10_000);
        let huge = term(&"x".repeat(4_000));

        let err = engine.tag_first_occurrence(&mut tree, root, &huge, 0);
        assert!(matches!(err, Err(GlossError::Pattern { .. })));
        assert_eq!(engine.cached_patterns(), 1);

        assert!(engine.tag_first_occurrence(&mut tree, root, &term("eau"), 1).unwrap());
    }

    #[test]
    fn test_bounded_matches_retries_inside_word() {
        let regex = RegexBuilder::new("eau").case_insensitive(true).build().unwrap();
        let hits: Vec<(usize, usize)> = bounded_matches(&regex, "eaux beaux eau").collect();
        assert_eq!(hits, vec![(11, 14)]);
    }
}
