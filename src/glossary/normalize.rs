//! Label folding and text helpers
//!
//! Folding uppercases and strips the French accented vowels down to their
//! base letter. It is used for blacklist comparison and for the second,
//! accent-insensitive matching pass.

/// Fold a single uppercase char; everything else passes through
fn strip_accent(c: char) -> char {
    match c {
        'Á' | 'À' | 'Ä' | 'Â' => 'A',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        other => other,
    }
}

/// Uppercase + accent fold
pub fn normalize_label(input: &str) -> String {
    input
        .chars()
        .flat_map(char::to_uppercase)
        .map(strip_accent)
        .collect()
}

/// Folded text plus, for every byte of it, the byte offset of the source
/// char it came from. Lets matches on folded text map back to the original.
#[derive(Debug, Clone)]
pub struct FoldedText {
    pub text: String,
    origin: Vec<usize>,
    source_len: usize,
}

impl FoldedText {
    pub fn new(source: &str) -> Self {
        let mut text = String::with_capacity(source.len());
        let mut origin = Vec::with_capacity(source.len());
        for (offset, c) in source.char_indices() {
            for upper in c.to_uppercase() {
                let folded = strip_accent(upper);
                text.push(folded);
                origin.extend(std::iter::repeat(offset).take(folded.len_utf8()));
            }
        }
        Self {
            text,
            origin,
            source_len: source.len(),
        }
    }

    /// Map a folded byte range back onto the source text.
    /// Returns `None` when the range collapses (match inside one expansion).
    pub fn source_range(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        let s = self.origin.get(start).copied()?;
        let e = if end >= self.origin.len() {
            self.source_len
        } else {
            self.origin[end]
        };
        (s < e).then_some((s, e))
    }
}

/// Cut `input` to `budget` chars, appending `...` when something was cut
pub fn truncate(input: &str, budget: usize) -> String {
    match input.char_indices().nth(budget) {
        Some((cut, _)) => format!("{}...", &input[..cut]),
        None => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_case_and_accents() {
        assert_eq!(normalize_label("Eau potable"), "EAU POTABLE");
        assert_eq!(normalize_label("Étiage"), "ETIAGE");
        assert_eq!(normalize_label("zone humide à forêt"), "ZONE HUMIDE A FORET");
        assert_eq!(normalize_label("Ça"), "ÇA");
    }

    #[test]
    fn test_normalize_replaces_every_occurrence() {
        assert_eq!(normalize_label("éèéè"), "EEEE");
    }

    #[test]
    fn test_folded_text_maps_offsets() {
        let folded = FoldedText::new("l'été");
        assert_eq!(folded.text, "L'ETE");
        // "ETE" sits at folded bytes 2..5, source bytes 2..7
        assert_eq!(folded.source_range(2, 5), Some((2, 7)));
        assert_eq!(folded.source_range(0, 1), Some((0, 1)));
    }

    #[test]
    fn test_folded_text_expansion() {
        let folded = FoldedText::new("aß");
        assert_eq!(folded.text, "ASS");
        assert_eq!(folded.source_range(1, 3), Some((1, 3)));
        assert_eq!(folded.source_range(1, 2), None);
    }

    #[test]
    fn test_truncate_budget() {
        let long = "x".repeat(400);
        let out = truncate(&long, 350);
        assert_eq!(out.chars().count(), 353);
        assert!(out.ends_with("..."));
        assert_eq!(&out[..350], &long[..350]);

        let short = "y".repeat(300);
        assert_eq!(truncate(&short, 350), short);
        assert_eq!(truncate(&"z".repeat(350), 350), "z".repeat(350));
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate("ééé", 2), "éé...");
    }
}
