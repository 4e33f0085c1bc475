//! TermTable: Ordered, immutable glossary catalog
//!
//! Built once per page from raw catalog records. Entries without a label are
//! dropped, the rest are ordered by label length (longest first, stable) so
//! that a long label always claims its span before any shorter label that
//! could be a substring of it.

use serde::{Deserialize, Deserializer, Serialize};

use super::normalize::normalize_label;
use crate::error::{GlossError, Result};

// =============================================================================
// Types
// =============================================================================

/// Catalog record as delivered by the loader.
///
/// Accepts both the historical French keys (`Libelle`, `Sigle`, ...) and
/// camelCase keys. `Sens` and `Id` may be strings or numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTerm {
    #[serde(default, alias = "Libelle")]
    pub label: Option<String>,
    #[serde(default, alias = "Sigle")]
    pub acronym: Option<String>,
    #[serde(default, alias = "Sens", deserialize_with = "string_or_number")]
    pub sense_number: Option<String>,
    #[serde(default, alias = "Definition")]
    pub definition: Option<String>,
    #[serde(default, alias = "Source")]
    pub source: Option<String>,
    #[serde(default, alias = "Id", deserialize_with = "string_or_number")]
    pub id: Option<String>,
}

/// A retained glossary entry. `label` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub label: String,
    pub acronym: Option<String>,
    pub sense_number: Option<String>,
    pub definition: String,
    pub source: Option<String>,
    pub id: String,
}

impl Term {
    pub fn new(label: impl Into<String>, id: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            acronym: None,
            sense_number: None,
            definition: definition.into(),
            source: None,
            id: id.into(),
        }
    }

    /// Label length in chars, the ordering key
    pub fn label_len(&self) -> usize {
        self.label.chars().count()
    }

    /// Case- and accent-folded label
    pub fn normalized_label(&self) -> String {
        normalize_label(&self.label)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Int(i64),
        Float(f64),
        Flag(bool),
    }

    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Text(s)) => Some(s),
        Some(Loose::Int(n)) => Some(n.to_string()),
        Some(Loose::Float(n)) => Some(n.to_string()),
        Some(Loose::Flag(b)) => Some(b.to_string()),
        None => None,
    })
}

// =============================================================================
// TermTable
// =============================================================================

/// Ordered glossary. A term's identity is its index here.
#[derive(Debug, Clone, Default)]
pub struct TermTable {
    terms: Vec<Term>,
}

impl TermTable {
    /// Drop label-less records and order the rest longest label first
    pub fn build(raw: Vec<RawTerm>) -> Self {
        let total = raw.len();
        let mut terms: Vec<Term> = raw
            .into_iter()
            .filter_map(|r| {
                let label = r.label?;
                if label.trim().is_empty() {
                    return None;
                }
                Some(Term {
                    label,
                    acronym: r.acronym.filter(|a| !a.is_empty()),
                    sense_number: r.sense_number.filter(|s| !s.is_empty()),
                    definition: r.definition.unwrap_or_default(),
                    source: r.source.filter(|s| !s.is_empty()),
                    id: r.id.unwrap_or_default(),
                })
            })
            .collect();

        // sort_by_key is stable: equal lengths keep catalog order
        terms.sort_by_key(|t| std::cmp::Reverse(t.label_len()));

        log::debug!(
            "term table built: {} kept, {} dropped",
            terms.len(),
            total - terms.len()
        );
        Self { terms }
    }

    /// Build from already-shaped terms (same filtering and ordering)
    pub fn from_terms(terms: Vec<Term>) -> Self {
        Self::build(
            terms
                .into_iter()
                .map(|t| RawTerm {
                    label: Some(t.label),
                    acronym: t.acronym,
                    sense_number: t.sense_number,
                    definition: Some(t.definition),
                    source: t.source,
                    id: Some(t.id),
                })
                .collect(),
        )
    }

    /// Parse a JSON array of catalog records
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Vec<RawTerm> = serde_json::from_str(json).map_err(GlossError::Catalog)?;
        Ok(Self::build(raw))
    }

    pub fn get(&self, index: usize) -> Option<&Term> {
        self.terms.get(index)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Term> {
        self.terms.iter()
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }
}

// =============================================================================
// Tests
// =============================================================================
