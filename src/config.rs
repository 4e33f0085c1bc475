//! Configuration types and defaults for GlossCore
//!
//! Mirrors the loader script attributes (`data-target`, `data-exclude`,
//! `data-blacklist`) plus the tuning knobs of the scheduler and presenter.

use serde::{Deserialize, Serialize};

use crate::error::{GlossError, Result};
use crate::glossary::BlacklistSet;

// =============================================================================
// Scheduler
// =============================================================================

/// Strategy and slicing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerConfig {
    /// Above this many text units the pass is chunked. Default: 100
    pub chunk_threshold: usize,
    /// Time budget for one slice, in milliseconds. Default: 10.0
    pub slice_budget_ms: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            chunk_threshold: 100,
            slice_budget_ms: 10.0,
        }
    }
}

// =============================================================================
// Presenter
// =============================================================================

/// Options handed to the popover capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PopoverOptions {
    pub placement: String,
    /// Max popover width in px. Default: 500
    pub max_width: u32,
    /// Show/hide delay in ms. Default: 100
    pub delay_ms: u32,
    pub interactive: bool,
    pub arrow: bool,
    pub allow_html: bool,
    pub animation: String,
}

impl Default for PopoverOptions {
    fn default() -> Self {
        Self {
            placement: "top".to_string(),
            max_width: 500,
            delay_ms: 100,
            interactive: true,
            arrow: true,
            allow_html: true,
            animation: "shift-away".to_string(),
        }
    }
}

/// Definition rendering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PresenterConfig {
    /// Definitions longer than this many chars are cut. Default: 350
    pub definition_budget: usize,
    /// Prefix of the "read more" link; the term id is appended
    pub link_base: String,
    pub popover: PopoverOptions,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            definition_budget: 350,
            link_base: "https://glossaire.eauetbiodiversite.fr/node/".to_string(),
            popover: PopoverOptions::default(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Page-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlossaryConfig {
    /// Pipe-delimited selectors of regions to annotate (default: body)
    pub target: Option<String>,
    /// Pipe-delimited selectors of regions to strip afterwards
    pub exclude: Option<String>,
    /// Pipe-delimited labels never to annotate
    pub blacklist: Option<String>,
    pub scheduler: SchedulerConfig,
    pub presenter: PresenterConfig,
}

impl GlossaryConfig {
    /// Build from the three loader attributes. Empty strings count as unset.
    pub fn from_dataset(target: Option<&str>, exclude: Option<&str>, blacklist: Option<&str>) -> Self {
        let keep = |v: Option<&str>| v.filter(|s| !s.trim().is_empty()).map(str::to_string);
        Self {
            target: keep(target),
            exclude: keep(exclude),
            blacklist: keep(blacklist),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| GlossError::Config(e.to_string()))
    }

    /// Folded blacklist for this page
    pub fn blacklist_set(&self) -> BlacklistSet {
        self.blacklist
            .as_deref()
            .map(BlacklistSet::parse)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GlossaryConfig::default();
        assert_eq!(config.scheduler.chunk_threshold, 100);
        assert_eq!(config.scheduler.slice_budget_ms, 10.0);
        assert_eq!(config.presenter.definition_budget, 350);
        assert_eq!(config.presenter.popover.max_width, 500);
        assert!(config.target.is_none());
    }

    #[test]
    fn test_from_json_partial() {
        let config = GlossaryConfig::from_json(
            r##"{"target": "#content|article", "scheduler": {"chunkThreshold": 5}}"##,
        )
        .unwrap();
        assert_eq!(config.target.as_deref(), Some("#content|article"));
        assert_eq!(config.scheduler.chunk_threshold, 5);
        assert_eq!(config.scheduler.slice_budget_ms, 10.0);
        assert_eq!(config.presenter, PresenterConfig::default());
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            GlossaryConfig::from_json("[1, 2]"),
            Err(GlossError::Config(_))
        ));
    }

    #[test]
    fn test_from_dataset_treats_empty_as_unset() {
        let config = GlossaryConfig::from_dataset(Some(""), None, Some("eau|sol"));
        assert!(config.target.is_none());
        assert!(config.exclude.is_none());
        assert_eq!(config.blacklist_set().len(), 2);
    }
}
