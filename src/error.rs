//! Error types for GlossCore

use thiserror::Error;

use crate::dom::NodeId;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, GlossError>;

/// GlossCore error type
#[derive(Error, Debug)]
pub enum GlossError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Pattern for {label:?} could not be built: {message}")]
    Pattern { label: String, message: String },

    #[error("Marker references term {index} but the table holds {len} terms")]
    UnknownTermIndex { index: usize, len: usize },

    #[error("Region {0} already has a pass pending")]
    RegionBusy(NodeId),

    #[error("Pass has not finished: {0}")]
    PassPending(String),

    #[error("Markup error: {0}")]
    Markup(String),

    #[error("Node {0} cannot be used here")]
    InvalidNode(NodeId),
}
