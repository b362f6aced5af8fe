//! Reachability error types

use thiserror::Error;

/// Reachability-specific errors
#[derive(Error, Debug)]
pub enum ReachError {
    #[error("Link metric requested for an empty reachability history")]
    EmptyHistory,

    #[error("Invalid line cost {cost} for {interface}")]
    InvalidLineCost { interface: String, cost: i16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for reachability operations
pub type Result<T> = std::result::Result<T, ReachError>;
