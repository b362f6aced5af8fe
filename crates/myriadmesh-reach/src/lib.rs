//! MyriadMesh Neighbour Reachability
//!
//! This module tracks Hello reachability for every neighbour link:
//! - Rolling 128-bit history of received/missed Hellos
//! - Sub-byte push/pop at the newest end with oldest-first eviction
//! - Two-of-last-three liveness test
//! - Loss-calibrated link cost consumed by route selection
//! - Hex diagnostics of the tracked window

pub mod config;
pub mod dump;
pub mod error;
pub mod history;
pub mod metric;

pub use config::{InterfaceCostConfig, LinkCostConfig};
pub use dump::ReachSnapshot;
pub use error::{ReachError, Result};
pub use history::ReachHistory;
pub use metric::MAX_METRIC;

/// Usable history bytes
pub const MAX_HIST_BYTES: usize = 16;

/// Usable history bits (the logical window)
pub const MAX_HIST_BITS: usize = MAX_HIST_BYTES * 8;

/// Physical ring bytes, with slack for one pushed chunk
pub const HIST_SIZE_BYTES: usize = MAX_HIST_BYTES + 4;

/// Physical ring bits
pub const HIST_SIZE_BITS: usize = HIST_SIZE_BYTES * 8;

/// Maximum bits accepted by a single push
pub const MAX_PUSH_BITS: i32 = 16;
