//! Hex diagnostics for reachability histories
//!
//! The window is rendered straight from the physical ring, one hex digit per
//! nibble. Partial first and last digits are shown whole; `begin_mask` and
//! `end_mask` tell which of their bits are live. A window that wraps the end
//! of the ring is rendered as two runs. None of this has protocol meaning.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::history::ReachHistory;
use crate::HIST_SIZE_BYTES;

/// Valid bits of the first digit, by `begin % 4`
const BEGIN_MASKS: [char; 4] = ['F', '7', '3', '1'];

/// Valid bits of the last digit, by `end % 4`
const END_MASKS: [char; 4] = ['F', '8', 'C', 'E'];

/// Point-in-time view of a history, for status output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachSnapshot {
    pub begin: usize,
    pub end: usize,
    pub count: usize,
    pub count_set: usize,
    pub old_reach: u16,
    pub window: String,
}

impl ReachHistory {
    /// Live bits of the first rendered digit
    pub fn begin_mask(&self) -> char {
        BEGIN_MASKS[self.begin % 4]
    }

    /// Live bits of the last rendered digit
    pub fn end_mask(&self) -> char {
        END_MASKS[self.end % 4]
    }

    /// Hex runs covering the window, oldest first; empty when nothing is stored
    pub fn segments(&self) -> Vec<String> {
        if self.is_empty() {
            return Vec::new();
        }

        let hex = hex::encode(self.bitmap);
        let first = self.begin / 4;
        let last = (self.end + 3) / 4;

        if self.begin < self.end {
            vec![hex[first..last].to_string()]
        } else {
            vec![
                hex[first..HIST_SIZE_BYTES * 2].to_string(),
                hex[..last].to_string(),
            ]
        }
    }

    /// Newest 16 bits as bare lowercase hex
    pub fn dump(&self) -> String {
        format!("{:x}", self.get_mask(0xFFFF))
    }

    /// Capture counters and the rendered window
    pub fn snapshot(&self) -> ReachSnapshot {
        ReachSnapshot {
            begin: self.begin(),
            end: self.end(),
            count: self.len(),
            count_set: self.count_set(),
            old_reach: self.old_reach(),
            window: self.to_string(),
        }
    }
}

impl fmt::Display for ReachHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.begin_mask())?;
        if self.is_empty() {
            f.write_str("-")?;
        } else {
            for segment in self.segments() {
                f.write_str(&segment)?;
            }
        }
        write!(f, " {}", self.end_mask())
    }
}
