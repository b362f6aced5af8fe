//! Link cost derived from Hello reachability
//!
//! The cost is `line_cost` scaled by a loss multiplier, all in fixed point
//! with four implied decimals. Every node must compute the same value for
//! the same history or the distance-vector feasibility condition breaks, so
//! the curve below is protocol behaviour, not a tunable.
//!
//! ```text
//!   drop (1e-4)   multiplier (1e-4)
//!   [0, 1000)     10000 + 10 * d
//!   [1000, 1600)  20000 + 100 * (d - 1000)
//!   [1600, 2000)  80000 + 80000 * (d - 1600)
//!   [2000, ...]   400000 + 120000 * (d - 2000)
//! ```
//!
//! The last two segments are far steeper than the first two and the curve
//! steps down at `d = 2000`, where the third segment has already reached
//! x3200. Costs above 16% loss saturate for all but the smallest line costs.

use tracing::warn;

use crate::error::{ReachError, Result};
use crate::history::ReachHistory;

/// Largest link metric; also the saturation value
pub const MAX_METRIC: u16 = 0xFFFF;

/// Fixed-point one
const ONE_1E4: i64 = 10_000;

/// Received Hellos among the newest 16 needed to escape the recent-loss floor
const RECENT_BITS_THRESHOLD: u32 = 14;

/// Floor increase per recent Hello short of the threshold
const RECENT_LOSS_PENALTY_1E4: i64 = 20_000;

/// Drop-rate breakpoints of the loss curve
const DROP_KNEE_LOW: i64 = 1_000;
const DROP_KNEE_MID: i64 = 1_600;
const DROP_KNEE_HIGH: i64 = 2_000;

/// Delays above this inflate the cost
const DELAY_THRESHOLD: u32 = 40_000;

/// Delay at which the inflation factor would be x1
const DELAY_BASE: i64 = 20_000;

impl ReachHistory {
    /// Link cost for `line_cost` and the measured `delay`.
    ///
    /// # Panics
    /// Panics if the history is empty; use [`ReachHistory::try_metric`] when
    /// that can happen.
    pub fn metric(&self, line_cost: i16, delay: u32) -> u16 {
        assert!(
            !self.is_empty(),
            "link metric requires at least one recorded Hello"
        );

        let multiplier = loss_multiplier_1e4(drop_of_1e4(self.len(), self.count_set()))
            .max(recent_floor_1e4(self.old_reach()));

        // i16::MAX at 100% loss times u32::MAX delay does not fit in i64
        let one = i128::from(ONE_1E4);
        let mut cost = i128::from(line_cost) * i128::from(multiplier) / one;
        if delay > DELAY_THRESHOLD {
            cost = (cost * (i128::from(delay) - i128::from(DELAY_BASE)) + one) / (2 * one);
        }

        cost.clamp(0, i128::from(MAX_METRIC)) as u16
    }

    /// Checked [`ReachHistory::metric`]
    pub fn try_metric(&self, line_cost: i16, delay: u32) -> Result<u16> {
        if self.is_empty() {
            warn!("Link metric requested before any Hello was recorded");
            return Err(ReachError::EmptyHistory);
        }
        Ok(self.metric(line_cost, delay))
    }

    /// Fraction of missed Hellos in the window, in 1e-4 units
    pub fn drop_rate_1e4(&self) -> Option<u32> {
        if self.is_empty() {
            return None;
        }
        Some(drop_of_1e4(self.len(), self.count_set()) as u32)
    }
}

fn drop_of_1e4(count: usize, count_set: usize) -> i64 {
    (count - count_set) as i64 * ONE_1E4 / count as i64
}

/// Minimum multiplier imposed by losses among the newest 16 Hellos
fn recent_floor_1e4(old_reach: u16) -> i64 {
    let last_bits = old_reach.count_ones();
    if last_bits >= RECENT_BITS_THRESHOLD {
        ONE_1E4
    } else {
        ONE_1E4 + RECENT_LOSS_PENALTY_1E4 * i64::from(RECENT_BITS_THRESHOLD - last_bits)
    }
}

/// Piecewise-linear loss curve
pub(crate) fn loss_multiplier_1e4(drop: i64) -> i64 {
    if drop < DROP_KNEE_LOW {
        10_000 + 10 * drop
    } else if drop < DROP_KNEE_MID {
        20_000 + 100 * (drop - DROP_KNEE_LOW)
    } else if drop < DROP_KNEE_HIGH {
        80_000 + 80_000 * (drop - DROP_KNEE_MID)
    } else {
        400_000 + 120_000 * (drop - DROP_KNEE_HIGH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `missed` zeros followed by received Hellos up to a full window
    fn full_window(missed: u32) -> ReachHistory {
        let mut history = ReachHistory::new();
        history.record_missed(missed);
        let mut received = crate::MAX_HIST_BITS - missed as usize;
        while received > 0 {
            let chunk = received.min(16);
            history.push_new(0xFFFF, chunk as i32);
            received -= chunk;
        }
        history
    }

    #[test]
    fn test_curve_segment_starts() {
        assert_eq!(loss_multiplier_1e4(0), 10_000);
        assert_eq!(loss_multiplier_1e4(999), 19_990);
        assert_eq!(loss_multiplier_1e4(1_000), 20_000);
        assert_eq!(loss_multiplier_1e4(1_599), 79_900);
        assert_eq!(loss_multiplier_1e4(1_600), 80_000);
        assert_eq!(loss_multiplier_1e4(1_999), 32_000_000);
        assert_eq!(loss_multiplier_1e4(2_000), 400_000);
        assert_eq!(loss_multiplier_1e4(10_000), 960_400_000);
    }

    #[test]
    fn test_curve_monotone_within_segments() {
        for drop in 1..DROP_KNEE_HIGH {
            assert!(loss_multiplier_1e4(drop) >= loss_multiplier_1e4(drop - 1));
        }
        for drop in DROP_KNEE_HIGH + 1..=10_000 {
            assert!(loss_multiplier_1e4(drop) >= loss_multiplier_1e4(drop - 1));
        }
        assert!(loss_multiplier_1e4(DROP_KNEE_HIGH) < loss_multiplier_1e4(DROP_KNEE_HIGH - 1));
    }

    #[test]
    fn test_all_received() {
        let mut history = ReachHistory::new();
        history.push_new(0xFFFF, 16);
        assert_eq!(history.drop_rate_1e4(), Some(0));
        assert_eq!(history.metric(100, 0), 100);
    }

    #[test]
    fn test_all_missed_saturates() {
        let mut history = ReachHistory::new();
        history.push_new(0x0, 16);
        assert_eq!(history.len(), 16);
        assert_eq!(history.count_set(), 0);
        assert_eq!(history.metric(100, 0), MAX_METRIC);
    }

    #[test]
    fn test_short_history_hits_recent_floor() {
        let mut history = ReachHistory::new();
        history.push_new(0xFF, 8);
        // 8 recent bits: floor is 1.0 + 2.0 * 6
        assert_eq!(history.metric(100, 0), 1300);
    }

    #[test]
    fn test_single_recent_loss() {
        let mut history = ReachHistory::new();
        history.push_new(0xFFFE, 16);
        assert_eq!(history.drop_rate_1e4(), Some(625));
        assert_eq!(history.metric(100, 0), 162);
    }

    #[test]
    fn test_old_losses_follow_curve() {
        let history = full_window(12);
        assert_eq!(history.drop_rate_1e4(), Some(937));
        assert_eq!(history.metric(100, 0), 193);

        let history = full_window(16);
        assert_eq!(history.drop_rate_1e4(), Some(1250));
        assert_eq!(history.metric(100, 0), 450);

        let history = full_window(21);
        assert_eq!(history.drop_rate_1e4(), Some(1640));
        assert_eq!(history.metric(1, 0), 328);

        let history = full_window(26);
        assert_eq!(history.drop_rate_1e4(), Some(2031));
        assert_eq!(history.metric(1, 0), 412);
    }

    #[test]
    fn test_cost_steps_down_past_twenty_percent() {
        let just_below = full_window(25);
        assert_eq!(just_below.drop_rate_1e4(), Some(1953));
        assert_eq!(just_below.metric(10, 0), 28_320);

        let just_above = full_window(26);
        assert_eq!(just_above.metric(10, 0), 4_120);
    }

    #[test]
    fn test_delay_penalty() {
        let mut history = ReachHistory::new();
        history.push_new(0xFFFF, 16);
        assert_eq!(history.metric(100, 40_000), 100);
        assert_eq!(history.metric(100, 60_000), 200);
        assert_eq!(history.metric(i16::MAX, u32::MAX), MAX_METRIC);

        let mut lossy = ReachHistory::new();
        lossy.push_new(0x0, 16);
        assert_eq!(lossy.metric(i16::MAX, u32::MAX), MAX_METRIC);
        assert_eq!(lossy.metric(1, 60_000), MAX_METRIC);
    }

    #[test]
    fn test_negative_line_cost_saturates_to_zero() {
        let mut history = ReachHistory::new();
        history.push_new(0xFFFF, 16);
        assert_eq!(history.metric(-5, 0), 0);
        assert_eq!(history.metric(-5, 90_000), 0);
    }

    #[test]
    fn test_try_metric_empty() {
        let history = ReachHistory::new();
        assert!(matches!(
            history.try_metric(96, 0),
            Err(ReachError::EmptyHistory)
        ));
        assert_eq!(history.drop_rate_1e4(), None);
    }

    #[test]
    #[should_panic(expected = "at least one recorded Hello")]
    fn test_metric_empty_panics() {
        ReachHistory::new().metric(96, 0);
    }
}
