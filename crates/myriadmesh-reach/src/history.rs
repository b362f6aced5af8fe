//! Rolling Hello reachability history
//!
//! The history is a ring of [`HIST_SIZE_BITS`] physical bits of which at most
//! [`MAX_HIST_BITS`] are live. Bits are stored oldest-first, MSB-first within
//! each byte:
//!
//! ```text
//!   begin                              end
//!     v                                 v
//!   [ ... |o o o o o o o o| ... |n n n - - - - -| ... ]
//!           oldest                    newest
//! ```
//!
//! Reads (`get_mask`, `two_three`, `old_reach`) use the opposite convention:
//! the newest bit is bit 0 of the returned value.

use tracing::{debug, trace};

use crate::{HIST_SIZE_BITS, HIST_SIZE_BYTES, MAX_HIST_BITS, MAX_PUSH_BITS};

/// Reachability history of one neighbour link
#[derive(Debug, Clone)]
pub struct ReachHistory {
    /// Physical ring storage
    pub(crate) bitmap: [u8; HIST_SIZE_BYTES],

    /// Index of the oldest stored bit
    pub(crate) begin: usize,

    /// Index of the next bit to write
    pub(crate) end: usize,

    /// Number of stored bits (cached from begin/end)
    count: usize,

    /// Number of set bits among the stored ones
    count_set: usize,

    /// Newest 16 bits, bit-reversed (newest in the MSB)
    old_reach: u16,
}

impl ReachHistory {
    /// Create an empty history
    pub fn new() -> Self {
        let mut history = ReachHistory {
            bitmap: [0; HIST_SIZE_BYTES],
            begin: 0,
            end: 0,
            count: 0,
            count_set: 0,
            old_reach: 0,
        };
        history.init();
        history
    }

    /// Reset to the empty state
    pub fn init(&mut self) {
        self.begin = 0;
        self.end = 0;
        self.count_set = 0;
        self.refresh();
    }

    /// Append the low `length` bits of `value`, most significant first.
    ///
    /// Lengths outside `1..=16` are ignored. Oldest bits are evicted so that
    /// the window never exceeds [`MAX_HIST_BITS`].
    pub fn push_new(&mut self, value: u16, length: i32) {
        if length <= 0 || length > MAX_PUSH_BITS {
            debug!(length, "Ignoring reach push with out-of-range length");
            return;
        }

        let length = length as usize;
        let value = value & (0xFFFF >> (16 - length));

        let overflow = (self.count + length).saturating_sub(MAX_HIST_BITS);
        if overflow > 0 {
            self.evict_oldest(overflow);
            debug!(evicted = overflow, "Evicted oldest reach bits");
        }

        // Each round fills the free tail of the byte holding `end`:
        //
        //   value:  |      | take |   remaining - take   |
        //   byte:   | exist | take |  cleared  |
        let mut remaining = length;
        while remaining > 0 {
            let exist = self.end % 8;
            let take = (8 - exist).min(remaining);

            let chunk = ((value >> (remaining - take)) as u8) & (0xFF >> (8 - take));
            let chunk = chunk << (8 - take - exist);

            let byte = &mut self.bitmap[self.end / 8];
            *byte = (*byte & !(0xFF >> exist)) | chunk;
            self.count_set += chunk.count_ones() as usize;

            self.end = (self.end + take) % HIST_SIZE_BITS;
            remaining -= take;
        }

        self.refresh();
        trace!(
            value,
            length,
            count = self.count,
            count_set = self.count_set,
            window = %self,
            "Pushed reach bits"
        );
    }

    /// Drop up to `length` of the newest bits.
    ///
    /// Clamped to the current count; removed bits are gone for good.
    pub fn pop_new(&mut self, length: i32) {
        let requested = usize::try_from(length).unwrap_or(0);
        let length = requested.min(self.count);
        if length < requested {
            debug!(requested, available = self.count, "Clamped reach pop");
        }

        for _ in 0..length {
            self.end = (self.end + HIST_SIZE_BITS - 1) % HIST_SIZE_BITS;
            self.count_set -= self.bit_at(self.end) as usize;
        }

        self.refresh();
        trace!(
            length,
            count = self.count,
            count_set = self.count_set,
            window = %self,
            "Popped reach bits"
        );
    }

    /// Newest `min(count, 16)` bits, newest in bit 0, ANDed with `mask`
    pub fn get_mask(&self, mask: u16) -> u16 {
        let bits = self.count.min(16);
        (0..bits).fold(0u16, |acc, i| acc | ((self.bit_from_newest(i + 1) as u16) << i)) & mask
    }

    /// Whether at least two of the three newest Hellos were received
    pub fn two_three(&self) -> bool {
        (1..=3).map(|offset| self.bit_from_newest(offset)).sum::<u8>() >= 2
    }

    /// Record one received Hello after `missed_hellos` expected ones.
    ///
    /// A negative gap withdraws that many previously recorded bits first.
    pub fn record_hello(&mut self, missed_hellos: i32) {
        if missed_hellos > 0 {
            self.record_missed(missed_hellos as u32);
        } else if missed_hellos < 0 {
            self.pop_new(missed_hellos.saturating_neg());
        }
        self.push_new(1, 1);
    }

    /// Record `missed` Hellos that never arrived
    pub fn record_missed(&mut self, missed: u32) {
        // anything past a full window of zeros is indistinguishable
        let mut remaining = (missed as usize).min(MAX_HIST_BITS);
        while remaining > 0 {
            let chunk = remaining.min(MAX_PUSH_BITS as usize);
            self.push_new(0, chunk as i32);
            remaining -= chunk;
        }
    }

    /// Index of the oldest stored bit
    pub fn begin(&self) -> usize {
        self.begin
    }

    /// Index of the next bit to be written
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of stored bits
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether no bits are stored
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of received Hellos in the window
    pub fn count_set(&self) -> usize {
        self.count_set
    }

    /// Maximum number of bits retained
    pub fn capacity(&self) -> usize {
        MAX_HIST_BITS
    }

    /// Cached newest 16 bits, bit-reversed
    pub fn old_reach(&self) -> u16 {
        self.old_reach
    }

    /// Bit at a physical ring position
    pub(crate) fn bit_at(&self, pos: usize) -> u8 {
        (self.bitmap[pos / 8] >> (7 - pos % 8)) & 1
    }

    /// Bit `offset` positions back from `end` (1 is the newest); 0 past the window
    fn bit_from_newest(&self, offset: usize) -> u8 {
        if offset > self.count {
            return 0;
        }
        self.bit_at((self.end + HIST_SIZE_BITS - offset) % HIST_SIZE_BITS)
    }

    /// Advance `begin` by `n` bits, a byte-aligned chunk at a time
    fn evict_oldest(&mut self, mut n: usize) {
        while n > 0 {
            let offset = self.begin % 8;
            let take = (8 - offset).min(n);

            let bits = (self.bitmap[self.begin / 8] << offset) >> (8 - take);
            self.count_set -= bits.count_ones() as usize;

            self.begin = (self.begin + take) % HIST_SIZE_BITS;
            n -= take;
        }
    }

    /// Recompute the fields derived from begin/end
    fn refresh(&mut self) {
        self.count = (self.end + HIST_SIZE_BITS - self.begin) % HIST_SIZE_BITS;
        self.old_reach = self.get_mask(0xFFFF).reverse_bits();
    }
}

impl Default for ReachHistory {
    fn default() -> Self {
        Self::new()
    }
}
