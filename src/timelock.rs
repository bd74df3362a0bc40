//! Derivation of the asymmetric timelocks governing both legs of a swap.

use crate::connector::bitcoin::{self, BitcoinChain};
use std::convert::TryFrom;

/// Number of inter-block intervals sampled when estimating the median
/// Bitcoin block time.
pub const MEDIAN_WINDOW: usize = 10;

/// Standard confirmation target in the Bitcoin ecosystem.
const DEFAULT_CONFIRMATIONS: u16 = 6;

/// A BIP-68 block-based relative timelock.
///
/// Only the type-flag 0 (block) encoding is supported, which limits the
/// value to 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelativeLock(u16);

impl RelativeLock {
    pub fn as_u16(self) -> u16 {
        self.0
    }

    pub fn as_u32(self) -> u32 {
        u32::from(self.0)
    }

    pub fn as_blocks(self) -> u64 {
        u64::from(self.0)
    }
}

impl From<u16> for RelativeLock {
    fn from(blocks: u16) -> Self {
        RelativeLock(blocks)
    }
}

impl TryFrom<u32> for RelativeLock {
    type Error = OutOfRange;

    fn try_from(blocks: u32) -> Result<Self, Self::Error> {
        u16::try_from(blocks)
            .map(RelativeLock)
            .map_err(|_| OutOfRange(blocks))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("relative timelock of {0} blocks exceeds the BIP-68 block-based range")]
pub struct OutOfRange(u32);

/// The confirmation horizon a party is willing to wait for the
/// counterparty, expressed in Bitcoin blocks.
///
/// The party acting second halves its own horizon so that its refund
/// window opens strictly before the counterparty's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Horizon(u16);

impl Horizon {
    pub fn new(blocks: u16) -> Self {
        Horizon(blocks)
    }

    pub fn halved(self) -> Horizon {
        Horizon(std::cmp::max(self.0 / 2, 1))
    }

    /// The Bitcoin-leg timelock, in blocks.
    pub fn blocks(self) -> RelativeLock {
        RelativeLock(self.0)
    }

    /// The Bitshares-leg timelock, in seconds.
    ///
    /// Scales the horizon by the median inter-block time observed over the
    /// last [`MEDIAN_WINDOW`] intervals. Repeated calls may yield different
    /// values as the chain moves.
    pub async fn seconds<C>(self, connector: &C) -> Result<u64, bitcoin::Error>
    where
        C: BitcoinChain,
    {
        let timestamps = connector.recent_block_timestamps(MEDIAN_WINDOW + 1).await?;
        let median = median_interval(&timestamps).ok_or(bitcoin::Error::NotFound)?;

        Ok(u64::from(self.0) * median)
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Horizon(DEFAULT_CONFIRMATIONS)
    }
}

/// Median of the intervals between consecutive block timestamps.
///
/// Timestamps are expected newest-first. Bitcoin's median-time-past rule
/// permits non-monotonic timestamps, hence the saturating difference.
fn median_interval(timestamps: &[u64]) -> Option<u64> {
    if timestamps.len() < 2 {
        return None;
    }

    let mut intervals: Vec<u64> = timestamps
        .windows(2)
        .map(|pair| pair[0].saturating_sub(pair[1]))
        .collect();
    intervals.sort_unstable();

    Some(intervals[intervals.len() / 2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_regular_intervals() {
        let timestamps: Vec<u64> = (0..11).map(|i| 600_000 - i * 600).collect();

        assert_eq!(median_interval(&timestamps), Some(600));
    }

    #[test]
    fn median_ignores_outliers() {
        // one 2-hour gap amongst otherwise regular 10-minute blocks
        let timestamps = vec![
            20_000, 19_400, 18_800, 18_200, 10_999, 10_399, 9_799, 9_199, 8_599, 7_999, 7_399,
        ];

        assert_eq!(median_interval(&timestamps), Some(600));
    }

    #[test]
    fn median_of_out_of_order_timestamps_does_not_underflow() {
        let timestamps = vec![1_000, 1_200];

        assert_eq!(median_interval(&timestamps), Some(0));
    }

    #[test]
    fn too_few_timestamps_yield_nothing() {
        assert_eq!(median_interval(&[42]), None);
        assert_eq!(median_interval(&[]), None);
    }

    #[test]
    fn halving_never_reaches_zero() {
        assert_eq!(Horizon::new(6).halved(), Horizon::new(3));
        assert_eq!(Horizon::new(1).halved(), Horizon::new(1));
    }

    #[test]
    fn relative_lock_accepts_the_bip68_boundaries() {
        use std::convert::TryFrom;

        assert!(RelativeLock::try_from(0u32).is_ok());
        assert!(RelativeLock::try_from(65_535u32).is_ok());
        assert!(RelativeLock::try_from(65_536u32).is_err());
    }
}
