//! Assignment of the digit space 0-9 to workers

use std::fmt;
use std::ops::Range;

use thiserror::Error;

/// Number of decimal digit values
pub const RADIX: u8 = 10;

/// Misuse of the partitioner
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartitionError {
    #[error("Digit space cannot be partitioned across zero workers")]
    NoWorkers,

    #[error("Worker ordinal {ordinal} is outside 1..={worker_count}")]
    OrdinalOutOfRange { ordinal: usize, worker_count: usize },
}

/// Half-open range of digit values `[lo, hi)` owned by one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitRange {
    lo: u8,
    hi: u8,
}

impl DigitRange {
    /// Range with no digits, held by surplus workers
    pub const EMPTY: DigitRange = DigitRange { lo: RADIX, hi: RADIX };

    pub fn len(&self) -> usize {
        (self.hi - self.lo) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.lo >= self.hi
    }

    pub fn contains(&self, digit: u8) -> bool {
        (self.lo..self.hi).contains(&digit)
    }

    /// Owned digits, highest first
    pub fn digits_descending(&self) -> impl Iterator<Item = u8> {
        (self.lo..self.hi).rev()
    }

    pub fn as_range(&self) -> Range<u8> {
        self.lo..self.hi
    }
}

impl fmt::Display for DigitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "[]")
        } else {
            write!(f, "[{}, {})", self.lo, self.hi)
        }
    }
}

/// Compute the digit range owned by the worker with 1-based `ordinal`
///
/// Every worker gets `ceil(10 / worker_count)` consecutive digits starting at
/// `(ordinal - 1) * step`, clamped to 10. When the count does not divide ten
/// the last non-empty range is shorter, and with more than ten workers the
/// trailing ordinals receive [`DigitRange::EMPTY`].
pub fn range_for(ordinal: usize, worker_count: usize) -> Result<DigitRange, PartitionError> {
    if worker_count == 0 {
        return Err(PartitionError::NoWorkers);
    }
    if ordinal == 0 || ordinal > worker_count {
        return Err(PartitionError::OrdinalOutOfRange { ordinal, worker_count });
    }

    let radix = RADIX as usize;
    let step = radix.div_ceil(worker_count);
    let lo = (ordinal - 1) * step;
    if lo >= radix {
        return Ok(DigitRange::EMPTY);
    }
    let hi = (lo + step).min(radix);

    Ok(DigitRange {
        lo: lo as u8,
        hi: hi as u8,
    })
}

/// All ranges for a world with `worker_count` workers, indexed by `ordinal - 1`
pub fn assignments(worker_count: usize) -> Result<Vec<DigitRange>, PartitionError> {
    (1..=worker_count).map(|ordinal| range_for(ordinal, worker_count)).collect()
}

/// Ordinal of the worker that owns `digit`
pub fn owner_of(digit: u8, worker_count: usize) -> Result<Option<usize>, PartitionError> {
    Ok(assignments(worker_count)?
        .iter()
        .position(|range| range.contains(digit))
        .map(|index| index + 1))
}
