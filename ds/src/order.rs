//! Bucket reassembly order

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::partition::RADIX;

/// Order in which buckets are concatenated after each pass
///
/// `Descending` collects digit 9 first and digit 0 last, so the finished
/// array is non-increasing. `Ascending` collects 0 first and yields the
/// conventional non-decreasing result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Descending,
    Ascending,
}

impl SortOrder {
    /// Digit values in collection order
    pub fn digits(self) -> impl Iterator<Item = u8> + Send {
        (0..RADIX).map(move |i| match self {
            SortOrder::Descending => RADIX - 1 - i,
            SortOrder::Ascending => i,
        })
    }

    /// Whether `a` may precede `b` in a finished array
    pub fn in_order(self, a: u64, b: u64) -> bool {
        match self {
            SortOrder::Descending => a >= b,
            SortOrder::Ascending => a <= b,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Descending => write!(f, "descending"),
            SortOrder::Ascending => write!(f, "ascending"),
        }
    }
}
