//! Per-digit buckets extracted from the array during a pass

use thiserror::Error;

use crate::digits::digit_at;

/// A bucket whose declared count disagrees with its payload
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Bucket for digit {digit} declares {declared} elements but carries {actual}")]
pub struct CountMismatch {
    pub digit: u8,
    pub declared: usize,
    pub actual: usize,
}

/// Elements sharing one digit value at the current place
///
/// The count travels as its own field ahead of the elements so a receiver can
/// check the payload it got against what the sender built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    digit: u8,
    count: usize,
    elements: Vec<u64>,
}

impl Bucket {
    pub fn new(digit: u8, elements: Vec<u64>) -> Self {
        Self {
            digit,
            count: elements.len(),
            elements,
        }
    }

    /// Rebuild a bucket received off the wire, validating its count
    pub fn from_parts(digit: u8, count: usize, elements: Vec<u64>) -> Result<Self, CountMismatch> {
        if count != elements.len() {
            return Err(CountMismatch {
                digit,
                declared: count,
                actual: elements.len(),
            });
        }
        Ok(Self { digit, count, elements })
    }

    pub fn digit(&self) -> u8 {
        self.digit
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn elements(&self) -> &[u64] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<u64> {
        self.elements
    }
}

/// Select every element whose digit at `place` equals `digit`
///
/// One scan; relative order is preserved, which is what keeps each pass
/// stable. A digit with no matches still yields a bucket of count 0.
pub fn build_bucket(array: &[u64], place: u32, digit: u8) -> Bucket {
    let elements = array
        .iter()
        .copied()
        .filter(|&value| digit_at(value, place) == digit)
        .collect();
    Bucket::new(digit, elements)
}
