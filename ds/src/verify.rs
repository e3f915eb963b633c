//! Checks applied to a finished array

use crate::order::SortOrder;

/// Every element is exactly one more than the element after it
///
/// Only meaningful for the run fixture: a shuffled `0..n` sorted in
/// descending order comes out as `n - 1, n - 2, ..., 0`.
pub fn is_consecutive_descending(array: &[u64]) -> bool {
    array.windows(2).all(|pair| pair[1].checked_add(1) == Some(pair[0]))
}

/// Each adjacent pair respects `order`
pub fn is_ordered(array: &[u64], order: SortOrder) -> bool {
    array.windows(2).all(|pair| order.in_order(pair[0], pair[1]))
}

/// Same multiset of elements
pub fn is_permutation_of(a: &[u64], b: &[u64]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

/// Outcome of checking one sorted array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    pub ordered: bool,
    pub permutation: bool,
    pub consecutive: bool,
}

impl Verification {
    /// Ordered and nothing lost or invented
    pub fn passed(&self) -> bool {
        self.ordered && self.permutation
    }
}

pub fn check(original: &[u64], sorted: &[u64], order: SortOrder) -> Verification {
    Verification {
        ordered: is_ordered(sorted, order),
        permutation: is_permutation_of(original, sorted),
        consecutive: is_consecutive_descending(sorted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_descending() {
        assert!(is_consecutive_descending(&[4, 3, 2, 1, 0]));
        assert!(is_consecutive_descending(&[7]));
        assert!(is_consecutive_descending(&[]));
        assert!(!is_consecutive_descending(&[4, 2, 1]));
        assert!(!is_consecutive_descending(&[0, 1, 2]));
        assert!(!is_consecutive_descending(&[0, u64::MAX]));
    }

    #[test]
    fn test_is_ordered() {
        assert!(is_ordered(&[9, 9, 3, 0], SortOrder::Descending));
        assert!(!is_ordered(&[9, 3, 4], SortOrder::Descending));
        assert!(is_ordered(&[1, 1, 2], SortOrder::Ascending));
    }

    #[test]
    fn test_is_permutation_of() {
        assert!(is_permutation_of(&[3, 1, 2, 1], &[1, 1, 2, 3]));
        assert!(!is_permutation_of(&[3, 1, 2], &[1, 2, 2]));
        assert!(!is_permutation_of(&[1], &[1, 1]));
    }

    #[test]
    fn test_check() {
        let v = check(&[2, 0, 1], &[2, 1, 0], SortOrder::Descending);
        assert!(v.passed());
        assert!(v.consecutive);

        let v = check(&[5, 50, 500], &[500, 50, 5], SortOrder::Descending);
        assert!(v.passed());
        assert!(!v.consecutive);

        let v = check(&[2, 0, 1], &[2, 1, 1], SortOrder::Descending);
        assert!(!v.passed());
    }
}
