//! Single-process radix sort used as the baseline
//!
//! Same buckets, same reassembly order, no messages. The distributed result
//! must match it element for element.

use tracing::debug;

use crate::bucket::build_bucket;
use crate::digits::pass_count;
use crate::order::SortOrder;

pub fn radix_sort(array: &[u64], order: SortOrder) -> Vec<u64> {
    let passes = pass_count(array);
    debug!(len = array.len(), passes, %order, "radix_sort: called");

    let mut current = array.to_vec();
    for place in 1..=passes {
        let mut next = Vec::with_capacity(current.len());
        for digit in order.digits() {
            next.extend(build_bucket(&current, place, digit).into_elements());
        }
        current = next;
    }
    current
}
