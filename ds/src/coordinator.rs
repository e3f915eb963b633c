//! Coordinator role
//!
//! The coordinator is the only writer of the canonical array. Each pass it
//! broadcasts the array, then receives exactly one bucket per digit value in
//! the configured order, asking for each tag in turn so arrival order never
//! matters, and concatenates them into the next pass's array.

use tracing::{debug, info};

use crate::comm::Communicator;
use crate::error::SortError;
use crate::order::SortOrder;
use crate::partition::RADIX;

/// Element counts received per digit during one pass, indexed by digit
pub type PassCounts = [usize; RADIX as usize];

/// Result of a finished distributed sort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOutcome {
    pub sorted: Vec<u64>,
    pub passes: u32,
    pub bucket_counts: Vec<PassCounts>,
}

/// The coordinator role for rank 0
#[derive(Debug, Clone, Copy, Default)]
pub struct Coordinator {
    order: SortOrder,
}

impl Coordinator {
    pub fn new(order: SortOrder) -> Self {
        Self { order }
    }

    /// Drive `passes` passes over `array`
    pub async fn run<C>(&self, comm: &mut C, array: Vec<u64>, passes: u32) -> Result<SortOutcome, SortError>
    where
        C: Communicator + ?Sized,
    {
        let len = array.len();
        info!(len, passes, order = %self.order, world_size = comm.size(), "Coordinator started");

        let mut current = array;
        let mut bucket_counts = Vec::with_capacity(passes as usize);

        for place in 1..=passes {
            comm.broadcast(&mut current).await?;

            let mut next = Vec::with_capacity(len);
            let mut counts: PassCounts = [0; RADIX as usize];
            for digit in self.order.digits() {
                let envelope = comm.receive(digit).await?;
                debug!(
                    place,
                    digit,
                    source = envelope.source,
                    count = envelope.bucket.count(),
                    "Coordinator::run: bucket received"
                );
                counts[digit as usize] = envelope.bucket.count();
                next.extend(envelope.bucket.into_elements());
            }

            if next.len() != len {
                return Err(SortError::Conservation {
                    place,
                    expected: len,
                    actual: next.len(),
                });
            }

            current = next;
            bucket_counts.push(counts);
            info!(place, passes, "Pass complete");
        }

        info!(passes, "Coordinator finished");
        Ok(SortOutcome {
            sorted: current,
            passes,
            bucket_counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::Bucket;
    use crate::comm::{COORDINATOR, LocalWorld};

    #[tokio::test]
    async fn test_reassembles_in_tag_order_not_arrival_order() {
        let mut world = LocalWorld::create(2, 32);
        let mut worker = world.pop().unwrap();
        let mut root = world.pop().unwrap();

        // Hand-rolled worker that answers digits low to high
        let worker_task = tokio::spawn(async move {
            let mut snapshot = Vec::new();
            worker.broadcast(&mut snapshot).await.unwrap();
            for digit in 0..10u8 {
                let elements: Vec<u64> = snapshot.iter().copied().filter(|v| v % 10 == digit as u64).collect();
                worker.send(COORDINATOR, digit, Bucket::new(digit, elements)).await.unwrap();
            }
        });

        let outcome = Coordinator::new(SortOrder::Descending)
            .run(&mut root, vec![3, 1, 2], 1)
            .await
            .unwrap();
        worker_task.await.unwrap();

        assert_eq!(outcome.sorted, vec![3, 2, 1]);
        assert_eq!(outcome.passes, 1);
        assert_eq!(outcome.bucket_counts, vec![[0, 1, 1, 1, 0, 0, 0, 0, 0, 0]]);
    }

    #[tokio::test]
    async fn test_zero_passes_returns_input() {
        let mut world = LocalWorld::create(2, 4);
        let mut root = world.remove(0);
        let outcome = Coordinator::default().run(&mut root, vec![0, 0], 0).await.unwrap();
        assert_eq!(outcome.sorted, vec![0, 0]);
        assert!(outcome.bucket_counts.is_empty());
    }

    #[tokio::test]
    async fn test_conservation_violation() {
        let mut world = LocalWorld::create(2, 32);
        let mut worker = world.pop().unwrap();
        let mut root = world.pop().unwrap();

        // Drops the element in bucket 5
        let worker_task = tokio::spawn(async move {
            let mut snapshot = Vec::new();
            worker.broadcast(&mut snapshot).await.unwrap();
            for digit in 0..10u8 {
                worker.send(COORDINATOR, digit, Bucket::new(digit, vec![])).await.unwrap();
            }
        });

        let err = Coordinator::default().run(&mut root, vec![5], 1).await.unwrap_err();
        worker_task.await.unwrap();
        assert!(matches!(
            err,
            SortError::Conservation {
                place: 1,
                expected: 1,
                actual: 0
            }
        ));
    }
}
