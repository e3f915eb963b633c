//! Worker role
//!
//! A worker owns a fixed [`DigitRange`] for the whole run. Each pass it waits
//! for the coordinator's broadcast, cuts one bucket per owned digit out of its
//! copy of the array and sends each bucket to the coordinator tagged by its
//! digit. Empty buckets are sent too: the coordinator waits on every tag.

use tracing::{debug, info};

use crate::bucket::build_bucket;
use crate::comm::{COORDINATOR, Communicator, Rank};
use crate::error::SortError;
use crate::partition::{DigitRange, range_for};

/// What a worker sent over the run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub passes: u32,
    pub buckets_sent: usize,
    pub elements_sent: usize,
}

/// The worker role for one rank
#[derive(Debug, Clone)]
pub struct Worker {
    rank: Rank,
    range: DigitRange,
}

impl Worker {
    /// Worker for `rank` in a world of `world_size` ranks
    ///
    /// The worker ordinal is the rank itself, since rank 0 is the coordinator.
    pub fn new(rank: Rank, world_size: usize) -> Result<Self, SortError> {
        debug!(rank, world_size, "Worker::new: called");
        let worker_count = world_size
            .checked_sub(1)
            .filter(|&n| n > 0)
            .ok_or(SortError::NoWorkers { world_size })?;
        let range = range_for(rank, worker_count)?;
        Ok(Self { rank, range })
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn range(&self) -> DigitRange {
        self.range
    }

    /// Run `passes` passes against the coordinator
    pub async fn run<C>(&self, comm: &mut C, passes: u32) -> Result<WorkerSummary, SortError>
    where
        C: Communicator + ?Sized,
    {
        info!(rank = self.rank, range = %self.range, passes, "Worker started");
        let mut summary = WorkerSummary::default();

        for place in 1..=passes {
            // Pass-scoped copy; dropped when the pass ends
            let mut snapshot = Vec::new();
            comm.broadcast(&mut snapshot).await?;

            for digit in self.range.digits_descending() {
                let bucket = build_bucket(&snapshot, place, digit);
                debug!(rank = self.rank, place, digit, count = bucket.count(), "Worker::run: sending bucket");
                summary.buckets_sent += 1;
                summary.elements_sent += bucket.count();
                comm.send(COORDINATOR, digit, bucket).await?;
            }
            summary.passes = place;
        }

        Ok(summary)
    }
}
