//! Sort error types

use thiserror::Error;

use crate::comm::CommError;
use crate::partition::PartitionError;

/// Errors that end a distributed sort
#[derive(Debug, Error)]
pub enum SortError {
    #[error("World of {world_size} rank(s) has no workers; at least 2 ranks are required")]
    NoWorkers { world_size: usize },

    #[error("Pass {place} reassembled {actual} elements, expected {expected}")]
    Conservation { place: u32, expected: usize, actual: usize },

    #[error("Rank {rank} finished without a result")]
    MissingOutcome { rank: usize },

    #[error("Rank task failed: {0}")]
    Join(String),

    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error(transparent)]
    Comm(#[from] CommError),
}
