//! Message passing between ranks
//!
//! Ranks share nothing; they talk through three primitives:
//! - **Broadcast:** collective, rank 0's buffer replaces every other rank's
//! - **Send:** point-to-point, tagged by digit value
//! - **Receive:** blocking, filtered by exact tag, from any source
//!
//! Two transports implement [`Communicator`]: [`local`] runs every rank as a
//! tokio task in one process, [`socket`] runs every rank as its own process
//! joined over a Unix domain socket.

mod error;
mod mailbox;
pub mod local;
pub mod messages;
pub mod socket;

use async_trait::async_trait;

use crate::bucket::Bucket;

pub use error::CommError;
pub use local::{LocalComm, LocalWorld};
pub use messages::Frame;
pub use socket::{SocketCoordinator, SocketWorker};

/// Position of a process in the world; rank 0 is the coordinator
pub type Rank = usize;

/// Message tag, the digit value a bucket belongs to
pub type Tag = u8;

/// Rank that owns the canonical array and roots every broadcast
pub const COORDINATOR: Rank = 0;

/// A received bucket together with its routing information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub source: Rank,
    pub tag: Tag,
    pub bucket: Bucket,
}

/// Message-passing operations one rank can issue
#[async_trait]
pub trait Communicator: Send {
    /// This rank
    fn rank(&self) -> Rank;

    /// Number of ranks, coordinator included
    fn size(&self) -> usize;

    /// Collective broadcast rooted at [`COORDINATOR`]
    ///
    /// Every rank must call this the same number of times. On the root the
    /// buffer is left as-is; on every other rank it is replaced by the root's.
    /// The call completes for no rank until all ranks have made it.
    async fn broadcast(&mut self, buffer: &mut Vec<u64>) -> Result<(), CommError>;

    /// Send a bucket to `destination` under `tag`
    async fn send(&mut self, destination: Rank, tag: Tag, bucket: Bucket) -> Result<(), CommError>;

    /// Block until a message with exactly `tag` arrives from any rank
    ///
    /// Messages carrying other tags that arrive first are held back and
    /// returned by later calls asking for their tag.
    async fn receive(&mut self, tag: Tag) -> Result<Envelope, CommError>;

    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR
    }
}
