//! In-process transport: one tokio task per rank
//!
//! Each rank owns a bounded mpsc mailbox for point-to-point messages and a
//! separate inbox for broadcast payloads. A shared [`Barrier`] gives
//! broadcasts their all-ranks-or-nobody completion.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Barrier, mpsc};
use tracing::debug;

use super::mailbox::{Delivery, Mailbox};
use super::{COORDINATOR, CommError, Communicator, Envelope, Rank, Tag};
use crate::bucket::Bucket;

/// Builder for a fixed set of connected [`LocalComm`] endpoints
pub struct LocalWorld;

impl LocalWorld {
    /// Create `size` endpoints, index `i` being rank `i`
    ///
    /// `channel_buffer` bounds each rank's mailbox; senders wait when it is
    /// full.
    pub fn create(size: usize, channel_buffer: usize) -> Vec<LocalComm> {
        debug!(size, channel_buffer, "LocalWorld::create: called");
        let channel_buffer = channel_buffer.max(1);
        let barrier = Arc::new(Barrier::new(size.max(1)));

        let (mailbox_txs, mailbox_rxs): (Vec<_>, Vec<_>) = (0..size).map(|_| mpsc::channel(channel_buffer)).unzip();
        let (bcast_txs, bcast_rxs): (Vec<_>, Vec<_>) = (0..size).map(|_| mpsc::channel(1)).unzip();

        mailbox_rxs
            .into_iter()
            .zip(bcast_rxs)
            .enumerate()
            .map(|(rank, (mailbox_rx, bcast_rx))| LocalComm {
                rank,
                size,
                peers: mailbox_txs.clone(),
                mailbox: Mailbox::new(rank, size, mailbox_rx),
                bcast_peers: if rank == COORDINATOR { bcast_txs.clone() } else { Vec::new() },
                bcast_rx,
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }
}

/// One rank's endpoint in a [`LocalWorld`]
pub struct LocalComm {
    rank: Rank,
    size: usize,
    peers: Vec<mpsc::Sender<Delivery>>,
    mailbox: Mailbox,
    /// Broadcast inboxes of every rank; only populated on the root
    bcast_peers: Vec<mpsc::Sender<Arc<Vec<u64>>>>,
    bcast_rx: mpsc::Receiver<Arc<Vec<u64>>>,
    barrier: Arc<Barrier>,
}

#[async_trait]
impl Communicator for LocalComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    async fn broadcast(&mut self, buffer: &mut Vec<u64>) -> Result<(), CommError> {
        debug!(rank = self.rank, "LocalComm::broadcast: called");
        if self.rank == COORDINATOR {
            let payload = Arc::new(std::mem::take(buffer));
            for (rank, peer) in self.bcast_peers.iter().enumerate().skip(1) {
                peer.send(Arc::clone(&payload))
                    .await
                    .map_err(|_| CommError::Disconnected { rank })?;
            }
            // Every peer holds its own reference until it has copied the payload out
            *buffer = Arc::unwrap_or_clone(payload);
        } else {
            let payload = self
                .bcast_rx
                .recv()
                .await
                .ok_or(CommError::BroadcastClosed { rank: self.rank })?;
            *buffer = payload.as_ref().clone();
        }

        self.barrier.wait().await;
        debug!(rank = self.rank, len = buffer.len(), "LocalComm::broadcast: released");
        Ok(())
    }

    async fn send(&mut self, destination: Rank, tag: Tag, bucket: Bucket) -> Result<(), CommError> {
        debug!(
            rank = self.rank,
            destination,
            tag,
            count = bucket.count(),
            "LocalComm::send: called"
        );
        let peer = self.peers.get(destination).ok_or(CommError::InvalidRank {
            rank: destination,
            size: self.size,
        })?;
        let envelope = Envelope {
            source: self.rank,
            tag,
            bucket,
        };
        peer.send(Delivery::Message(envelope))
            .await
            .map_err(|_| CommError::Disconnected { rank: destination })
    }

    async fn receive(&mut self, tag: Tag) -> Result<Envelope, CommError> {
        debug!(rank = self.rank, tag, "LocalComm::receive: called");
        self.mailbox.receive(tag).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_ranks() {
        let world = LocalWorld::create(4, 8);
        assert_eq!(world.len(), 4);
        for (i, comm) in world.iter().enumerate() {
            assert_eq!(comm.rank(), i);
            assert_eq!(comm.size(), 4);
        }
        assert!(world[0].is_coordinator());
        assert!(!world[1].is_coordinator());
    }

    #[tokio::test]
    async fn test_broadcast_replaces_worker_buffers() {
        let mut world = LocalWorld::create(3, 8);
        let mut workers: Vec<_> = world.drain(1..).collect();
        let mut root = world.remove(0);

        let handles: Vec<_> = workers
            .drain(..)
            .map(|mut comm| {
                tokio::spawn(async move {
                    let mut buffer = vec![99];
                    comm.broadcast(&mut buffer).await.unwrap();
                    buffer
                })
            })
            .collect();

        let mut buffer = vec![1, 2, 3];
        root.broadcast(&mut buffer).await.unwrap();
        assert_eq!(buffer, vec![1, 2, 3]);

        for handle in handles {
            assert_eq!(handle.await.unwrap(), vec![1, 2, 3]);
        }
    }

    #[tokio::test]
    async fn test_broadcast_waits_for_every_rank() {
        let mut world = LocalWorld::create(3, 8);
        let mut slow = world.pop().unwrap();
        let mut fast = world.pop().unwrap();
        let mut root = world.pop().unwrap();

        let root_task = tokio::spawn(async move {
            let mut buffer = vec![4, 2];
            root.broadcast(&mut buffer).await.unwrap();
            buffer
        });
        let fast_task = tokio::spawn(async move {
            let mut buffer = Vec::new();
            fast.broadcast(&mut buffer).await.unwrap();
            buffer
        });

        // Rank 2 has not called broadcast yet, so nobody may leave it
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(!root_task.is_finished());
        assert!(!fast_task.is_finished());

        let mut buffer = Vec::new();
        slow.broadcast(&mut buffer).await.unwrap();
        assert_eq!(buffer, vec![4, 2]);
        assert_eq!(root_task.await.unwrap(), vec![4, 2]);
        assert_eq!(fast_task.await.unwrap(), vec![4, 2]);
    }

    #[tokio::test]
    async fn test_tagged_send_and_receive() {
        let mut world = LocalWorld::create(3, 8);
        let mut second = world.pop().unwrap();
        let mut first = world.pop().unwrap();
        let mut root = world.pop().unwrap();

        second.send(COORDINATOR, 7, Bucket::new(7, vec![17, 27])).await.unwrap();
        first.send(COORDINATOR, 8, Bucket::new(8, vec![])).await.unwrap();

        let eight = root.receive(8).await.unwrap();
        assert_eq!(eight.source, 1);
        assert!(eight.bucket.is_empty());

        let seven = root.receive(7).await.unwrap();
        assert_eq!(seven.source, 2);
        assert_eq!(seven.bucket.elements(), &[17, 27]);
    }

    #[tokio::test]
    async fn test_send_to_unknown_rank() {
        let mut world = LocalWorld::create(2, 8);
        let err = world[1].send(5, 0, Bucket::new(0, vec![])).await.unwrap_err();
        assert!(matches!(err, CommError::InvalidRank { rank: 5, size: 2 }));
    }
}
