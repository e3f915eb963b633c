//! Tag-matching receive queue

use std::collections::{HashSet, VecDeque};

use tokio::sync::mpsc;
use tracing::debug;

use super::{COORDINATOR, CommError, Envelope, Rank, Tag};
use crate::partition::owner_of;

/// Items a transport delivers into a mailbox
#[derive(Debug)]
pub(crate) enum Delivery {
    Message(Envelope),
    /// The connection to this rank closed; nothing more will come from it
    HungUp(Rank),
    /// The transport failed while reading
    Failed(CommError),
}

/// Inbound messages for one rank
///
/// Messages are taken off the channel in arrival order; those whose tag is
/// not the one currently asked for wait in `pending` until a receive for
/// their tag comes along. A transport delivers everything a peer sent before
/// that peer's `HungUp`, so once the only rank able to send a tag has hung up
/// and nothing with that tag is pending, the receive fails instead of waiting.
pub(crate) struct Mailbox {
    rank: Rank,
    size: usize,
    rx: mpsc::Receiver<Delivery>,
    pending: VecDeque<Envelope>,
    hung_up: HashSet<Rank>,
}

impl Mailbox {
    pub(crate) fn new(rank: Rank, size: usize, rx: mpsc::Receiver<Delivery>) -> Self {
        Self {
            rank,
            size,
            rx,
            pending: VecDeque::new(),
            hung_up: HashSet::new(),
        }
    }

    /// Rank that sends `tag` to this mailbox: the digit's owner on the
    /// coordinator, the coordinator on a worker
    fn sender_of(&self, tag: Tag) -> Option<Rank> {
        if self.rank == COORDINATOR {
            owner_of(tag, self.size.saturating_sub(1)).ok().flatten()
        } else {
            Some(COORDINATOR)
        }
    }

    fn check_sender(&self, tag: Tag) -> Result<(), CommError> {
        match self.sender_of(tag) {
            Some(sender) if self.hung_up.contains(&sender) => Err(CommError::Disconnected { rank: sender }),
            _ => Ok(()),
        }
    }

    pub(crate) async fn receive(&mut self, tag: Tag) -> Result<Envelope, CommError> {
        let held = self.pending.iter().position(|envelope| envelope.tag == tag);
        if let Some(envelope) = held.and_then(|position| self.pending.remove(position)) {
            debug!(rank = self.rank, tag, "Mailbox::receive: matched held message");
            return Ok(envelope);
        }
        self.check_sender(tag)?;

        loop {
            match self.rx.recv().await {
                Some(Delivery::Message(envelope)) if envelope.tag == tag => return Ok(envelope),
                Some(Delivery::Message(envelope)) => {
                    debug!(
                        rank = self.rank,
                        wanted = tag,
                        held = envelope.tag,
                        "Mailbox::receive: holding message for later"
                    );
                    self.pending.push_back(envelope);
                }
                Some(Delivery::HungUp(peer)) => {
                    debug!(rank = self.rank, peer, wanted = tag, "Mailbox::receive: peer hung up");
                    self.hung_up.insert(peer);
                    self.check_sender(tag)?;
                }
                Some(Delivery::Failed(e)) => return Err(e),
                None => return Err(CommError::MailboxClosed { rank: self.rank, tag }),
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn held(&self) -> usize {
        self.pending.len()
    }
}
