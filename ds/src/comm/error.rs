//! Transport error types

use thiserror::Error;

use super::{Rank, Tag};
use crate::bucket::CountMismatch;

/// Errors raised by a transport
///
/// All of them are fatal to the run; nothing retries.
#[derive(Debug, Error)]
pub enum CommError {
    #[error("Rank {rank} is outside a world of {size}")]
    InvalidRank { rank: Rank, size: usize },

    #[error("Rank {from} cannot reach rank {to}")]
    Unroutable { from: Rank, to: Rank },

    #[error("Connection to rank {rank} closed")]
    Disconnected { rank: Rank },

    #[error("Mailbox of rank {rank} closed while waiting for tag {tag}")]
    MailboxClosed { rank: Rank, tag: Tag },

    #[error("Broadcast channel of rank {rank} closed")]
    BroadcastClosed { rank: Rank },

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Unexpected frame from rank {rank}: {frame}")]
    UnexpectedFrame { rank: Rank, frame: String },

    #[error("Connection of rank {rank} sent a message claiming source {claimed}")]
    SourceMismatch { rank: Rank, claimed: Rank },

    #[error(transparent)]
    Framing(#[from] CountMismatch),

    #[error("Malformed frame: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
