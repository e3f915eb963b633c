//! Wire frames for the socket transport
//!
//! Newline-delimited JSON. Each frame is a single line of JSON followed by `\n`.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use super::{CommError, Envelope, Rank, Tag};
use crate::bucket::Bucket;

/// Frames exchanged between the coordinator and a worker process
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Frame {
    /// First frame a worker sends after connecting
    Hello { rank: Rank },

    /// Root's buffer for the current broadcast
    Broadcast { values: Vec<u64> },

    /// Worker has taken its copy of the broadcast
    BroadcastAck { rank: Rank },

    /// Every rank has the broadcast; proceed
    Release,

    /// Tagged bucket; `count` precedes the values and must match them
    Message {
        source: Rank,
        tag: Tag,
        count: usize,
        values: Vec<u64>,
    },
}

impl Frame {
    pub fn message(source: Rank, tag: Tag, bucket: Bucket) -> Self {
        Frame::Message {
            source,
            tag,
            count: bucket.count(),
            values: bucket.into_elements(),
        }
    }

    /// Short name for logs and errors
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Hello { .. } => "Hello",
            Frame::Broadcast { .. } => "Broadcast",
            Frame::BroadcastAck { .. } => "BroadcastAck",
            Frame::Release => "Release",
            Frame::Message { .. } => "Message",
        }
    }

    /// Turn a `Message` frame read from rank `from`'s connection into an
    /// envelope, validating the claimed source and the bucket count
    pub fn into_envelope(self, from: Rank) -> Result<Envelope, CommError> {
        match self {
            Frame::Message { source, .. } if source != from => Err(CommError::SourceMismatch {
                rank: from,
                claimed: source,
            }),
            Frame::Message {
                source,
                tag,
                count,
                values,
            } => Ok(Envelope {
                source,
                tag,
                bucket: Bucket::from_parts(tag, count, values)?,
            }),
            other => Err(CommError::UnexpectedFrame {
                rank: from,
                frame: other.kind().to_string(),
            }),
        }
    }
}

/// Write one frame and flush
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), CommError>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(frame)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    debug!(kind = frame.kind(), bytes = json.len(), "write_frame: sent frame");
    Ok(())
}

/// Read one frame; `None` at end of stream
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, CommError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let bytes_read = reader.read_line(&mut line).await?;
    if bytes_read == 0 {
        return Ok(None);
    }
    let frame: Frame = serde_json::from_str(line.trim())?;
    debug!(kind = frame.kind(), bytes = bytes_read, "read_frame: parsed frame");
    Ok(Some(frame))
}
