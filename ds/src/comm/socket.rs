//! Multi-process transport over a Unix domain socket
//!
//! The coordinator binds a socket and every worker process connects to it,
//! forming a star. One reader task per connection routes inbound frames:
//! buckets go to the tag-matching mailbox, broadcast control frames go to
//! their own queue.
//!
//! A broadcast runs in three steps: the root writes `Broadcast` to every
//! worker, waits for a `BroadcastAck` from each, then writes `Release`. No
//! rank leaves the broadcast before every rank has its copy.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::BufReader;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::mailbox::{Delivery, Mailbox};
use super::messages::{Frame, read_frame, write_frame};
use super::{COORDINATOR, CommError, Communicator, Envelope, Rank, Tag};
use crate::bucket::Bucket;

/// Socket path for a run
///
/// Lives next to other per-user runtime files so concurrent runs only need
/// distinct ids.
pub fn socket_path(run_id: &str) -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("digitsort")
        .join(format!("{run_id}.sock"))
}

/// Bind the coordinator's listener, replacing a stale socket file
pub fn create_listener_at(socket_path: &Path) -> Result<UnixListener, CommError> {
    debug!(?socket_path, "create_listener_at: creating socket");

    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if socket_path.exists() {
        debug!(?socket_path, "create_listener_at: removing stale socket");
        std::fs::remove_file(socket_path)?;
    }

    let listener = UnixListener::bind(socket_path)?;
    debug!(?socket_path, "create_listener_at: socket bound");
    Ok(listener)
}

/// Remove the socket file once the run is over
pub fn cleanup_socket(socket_path: &Path) {
    if socket_path.exists() {
        debug!(?socket_path, "cleanup_socket: removing socket file");
        if let Err(e) = std::fs::remove_file(socket_path) {
            warn!(?socket_path, error = %e, "Failed to remove socket file");
        }
    }
}

/// Rank 0 endpoint of the star
pub struct SocketCoordinator {
    size: usize,
    /// Write halves indexed by rank; slot 0 is always empty
    writers: Vec<Option<OwnedWriteHalf>>,
    loopback: mpsc::Sender<Delivery>,
    mailbox: Mailbox,
    acks: mpsc::Receiver<Result<Rank, CommError>>,
    readers: Vec<JoinHandle<()>>,
}

impl SocketCoordinator {
    /// Accept one connection per worker rank
    ///
    /// Each connection must open with `Hello` naming a distinct rank in
    /// `1..size`.
    pub async fn accept(listener: &UnixListener, size: usize, channel_buffer: usize) -> Result<Self, CommError> {
        debug!(size, "SocketCoordinator::accept: called");
        let (mailbox_tx, mailbox_rx) = mpsc::channel(channel_buffer.max(1));
        let (ack_tx, ack_rx) = mpsc::channel(size.max(1));
        let mut writers: Vec<Option<OwnedWriteHalf>> = (0..size).map(|_| None).collect();
        let mut readers = Vec::with_capacity(size.saturating_sub(1));

        while readers.len() + 1 < size {
            let (stream, _) = listener.accept().await?;
            let (read_half, write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);

            let rank = match read_frame(&mut reader).await? {
                Some(Frame::Hello { rank }) => rank,
                Some(other) => {
                    return Err(CommError::Handshake(format!("expected Hello, got {}", other.kind())));
                }
                None => return Err(CommError::Handshake("worker closed before Hello".to_string())),
            };

            if rank == COORDINATOR || rank >= size {
                return Err(CommError::InvalidRank { rank, size });
            }
            if writers[rank].is_some() {
                return Err(CommError::Handshake(format!("rank {rank} connected twice")));
            }

            debug!(rank, "SocketCoordinator::accept: worker joined");
            writers[rank] = Some(write_half);
            readers.push(tokio::spawn(pump_coordinator(
                rank,
                reader,
                mailbox_tx.clone(),
                ack_tx.clone(),
            )));
        }

        info!(workers = readers.len(), "All workers connected");
        Ok(Self {
            size,
            writers,
            loopback: mailbox_tx,
            mailbox: Mailbox::new(COORDINATOR, size, mailbox_rx),
            acks: ack_rx,
            readers,
        })
    }

    async fn write_all_workers(&mut self, frame: &Frame) -> Result<(), CommError> {
        for writer in self.writers.iter_mut().flatten() {
            write_frame(writer, frame).await?;
        }
        Ok(())
    }
}

impl Drop for SocketCoordinator {
    fn drop(&mut self) {
        for reader in &self.readers {
            reader.abort();
        }
    }
}

/// Route frames arriving from one worker
async fn pump_coordinator(
    rank: Rank,
    mut reader: BufReader<OwnedReadHalf>,
    mailbox: mpsc::Sender<Delivery>,
    acks: mpsc::Sender<Result<Rank, CommError>>,
) {
    loop {
        match read_frame(&mut reader).await {
            Ok(Some(Frame::BroadcastAck { rank: acked })) => {
                if acks.send(Ok(acked)).await.is_err() {
                    break;
                }
            }
            Ok(Some(frame @ Frame::Message { .. })) => {
                let delivery = match frame.into_envelope(rank) {
                    Ok(envelope) => Delivery::Message(envelope),
                    Err(e) => Delivery::Failed(e),
                };
                if mailbox.send(delivery).await.is_err() {
                    break;
                }
            }
            Ok(Some(other)) => {
                let _ = mailbox
                    .send(Delivery::Failed(CommError::UnexpectedFrame {
                        rank,
                        frame: other.kind().to_string(),
                    }))
                    .await;
                break;
            }
            Ok(None) => {
                // Workers hang up after their last pass. An earlier hang-up
                // fails a pending broadcast or the receive of a digit this
                // worker owns.
                debug!(rank, "pump_coordinator: worker closed connection");
                let _ = acks.try_send(Err(CommError::Disconnected { rank }));
                let _ = mailbox.send(Delivery::HungUp(rank)).await;
                break;
            }
            Err(e) => {
                let _ = mailbox.send(Delivery::Failed(e)).await;
                break;
            }
        }
    }
}

#[async_trait]
impl Communicator for SocketCoordinator {
    fn rank(&self) -> Rank {
        COORDINATOR
    }

    fn size(&self) -> usize {
        self.size
    }

    async fn broadcast(&mut self, buffer: &mut Vec<u64>) -> Result<(), CommError> {
        debug!(len = buffer.len(), "SocketCoordinator::broadcast: called");
        let frame = Frame::Broadcast { values: buffer.clone() };
        self.write_all_workers(&frame).await?;

        let mut acked = vec![false; self.size];
        let mut remaining = self.size.saturating_sub(1);
        while remaining > 0 {
            let rank = self
                .acks
                .recv()
                .await
                .ok_or(CommError::BroadcastClosed { rank: COORDINATOR })??;
            match acked.get_mut(rank) {
                Some(seen) if rank != COORDINATOR && !*seen => {
                    *seen = true;
                    remaining -= 1;
                }
                _ => warn!(rank, "Ignoring unexpected broadcast acknowledgement"),
            }
        }

        self.write_all_workers(&Frame::Release).await?;
        debug!("SocketCoordinator::broadcast: released");
        Ok(())
    }

    async fn send(&mut self, destination: Rank, tag: Tag, bucket: Bucket) -> Result<(), CommError> {
        debug!(destination, tag, count = bucket.count(), "SocketCoordinator::send: called");
        if destination == COORDINATOR {
            let envelope = Envelope {
                source: COORDINATOR,
                tag,
                bucket,
            };
            return self
                .loopback
                .send(Delivery::Message(envelope))
                .await
                .map_err(|_| CommError::Disconnected { rank: COORDINATOR });
        }

        let size = self.size;
        let writer = self
            .writers
            .get_mut(destination)
            .and_then(Option::as_mut)
            .ok_or(CommError::InvalidRank {
                rank: destination,
                size,
            })?;
        write_frame(writer, &Frame::message(COORDINATOR, tag, bucket)).await
    }

    async fn receive(&mut self, tag: Tag) -> Result<Envelope, CommError> {
        debug!(tag, "SocketCoordinator::receive: called");
        self.mailbox.receive(tag).await
    }
}

/// Worker endpoint of the star
pub struct SocketWorker {
    rank: Rank,
    size: usize,
    writer: OwnedWriteHalf,
    control: mpsc::Receiver<Result<Frame, CommError>>,
    mailbox: Mailbox,
    reader: JoinHandle<()>,
}

impl SocketWorker {
    /// Connect to the coordinator's socket and announce `rank`
    pub async fn connect(socket_path: &Path, rank: Rank, size: usize, channel_buffer: usize) -> Result<Self, CommError> {
        debug!(?socket_path, rank, size, "SocketWorker::connect: called");
        if rank == COORDINATOR || rank >= size {
            return Err(CommError::InvalidRank { rank, size });
        }

        let stream = UnixStream::connect(socket_path).await?;
        let (read_half, mut writer) = stream.into_split();
        write_frame(&mut writer, &Frame::Hello { rank }).await?;

        let (control_tx, control_rx) = mpsc::channel(2);
        let (mailbox_tx, mailbox_rx) = mpsc::channel(channel_buffer.max(1));
        let reader = tokio::spawn(pump_worker(BufReader::new(read_half), control_tx, mailbox_tx));

        Ok(Self {
            rank,
            size,
            writer,
            control: control_rx,
            mailbox: Mailbox::new(rank, size, mailbox_rx),
            reader,
        })
    }

    async fn next_control(&mut self) -> Result<Frame, CommError> {
        self.control
            .recv()
            .await
            .ok_or(CommError::BroadcastClosed { rank: self.rank })?
    }
}

impl Drop for SocketWorker {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Route frames arriving from the coordinator
async fn pump_worker(
    mut reader: BufReader<OwnedReadHalf>,
    control: mpsc::Sender<Result<Frame, CommError>>,
    mailbox: mpsc::Sender<Delivery>,
) {
    loop {
        match read_frame(&mut reader).await {
            Ok(Some(frame @ (Frame::Broadcast { .. } | Frame::Release))) => {
                if control.send(Ok(frame)).await.is_err() {
                    break;
                }
            }
            Ok(Some(frame @ Frame::Message { .. })) => {
                let delivery = match frame.into_envelope(COORDINATOR) {
                    Ok(envelope) => Delivery::Message(envelope),
                    Err(e) => Delivery::Failed(e),
                };
                if mailbox.send(delivery).await.is_err() {
                    break;
                }
            }
            Ok(Some(other)) => {
                let _ = control
                    .send(Err(CommError::UnexpectedFrame {
                        rank: COORDINATOR,
                        frame: other.kind().to_string(),
                    }))
                    .await;
                break;
            }
            Ok(None) => {
                let _ = control.send(Err(CommError::Disconnected { rank: COORDINATOR })).await;
                let _ = mailbox.send(Delivery::HungUp(COORDINATOR)).await;
                break;
            }
            Err(e) => {
                let _ = control.send(Err(e)).await;
                break;
            }
        }
    }
}

#[async_trait]
impl Communicator for SocketWorker {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    async fn broadcast(&mut self, buffer: &mut Vec<u64>) -> Result<(), CommError> {
        debug!(rank = self.rank, "SocketWorker::broadcast: called");
        match self.next_control().await? {
            Frame::Broadcast { values } => *buffer = values,
            other => {
                return Err(CommError::UnexpectedFrame {
                    rank: COORDINATOR,
                    frame: other.kind().to_string(),
                });
            }
        }

        write_frame(&mut self.writer, &Frame::BroadcastAck { rank: self.rank }).await?;

        match self.next_control().await? {
            Frame::Release => {
                debug!(rank = self.rank, len = buffer.len(), "SocketWorker::broadcast: released");
                Ok(())
            }
            other => Err(CommError::UnexpectedFrame {
                rank: COORDINATOR,
                frame: other.kind().to_string(),
            }),
        }
    }

    async fn send(&mut self, destination: Rank, tag: Tag, bucket: Bucket) -> Result<(), CommError> {
        debug!(
            rank = self.rank,
            destination,
            tag,
            count = bucket.count(),
            "SocketWorker::send: called"
        );
        if destination != COORDINATOR {
            return Err(CommError::Unroutable {
                from: self.rank,
                to: destination,
            });
        }
        write_frame(&mut self.writer, &Frame::message(self.rank, tag, bucket)).await
    }

    async fn receive(&mut self, tag: Tag) -> Result<Envelope, CommError> {
        debug!(rank = self.rank, tag, "SocketWorker::receive: called");
        self.mailbox.receive(tag).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_socket_path_ends_with_run_id() {
        let path = socket_path("run-1");
        assert!(path.ends_with("digitsort/run-1.sock"));
    }

    #[tokio::test]
    async fn test_create_listener_creates_parent_dir() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("run.sock");
        let _listener = create_listener_at(&path).unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_create_listener_removes_stale_socket() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.sock");
        std::fs::write(&path, "stale").unwrap();
        assert!(create_listener_at(&path).is_ok());
    }

    #[test]
    fn test_cleanup_socket() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.sock");
        std::fs::write(&path, "x").unwrap();
        cleanup_socket(&path);
        assert!(!path.exists());

        // Missing file is fine
        cleanup_socket(&path);
    }

    #[tokio::test]
    async fn test_broadcast_and_tagged_receive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.sock");
        let listener = create_listener_at(&path).unwrap();

        let worker_paths = [path.clone(), path.clone()];
        let workers: Vec<_> = worker_paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| {
                tokio::spawn(async move {
                    let rank = i + 1;
                    let mut comm = SocketWorker::connect(&path, rank, 3, 16).await.unwrap();
                    let mut buffer = Vec::new();
                    comm.broadcast(&mut buffer).await.unwrap();
                    let tag = rank as Tag;
                    comm.send(COORDINATOR, tag, Bucket::new(tag, buffer.clone()))
                        .await
                        .unwrap();
                    buffer
                })
            })
            .collect();

        let mut root = SocketCoordinator::accept(&listener, 3, 16).await.unwrap();
        let mut buffer = vec![4, 5, 6];
        root.broadcast(&mut buffer).await.unwrap();

        let two = root.receive(2).await.unwrap();
        assert_eq!(two.source, 2);
        assert_eq!(two.bucket.elements(), &[4, 5, 6]);
        let one = root.receive(1).await.unwrap();
        assert_eq!(one.source, 1);

        for worker in workers {
            assert_eq!(worker.await.unwrap(), vec![4, 5, 6]);
        }
    }

    #[tokio::test]
    async fn test_broadcast_waits_for_every_rank() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.sock");
        let listener = create_listener_at(&path).unwrap();

        let (root, fast, slow) = tokio::join!(
            SocketCoordinator::accept(&listener, 3, 16),
            SocketWorker::connect(&path, 1, 3, 16),
            SocketWorker::connect(&path, 2, 3, 16),
        );
        let (mut root, mut fast, mut slow) = (root.unwrap(), fast.unwrap(), slow.unwrap());

        let root_task = tokio::spawn(async move {
            let mut buffer = vec![8, 1];
            root.broadcast(&mut buffer).await.unwrap();
            buffer
        });
        let fast_task = tokio::spawn(async move {
            let mut buffer = Vec::new();
            fast.broadcast(&mut buffer).await.unwrap();
            buffer
        });

        // Rank 2 has not acknowledged, so no Release has gone out
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(!root_task.is_finished());
        assert!(!fast_task.is_finished());

        let mut buffer = Vec::new();
        slow.broadcast(&mut buffer).await.unwrap();
        assert_eq!(buffer, vec![8, 1]);
        assert_eq!(root_task.await.unwrap(), vec![8, 1]);
        assert_eq!(fast_task.await.unwrap(), vec![8, 1]);
    }

    #[tokio::test]
    async fn test_worker_rank_validation() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.sock");
        let err = SocketWorker::connect(&path, 0, 3, 16).await.err().unwrap();
        assert!(matches!(err, CommError::InvalidRank { rank: 0, size: 3 }));
    }

    #[tokio::test]
    async fn test_accept_rejects_duplicate_rank() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.sock");
        let listener = create_listener_at(&path).unwrap();

        let first = SocketWorker::connect(&path, 1, 3, 16).await.unwrap();
        let second = SocketWorker::connect(&path, 1, 3, 16).await.unwrap();

        let err = SocketCoordinator::accept(&listener, 3, 16).await.err().unwrap();
        assert!(matches!(err, CommError::Handshake(_)));
        drop((first, second));
    }

    #[tokio::test]
    async fn test_worker_cannot_reach_peer() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.sock");
        let _listener = create_listener_at(&path).unwrap();

        let mut worker = SocketWorker::connect(&path, 1, 3, 16).await.unwrap();
        let err = worker.send(2, 0, Bucket::new(0, vec![])).await.unwrap_err();
        assert!(matches!(err, CommError::Unroutable { from: 1, to: 2 }));
    }
}
