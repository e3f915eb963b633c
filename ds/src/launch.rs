//! Process launch for the socket transport
//!
//! The `ds sort` process becomes rank 0: it binds the run's socket, spawns one
//! `ds worker` child per worker rank and accepts their connections. Each
//! child joins with [`run_worker`].

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use eyre::{Context, Result, eyre};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::comm::socket::{cleanup_socket, create_listener_at, socket_path};
use crate::comm::{SocketCoordinator, SocketWorker};
use crate::config::Config;
use crate::coordinator::SortOutcome;
use crate::sort::run_rank;

/// Socket path for a new run, honouring `transport.socket-dir`
fn run_socket_path(config: &Config, run_id: &str) -> PathBuf {
    match &config.transport.socket_dir {
        Some(dir) => dir.join(format!("{run_id}.sock")),
        None => socket_path(run_id),
    }
}

fn spawn_worker(exe: &Path, socket: &Path, rank: usize, config: &Config) -> Result<Child> {
    let mut command = Command::new(exe);
    if let Some(level) = &config.log_level {
        command.arg("--log-level").arg(level);
    }
    command
        .arg("worker")
        .arg("--socket")
        .arg(socket)
        .arg("--rank")
        .arg(rank.to_string())
        .arg("--world-size")
        .arg(config.sort.world_size.to_string())
        .arg("--channel-buffer")
        .arg(config.transport.channel_buffer.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .kill_on_drop(true);

    let child = command
        .spawn()
        .with_context(|| format!("Failed to spawn worker process for rank {rank}"))?;
    debug!(rank, pid = ?child.id(), "spawn_worker: worker spawned");
    Ok(child)
}

/// Sort `input` with one child process per worker rank
///
/// Returns the outcome and the time spent in the sort itself, excluding
/// process start-up and connection set-up.
pub async fn sort_over_socket(input: Vec<u64>, config: &Config) -> Result<(SortOutcome, Duration)> {
    let world_size = config.sort.world_size;
    let run_id = Uuid::now_v7().to_string();
    let socket = run_socket_path(config, &run_id);
    info!(%run_id, ?socket, world_size, "Launching worker processes");

    let listener = create_listener_at(&socket).context("Failed to bind run socket")?;
    let exe = std::env::current_exe().context("Failed to get current executable")?;

    let mut children = Vec::with_capacity(world_size.saturating_sub(1));
    for rank in 1..world_size {
        match spawn_worker(&exe, &socket, rank, config) {
            Ok(child) => children.push(child),
            Err(e) => {
                cleanup_socket(&socket);
                return Err(e);
            }
        }
    }

    let result = async {
        let mut comm = tokio::time::timeout(
            config.transport.connect_timeout(),
            SocketCoordinator::accept(&listener, world_size, config.transport.channel_buffer),
        )
        .await
        .map_err(|_| eyre!("Timed out waiting for {} worker(s) to connect", world_size - 1))??;

        let start = Instant::now();
        let outcome = run_rank(&mut comm, input, config.sort.order)
            .await?
            .ok_or_else(|| eyre!("Coordinator finished without a result"))?;
        Ok::<_, eyre::Report>((outcome, start.elapsed()))
    }
    .await;

    if result.is_err() {
        for child in children.iter_mut() {
            let _ = child.start_kill();
        }
    }
    let statuses = wait_all(&mut children).await;
    cleanup_socket(&socket);

    let result = result?;
    for (i, status) in statuses.into_iter().enumerate() {
        let status = status?;
        if !status.success() {
            return Err(eyre!("Worker rank {} exited with {}", i + 1, status));
        }
    }
    Ok(result)
}

async fn wait_all(children: &mut [Child]) -> Vec<Result<ExitStatus>> {
    let mut statuses = Vec::with_capacity(children.len());
    for child in children.iter_mut() {
        let status = child.wait().await.context("Failed to wait for worker process");
        if let Ok(status) = &status {
            if !status.success() {
                warn!(pid = ?child.id(), %status, "Worker process exited unsuccessfully");
            }
        }
        statuses.push(status);
    }
    statuses
}

/// Body of a `ds worker` process
pub async fn run_worker(socket: &Path, rank: usize, world_size: usize, channel_buffer: usize) -> Result<()> {
    info!(rank, world_size, ?socket, "Worker process joining run");
    let mut comm = SocketWorker::connect(socket, rank, world_size, channel_buffer)
        .await
        .with_context(|| format!("Failed to connect to {}", socket.display()))?;

    // Order only matters on the coordinator
    run_rank(&mut comm, Vec::new(), Default::default()).await?;
    Ok(())
}
