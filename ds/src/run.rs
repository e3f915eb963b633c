//! A complete run: fixture, both sorts, verification and files

use std::time::{Duration, Instant};

use eyre::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::{Config, TransportKind};
use crate::coordinator::SortOutcome;
use crate::fixture::shuffled_sequence;
use crate::launch::sort_over_socket;
use crate::reference::radix_sort;
use crate::report::{RunFiles, Timings, write_run_files};
use crate::sort::sort_local;
use crate::verify::{Verification, check};

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub input: Vec<u64>,
    pub reference: Vec<u64>,
    pub outcome: SortOutcome,
    pub timings: Timings,
    pub reference_check: Verification,
    pub distributed_check: Verification,
    pub files: Option<RunFiles>,
}

impl RunReport {
    /// Distributed result equals the reference element for element
    pub fn matches_reference(&self) -> bool {
        self.outcome.sorted == self.reference
    }

    /// Every pass received exactly as many elements as the array holds
    pub fn buckets_conserved(&self) -> bool {
        let len = self.input.len();
        self.outcome
            .bucket_counts
            .iter()
            .all(|counts| counts.iter().sum::<usize>() == len)
    }

    pub fn passed(&self) -> bool {
        self.matches_reference() && self.distributed_check.passed() && self.buckets_conserved()
    }
}

/// Sort `input` with the configured transport, timing only the sort
pub async fn sort_distributed(input: Vec<u64>, config: &Config) -> Result<(SortOutcome, Duration)> {
    debug!(kind = %config.transport.kind, "sort_distributed: called");
    match config.transport.kind {
        TransportKind::Local => {
            let start = Instant::now();
            let outcome = sort_local(
                input,
                config.sort.world_size,
                config.sort.order,
                config.transport.channel_buffer,
            )
            .await?;
            Ok((outcome, start.elapsed()))
        }
        TransportKind::Socket => sort_over_socket(input, config).await,
    }
}

/// Execute a full run as described by `config`
pub async fn execute(config: &Config) -> Result<RunReport> {
    config.validate()?;
    let order = config.sort.order;
    info!(
        size = config.sort.array_size,
        world_size = config.sort.world_size,
        transport = %config.transport.kind,
        %order,
        "Run starting"
    );

    let input = shuffled_sequence(config.sort.array_size, config.sort.seed);

    let start = Instant::now();
    let reference = radix_sort(&input, order);
    let reference_elapsed = start.elapsed();
    let reference_check = check(&input, &reference, order);
    info!(elapsed = ?reference_elapsed, passed = reference_check.passed(), "Reference sort done");

    let (outcome, distributed_elapsed) = sort_distributed(input.clone(), config)
        .await
        .context("Distributed sort failed")?;
    let distributed_check = check(&input, &outcome.sorted, order);
    info!(
        elapsed = ?distributed_elapsed,
        passes = outcome.passes,
        passed = distributed_check.passed(),
        "Distributed sort done"
    );

    let files = if config.output.write_files {
        Some(write_run_files(&config.output.dir, &input, &reference, &outcome.sorted)?)
    } else {
        None
    };

    let report = RunReport {
        input,
        reference,
        outcome,
        timings: Timings {
            reference: reference_elapsed,
            distributed: distributed_elapsed,
        },
        reference_check,
        distributed_check,
        files,
    };

    if !report.passed() {
        warn!("Distributed result failed verification");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::SortOrder;
    use tempfile::TempDir;

    fn local_config(size: usize, world_size: usize) -> Config {
        let mut config = Config::default();
        config.sort.array_size = size;
        config.sort.world_size = world_size;
        config.sort.seed = Some(11);
        config.output.write_files = false;
        config
    }

    #[tokio::test]
    async fn test_execute_local_run() {
        let report = execute(&local_config(1000, 4)).await.unwrap();

        assert!(report.passed());
        assert!(report.matches_reference());
        assert!(report.distributed_check.consecutive);
        assert_eq!(report.outcome.passes, 3);
        assert_eq!(report.outcome.sorted.first(), Some(&999));
        assert_eq!(report.outcome.sorted.last(), Some(&0));
        assert!(report.files.is_none());
    }

    #[tokio::test]
    async fn test_execute_ascending_is_not_consecutive_descending() {
        let mut config = local_config(50, 3);
        config.sort.order = SortOrder::Ascending;
        let report = execute(&config).await.unwrap();

        assert!(report.passed());
        assert!(!report.distributed_check.consecutive);
        assert_eq!(report.outcome.sorted, (0..50).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_execute_writes_files() {
        let temp = TempDir::new().unwrap();
        let mut config = local_config(20, 2);
        config.output.write_files = true;
        config.output.dir = temp.path().to_path_buf();

        let report = execute(&config).await.unwrap();
        let files = report.files.unwrap();
        assert!(files.shuffled.exists());
        let sorted = std::fs::read_to_string(files.distributed).unwrap();
        assert!(sorted.starts_with("19 18 17 "));
    }

    #[tokio::test]
    async fn test_execute_rejects_invalid_config() {
        let err = execute(&local_config(10, 1)).await.unwrap_err();
        assert!(err.to_string().contains("world-size"));
    }
}
