//! Per-rank entry point and the in-process driver

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::comm::{COORDINATOR, Communicator, LocalWorld};
use crate::coordinator::{Coordinator, SortOutcome};
use crate::digits::pass_count;
use crate::error::SortError;
use crate::order::SortOrder;
use crate::worker::Worker;

/// Run one rank of the distributed sort
///
/// Every rank calls this with the same world. The coordinator's `input` is
/// broadcast once up front so every rank derives the same pass count from the
/// original array; `input` is ignored on workers. Returns the outcome on the
/// coordinator and `None` on workers.
pub async fn run_rank<C>(comm: &mut C, input: Vec<u64>, order: SortOrder) -> Result<Option<SortOutcome>, SortError>
where
    C: Communicator + ?Sized,
{
    let rank = comm.rank();
    let world_size = comm.size();
    debug!(rank, world_size, "run_rank: called");
    if world_size < 2 {
        return Err(SortError::NoWorkers { world_size });
    }

    let mut original = if rank == COORDINATOR { input } else { Vec::new() };
    comm.broadcast(&mut original).await?;
    let passes = pass_count(&original);
    debug!(rank, passes, len = original.len(), "run_rank: initial array received");

    if rank == COORDINATOR {
        let outcome = Coordinator::new(order).run(comm, original, passes).await?;
        Ok(Some(outcome))
    } else {
        drop(original);
        let worker = Worker::new(rank, world_size)?;
        let summary = worker.run(comm, passes).await?;
        info!(
            rank = worker.rank(),
            range = %worker.range(),
            passes = summary.passes,
            buckets = summary.buckets_sent,
            elements = summary.elements_sent,
            "Worker done"
        );
        Ok(None)
    }
}

/// Sort `input` with `world_size` ranks running as tokio tasks
pub async fn sort_local(
    input: Vec<u64>,
    world_size: usize,
    order: SortOrder,
    channel_buffer: usize,
) -> Result<SortOutcome, SortError> {
    info!(len = input.len(), world_size, %order, "Starting in-process sort");
    if world_size < 2 {
        return Err(SortError::NoWorkers { world_size });
    }

    let mut input = Some(input);
    let handles: Vec<_> = LocalWorld::create(world_size, channel_buffer)
        .into_iter()
        .map(|mut comm| {
            let data = if comm.is_coordinator() {
                input.take().unwrap_or_default()
            } else {
                Vec::new()
            };
            tokio::spawn(async move { run_rank(&mut comm, data, order).await })
        })
        .collect();

    let results = try_join_all(
        handles
            .into_iter()
            .map(|handle| async move { handle.await.map_err(|e| SortError::Join(e.to_string()))? }),
    )
    .await?;

    results
        .into_iter()
        .flatten()
        .next()
        .ok_or(SortError::MissingOutcome { rank: COORDINATOR })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::radix_sort;

    #[tokio::test]
    async fn test_three_element_scenario() {
        let outcome = sort_local(vec![3, 1, 2], 4, SortOrder::Descending, 16).await.unwrap();
        assert_eq!(outcome.sorted, vec![3, 2, 1]);
        assert_eq!(outcome.passes, 1);
        assert_eq!(outcome.sorted, radix_sort(&[3, 1, 2], SortOrder::Descending));
    }

    #[tokio::test]
    async fn test_ascending_order() {
        let outcome = sort_local(vec![170, 45, 75, 90, 802, 24, 2, 66], 3, SortOrder::Ascending, 16)
            .await
            .unwrap();
        assert_eq!(outcome.sorted, vec![2, 24, 45, 66, 75, 90, 170, 802]);
        assert_eq!(outcome.passes, 3);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let outcome = sort_local(Vec::new(), 3, SortOrder::Descending, 16).await.unwrap();
        assert!(outcome.sorted.is_empty());
        assert_eq!(outcome.passes, 0);
    }

    #[tokio::test]
    async fn test_world_without_workers() {
        let err = sort_local(vec![1, 2], 1, SortOrder::Descending, 16).await.unwrap_err();
        assert!(matches!(err, SortError::NoWorkers { world_size: 1 }));
    }

    #[tokio::test]
    async fn test_more_workers_than_digits() {
        let input: Vec<u64> = (0..200).rev().collect();
        let outcome = sort_local(input.clone(), 13, SortOrder::Descending, 4).await.unwrap();
        assert_eq!(outcome.sorted, radix_sort(&input, SortOrder::Descending));
    }

    #[tokio::test]
    async fn test_run_rank_rejects_single_rank_world() {
        let mut world = LocalWorld::create(1, 4);
        let err = run_rank(&mut world[0], vec![1], SortOrder::Descending)
            .await
            .unwrap_err();
        assert!(matches!(err, SortError::NoWorkers { world_size: 1 }));
    }
}
