//! digitsort - distributed message-passing radix sort
//!
//! Rank 0 (the coordinator) owns the array. Every other rank is a worker that
//! owns a contiguous range of decimal digit values. Each pass, from the
//! least significant place upward, the coordinator broadcasts the current
//! array, every worker sends back one bucket per digit it owns, tagged with
//! that digit, and the coordinator reassembles the buckets by receiving the
//! tags in a fixed order. The number of passes is the digit count of the
//! largest element.
//!
//! # Architecture
//!
//! ```text
//!                 broadcast(array)
//!        ┌────────────┬──────────────┬────────────┐
//!        ▼            ▼              ▼            │
//!   ┌─────────┐  ┌─────────┐    ┌─────────┐  ┌────┴────────┐
//!   │ rank 1  │  │ rank 2  │ .. │ rank W  │  │   rank 0    │
//!   │ [0, 4)  │  │ [4, 8)  │    │ [8, 10) │  │ coordinator │
//!   └────┬────┘  └────┬────┘    └────┬────┘  └─────────────┘
//!        └─── send(bucket, tag = digit) ────────────▲
//! ```
//!
//! Ranks talk through the [`comm::Communicator`] trait. [`comm::LocalWorld`]
//! runs every rank as a tokio task; [`comm::SocketCoordinator`] and
//! [`comm::SocketWorker`] run workers as separate processes over a Unix socket.
//!
//! # Example
//!
//! ```ignore
//! use digitsort::{SortOrder, sort_local};
//!
//! let outcome = sort_local(vec![3, 1, 2], 4, SortOrder::Descending, 1024).await?;
//! assert_eq!(outcome.sorted, vec![3, 2, 1]);
//! ```

pub mod bucket;
pub mod cli;
pub mod comm;
pub mod config;
pub mod coordinator;
pub mod digits;
pub mod error;
pub mod fixture;
pub mod launch;
pub mod order;
pub mod partition;
pub mod reference;
pub mod report;
pub mod run;
pub mod sort;
pub mod verify;
pub mod worker;

pub use bucket::{Bucket, build_bucket};
pub use config::Config;
pub use coordinator::{Coordinator, SortOutcome};
pub use digits::{digit_at, pass_count};
pub use error::SortError;
pub use order::SortOrder;
pub use partition::{DigitRange, range_for};
pub use reference::radix_sort;
pub use run::{RunReport, execute};
pub use sort::{run_rank, sort_local};
pub use worker::Worker;
