//! Fanfold: completion-latched control-flow combinators for fan-out
//! asynchronous work.
//!
//! # Overview
//!
//! Fanfold coordinates many independently-completing asynchronous
//! operations into a single aggregate outcome: one operation per element of
//! a collection ([`every`], [`some`], [`map`], [`detect`]), or a set of
//! independent tasks run concurrently ([`parallel`]) or strictly in order
//! ([`series`]). Operations are ordinary futures supplied by the caller;
//! the combinators perform no scheduling of their own and run on whatever
//! executor drives them.
//!
//! # Core Guarantees
//!
//! - **Exactly-once settlement**: the aggregate is delivered exactly once,
//!   regardless of completion order or interleaving; everything reported
//!   after settlement is discarded.
//! - **Placement stability**: [`map`] and [`parallel`] place each result at
//!   the index or key of its *source*, never its completion order.
//! - **Shape preservation**: mapping-shaped input produces a
//!   mapping-shaped result with the same key set; sequences stay sequences.
//! - **Early exit**: [`every`], [`some`] and [`detect`] settle as soon as
//!   their outcome is decided; the first error always wins.
//!
//! # Module Structure
//!
//! - [`latch`]: the completion latch, the shared exactly-once primitive
//! - [`combinator`]: the six combinators
//! - [`types`]: input collections, shape-preserving aggregates, task values
//! - [`tracing_compat`]: optional tracing integration (requires the
//!   `tracing-integration` feature)
//!
//! # Example
//!
//! ```
//! use fanfold::{Collection, TaskValue, parallel};
//! use futures_lite::future;
//!
//! let results = future::block_on(parallel(Collection::mapping([
//!     ("fast", future::ready(Ok::<_, ()>(TaskValue::one(1)))),
//!     ("slow", future::ready(Ok(TaskValue::one(2)))),
//! ])));
//! let results = results.expect("no task failed");
//! assert_eq!(results.get(&"fast"), Some(&TaskValue::one(1)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

pub mod combinator;
pub mod latch;
pub mod tracing_compat;
pub mod types;

// ── Test-only modules ───────────────────────────────────────────────────
#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

// Re-exports for convenient access to the combinators and core types
pub use combinator::{
    DetectFuture, EveryFuture, MapFuture, ParallelFuture, SeriesFuture, SomeFuture, detect, every,
    map, parallel, series, some,
};
pub use latch::{CompletionLatch, Verdict};
pub use types::{Aggregate, Collection, NoKey, ShapeError, TaskValue};
