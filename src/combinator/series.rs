//! Series combinator: sequential task chain, shape-preserving.
//!
//! Runs a sequence or mapping of independent tasks strictly one at a time:
//! the next task is not driven — and therefore, futures being lazy, not
//! started — until the previous task has completed. Each task's
//! [`TaskValue`] is accumulated in task order; the first error stops the
//! chain, discards the accumulated values and settles the aggregate with
//! that error.
//!
//! # Semantics
//!
//! `series(tasks)`:
//! 1. Drive task 0 to completion, then task 1, and so on (strict
//!    happens-before between consecutive tasks).
//! 2. On success, store the task's value at its input position.
//! 3. On error, stop; no further task is started.
//!
//! Identity: the empty input settles with the empty aggregate of the
//! input's shape.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::latch::{CompletionLatch, Verdict};
use crate::tracing_compat::debug;
use crate::types::{Aggregate, Collection, Shape, TaskValue};

/// Runs `tasks` one after another, aggregating their values in task order.
///
/// Resolves with `Ok(aggregate)` of the input's shape after the final task
/// completes, or with the first error, in which case no further task is
/// started and accumulated values are discarded.
///
/// # Example
///
/// ```
/// use fanfold::{Aggregate, Collection, TaskValue, series};
/// use futures_lite::future;
///
/// let results = future::block_on(series(Collection::sequence([
///     future::ready(Ok::<_, ()>(TaskValue::one("one"))),
///     future::ready(Ok(TaskValue::one("two"))),
/// ])));
/// assert_eq!(
///     results,
///     Ok(Aggregate::Sequence(vec![
///         TaskValue::one("one"),
///         TaskValue::one("two"),
///     ]))
/// );
/// ```
pub fn series<K, T, Fut, E>(tasks: Collection<K, Fut>) -> SeriesFuture<K, T, Fut, E>
where
    Fut: Future<Output = Result<TaskValue<T>, E>> + Unpin,
{
    let (shape, tasks) = tasks.into_parts();
    let expected = tasks.len();
    let mut pending: VecDeque<Fut> = tasks.into();
    let current = pending.pop_front();
    let latch = CompletionLatch::new(expected);
    let shape = if expected == 0 {
        latch.settle(Ok(shape.rebuild(Vec::new())));
        None
    } else {
        Some(shape)
    };
    debug!(expected, "series: chain started");
    SeriesFuture {
        pending,
        current,
        shape,
        values: Vec::with_capacity(expected),
        latch,
    }
}

/// Future for the [`series`] combinator.
#[must_use = "futures do nothing unless polled"]
pub struct SeriesFuture<K, T, Fut, E> {
    /// Tasks not yet started, in input order.
    pending: VecDeque<Fut>,
    /// The task currently being driven.
    current: Option<Fut>,
    shape: Option<Shape<K>>,
    values: Vec<TaskValue<T>>,
    latch: CompletionLatch<Result<Aggregate<K, TaskValue<T>>, E>>,
}

impl<K, T, Fut: Unpin, E> Unpin for SeriesFuture<K, T, Fut, E> {}

impl<K, T, Fut, E> Future for SeriesFuture<K, T, Fut, E>
where
    Fut: Future<Output = Result<TaskValue<T>, E>> + Unpin,
{
    type Output = Result<Aggregate<K, TaskValue<T>>, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        loop {
            let Some(task) = this.current.as_mut() else {
                break;
            };
            match Pin::new(task).poll(cx) {
                // The current task registered the waker; nothing later in
                // the chain has started yet.
                Poll::Pending => return Poll::Pending,
                Poll::Ready(outcome) => {
                    this.current = None;
                    let values = &mut this.values;
                    let shape = &mut this.shape;
                    let settled = this.latch.report(|is_last| match outcome {
                        Err(err) => Verdict::Settle(Err(err)),
                        Ok(value) => {
                            values.push(value);
                            if is_last {
                                let shape = shape.take().expect("shape present until settled");
                                Verdict::Settle(Ok(shape.rebuild(mem::take(values))))
                            } else {
                                Verdict::Continue
                            }
                        }
                    });
                    if settled {
                        this.pending.clear();
                        break;
                    }
                    this.current = this.pending.pop_front();
                }
            }
        }
        match this.latch.take() {
            Some(outcome) => Poll::Ready(outcome),
            None if this.latch.is_settled() => panic!("`SeriesFuture` polled after completion"),
            None => Poll::Pending,
        }
    }
}

impl<K, T, Fut, E> fmt::Debug for SeriesFuture<K, T, Fut, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeriesFuture")
            .field("remaining", &self.pending.len())
            .field("expected", &self.latch.expected())
            .finish_non_exhaustive()
    }
}
