//! Parallel combinator: concurrent task set, shape-preserving.
//!
//! Drives a sequence or mapping of independent tasks concurrently. Each
//! task's [`TaskValue`] is written into a pre-sized accumulator at the
//! position or key of its originating task, independent of completion
//! order. The first error settles the aggregate immediately; values and
//! errors from tasks still running at settlement are discarded.
//!
//! Identity: the empty input settles with the empty aggregate of the
//! input's shape (`[]` for sequences, `{}` for mappings).

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use slab::Slab;
use smallvec::SmallVec;

use crate::latch::{CompletionLatch, Verdict};
use crate::tracing_compat::debug;
use crate::types::{Aggregate, Collection, Shape, TaskValue};

/// Runs every task of `tasks` concurrently, aggregating by task identity.
///
/// Resolves with `Ok(aggregate)` of the input's shape once every task has
/// reported, each slot holding the value of the task that produced it, or
/// with the first error.
///
/// # Example
///
/// ```
/// use fanfold::{Collection, TaskValue, parallel};
/// use futures_lite::future;
///
/// let results = future::block_on(parallel(Collection::mapping([
///     ("a", future::ready(Ok::<_, ()>(TaskValue::one(1)))),
///     ("b", future::ready(Ok(TaskValue::one(2)))),
/// ])));
/// let results = results.expect("no task failed");
/// assert_eq!(results.get(&"a"), Some(&TaskValue::one(1)));
/// assert_eq!(results.get(&"b"), Some(&TaskValue::one(2)));
/// ```
pub fn parallel<K, T, Fut, E>(tasks: Collection<K, Fut>) -> ParallelFuture<K, T, Fut, E>
where
    Fut: Future<Output = Result<TaskValue<T>, E>> + Unpin,
{
    let (shape, tasks) = tasks.into_parts();
    let expected = tasks.len();
    let mut ops = Slab::with_capacity(expected);
    for task in tasks {
        ops.insert(task);
    }
    let mut slots = Vec::with_capacity(expected);
    slots.resize_with(expected, || None);
    let latch = CompletionLatch::new(expected);
    let shape = if expected == 0 {
        latch.settle(Ok(shape.rebuild(Vec::new())));
        None
    } else {
        Some(shape)
    };
    debug!(expected, "parallel: tasks launched");
    ParallelFuture {
        ops,
        shape,
        slots,
        latch,
    }
}

/// Future for the [`parallel`] combinator.
#[must_use = "futures do nothing unless polled"]
pub struct ParallelFuture<K, T, Fut, E> {
    ops: Slab<Fut>,
    /// Input shape, reattached to the accumulator at settlement.
    shape: Option<Shape<K>>,
    /// Accumulator slots addressed by task index.
    slots: Vec<Option<TaskValue<T>>>,
    latch: CompletionLatch<Result<Aggregate<K, TaskValue<T>>, E>>,
}

impl<K, T, Fut: Unpin, E> Unpin for ParallelFuture<K, T, Fut, E> {}

impl<K, T, Fut, E> Future for ParallelFuture<K, T, Fut, E>
where
    Fut: Future<Output = Result<TaskValue<T>, E>> + Unpin,
{
    type Output = Result<Aggregate<K, TaskValue<T>>, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        if !this.latch.is_settled() {
            let mut finished: SmallVec<[usize; 8]> = SmallVec::new();
            for (index, task) in &mut this.ops {
                match Pin::new(task).poll(cx) {
                    Poll::Ready(outcome) => {
                        finished.push(index);
                        let slots = &mut this.slots;
                        let shape = &mut this.shape;
                        this.latch.report(|is_last| match outcome {
                            Err(err) => Verdict::Settle(Err(err)),
                            Ok(value) => {
                                slots[index] = Some(value);
                                if is_last {
                                    let values = slots
                                        .iter_mut()
                                        .map(|slot| slot.take().expect("all slots reported"))
                                        .collect();
                                    let shape = shape.take().expect("shape present until settled");
                                    Verdict::Settle(Ok(shape.rebuild(values)))
                                } else {
                                    Verdict::Continue
                                }
                            }
                        });
                        if this.latch.is_settled() {
                            break;
                        }
                    }
                    Poll::Pending => {}
                }
            }
            for index in finished {
                this.ops.remove(index);
            }
            if this.latch.is_settled() {
                this.ops.clear();
            }
        }
        match this.latch.take() {
            Some(outcome) => Poll::Ready(outcome),
            None if this.latch.is_settled() => panic!("`ParallelFuture` polled after completion"),
            None => Poll::Pending,
        }
    }
}

impl<K, T, Fut, E> fmt::Debug for ParallelFuture<K, T, Fut, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelFuture")
            .field("running", &self.ops.len())
            .field("expected", &self.latch.expected())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NoKey;
    use std::sync::Arc;
    use std::task::Wake;

    struct NoopWaker;
    impl Wake for NoopWaker {
        fn wake(self: Arc<Self>) {}
    }

    fn noop_waker() -> std::task::Waker {
        Arc::new(NoopWaker).into()
    }

    fn poll_once<F: Future + Unpin>(fut: &mut F) -> Poll<F::Output> {
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        Pin::new(fut).poll(&mut cx)
    }

    fn poll_to_completion<F: Future + Unpin>(fut: &mut F) -> F::Output {
        loop {
            if let Poll::Ready(output) = poll_once(fut) {
                return output;
            }
        }
    }

    /// Completes with its value after a fixed number of pending polls.
    struct AfterPolls<T> {
        remaining: u32,
        value: Option<T>,
    }

    impl<T> AfterPolls<T> {
        fn new(remaining: u32, value: T) -> Self {
            Self {
                remaining,
                value: Some(value),
            }
        }
    }

    impl<T: Unpin> Future for AfterPolls<T> {
        type Output = T;
        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
            if self.remaining == 0 {
                Poll::Ready(self.value.take().expect("polled after completion"))
            } else {
                self.remaining -= 1;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    #[test]
    fn results_keyed_by_task_not_completion_order() {
        // "a" finishes after "b"; the aggregate is still keyed by task.
        let mut fut = parallel(Collection::mapping([
            ("a", AfterPolls::new(2, Ok::<_, &str>(TaskValue::one("slow")))),
            ("b", AfterPolls::new(0, Ok(TaskValue::one("fast")))),
        ]));
        let results = poll_to_completion(&mut fut).expect("no task failed");
        assert_eq!(
            results,
            Aggregate::Mapping(vec![
                ("a", TaskValue::one("slow")),
                ("b", TaskValue::one("fast")),
            ])
        );
    }

    #[test]
    fn sequence_results_keep_task_order() {
        let mut fut = parallel(Collection::sequence([
            AfterPolls::new(1, Ok::<_, &str>(TaskValue::one(0))),
            AfterPolls::new(0, Ok(TaskValue::one(1))),
        ]));
        assert_eq!(
            poll_to_completion(&mut fut),
            Ok(Aggregate::Sequence(vec![
                TaskValue::one(0),
                TaskValue::one(1),
            ]))
        );
    }

    #[test]
    fn first_error_settles_immediately() {
        let mut fut = parallel(Collection::sequence([
            AfterPolls::new(5, Ok::<_, &str>(TaskValue::one(1))),
            AfterPolls::new(0, Err("exploded")),
        ]));
        assert_eq!(poll_once(&mut fut), Poll::Ready(Err("exploded")));
    }

    #[test]
    fn multi_value_and_unit_tasks() {
        let mut fut = parallel(Collection::sequence([
            std::future::ready(Ok::<_, &str>(TaskValue::unit())),
            std::future::ready(Ok(TaskValue::many([1, 2, 3]))),
        ]));
        assert_eq!(
            poll_once(&mut fut),
            Poll::Ready(Ok(Aggregate::Sequence(vec![
                TaskValue::unit(),
                TaskValue::many([1, 2, 3]),
            ])))
        );
    }

    #[test]
    fn empty_sequence_settles_empty_sequence() {
        let seq: Collection<NoKey, std::future::Ready<Result<TaskValue<u8>, &str>>> =
            Collection::sequence([]);
        let mut fut = parallel(seq);
        assert_eq!(
            poll_once(&mut fut),
            Poll::Ready(Ok(Aggregate::Sequence(vec![])))
        );
    }

    #[test]
    fn empty_mapping_settles_empty_mapping() {
        let map: Collection<&str, std::future::Ready<Result<TaskValue<u8>, &str>>> =
            Collection::mapping([]);
        let mut fut = parallel(map);
        assert_eq!(
            poll_once(&mut fut),
            Poll::Ready(Ok(Aggregate::Mapping(vec![])))
        );
    }
}
