//! Every combinator: logical AND over a collection of async tests.
//!
//! Applies one truth test per item, driving all tests concurrently. A
//! `false` outcome settles the aggregate immediately with `false`; an error
//! settles immediately with that error; only when the final test reports
//! with every outcome `true` does the aggregate settle with `true`.
//!
//! # Semantics
//!
//! `every(coll, test)`:
//! 1. Launch `test` once per item (any completion order).
//! 2. First error wins; first `false` wins; all-`true` requires all reports.
//! 3. Reports after settlement are discarded.
//!
//! Identity: the empty collection settles with `Ok(true)`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use slab::Slab;
use smallvec::SmallVec;

use crate::latch::{CompletionLatch, Verdict};
use crate::tracing_compat::debug;
use crate::types::Collection;

/// Runs an async truth test over every item of `coll` concurrently.
///
/// Resolves with `Ok(true)` if every test reports `true`, `Ok(false)` as
/// soon as any test reports `false`, or the first error. Tests still
/// running when the aggregate settles are dropped; their outcomes are
/// discarded.
///
/// # Example
///
/// ```
/// use fanfold::{Collection, every};
/// use futures_lite::future;
///
/// let all_even = future::block_on(every(
///     Collection::sequence([2, 4, 6]),
///     |n: &i32| future::ready(Ok::<_, ()>(n % 2 == 0)),
/// ));
/// assert_eq!(all_even, Ok(true));
/// ```
pub fn every<K, V, F, Fut, E>(coll: Collection<K, V>, mut test: F) -> EveryFuture<Fut>
where
    F: FnMut(&V) -> Fut,
    Fut: Future<Output = Result<bool, E>> + Unpin,
{
    let (_, items) = coll.into_parts();
    let expected = items.len();
    let mut ops = Slab::with_capacity(expected);
    for item in &items {
        ops.insert(test(item));
    }
    let latch = CompletionLatch::new(expected);
    if expected == 0 {
        latch.settle(Ok(true));
    }
    debug!(expected, "every: tests launched");
    EveryFuture { ops, latch }
}

/// Future for the [`every`] combinator.
#[must_use = "futures do nothing unless polled"]
pub struct EveryFuture<Fut: Future> {
    ops: Slab<Fut>,
    latch: CompletionLatch<Fut::Output>,
}

impl<Fut: Future + Unpin> Unpin for EveryFuture<Fut> {}

impl<Fut, E> Future for EveryFuture<Fut>
where
    Fut: Future<Output = Result<bool, E>> + Unpin,
{
    type Output = Result<bool, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        if !this.latch.is_settled() {
            let mut finished: SmallVec<[usize; 8]> = SmallVec::new();
            for (index, op) in &mut this.ops {
                match Pin::new(op).poll(cx) {
                    Poll::Ready(outcome) => {
                        finished.push(index);
                        this.latch.report(|is_last| match outcome {
                            Err(err) => Verdict::Settle(Err(err)),
                            Ok(false) => Verdict::Settle(Ok(false)),
                            Ok(true) if is_last => Verdict::Settle(Ok(true)),
                            Ok(true) => Verdict::Continue,
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
            None if this.latch.is_settled() => panic!("`EveryFuture` polled after completion"),
            None => Poll::Pending,
        }
    }
}

impl<Fut: Future> fmt::Debug for EveryFuture<Fut> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EveryFuture")
            .field("running", &self.ops.len())
            .field("expected", &self.latch.expected())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn all_true_settles_true() {
        let mut fut = every(Collection::sequence([1, 2, 3]), |_| {
            std::future::ready(Ok::<_, &str>(true))
        });
        assert_eq!(poll_once(&mut fut), Poll::Ready(Ok(true)));
    }

    #[test]
    fn false_short_circuits_without_waiting() {
        // The pending test never completes; the false outcome must settle
        // the aggregate anyway.
        let mut ops = vec![
            AfterPolls::new(0, Ok::<_, &str>(false)),
            AfterPolls::new(u32::MAX, Ok(true)),
        ]
        .into_iter();
        let mut fut = every(Collection::sequence([0, 1]), |_| {
            ops.next().expect("one test per item")
        });
        assert_eq!(poll_once(&mut fut), Poll::Ready(Ok(false)));
    }

    #[test]
    fn error_settles_immediately() {
        let mut outcomes = vec![Ok(true), Err("broken"), Ok(true)].into_iter();
        let mut fut = every(Collection::sequence([0, 1, 2]), |_| {
            std::future::ready(outcomes.next().expect("one test per item"))
        });
        assert_eq!(poll_once(&mut fut), Poll::Ready(Err("broken")));
    }

    #[test]
    fn waits_for_slow_true() {
        let mut ops = vec![
            AfterPolls::new(0, Ok::<_, &str>(true)),
            AfterPolls::new(2, Ok(true)),
        ]
        .into_iter();
        let mut fut = every(Collection::sequence([0, 1]), |_| {
            ops.next().expect("one test per item")
        });
        assert_eq!(poll_once(&mut fut), Poll::Pending);
        assert_eq!(poll_once(&mut fut), Poll::Pending);
        assert_eq!(poll_once(&mut fut), Poll::Ready(Ok(true)));
    }

    #[test]
    fn empty_collection_is_vacuously_true() {
        let mut fut = every(Collection::sequence(Vec::<i32>::new()), |_| {
            std::future::ready(Ok::<_, &str>(false))
        });
        assert_eq!(poll_once(&mut fut), Poll::Ready(Ok(true)));
    }

    #[test]
    fn mapping_shaped_input() {
        let mut fut = every(Collection::mapping([("a", 1), ("b", 2)]), |n| {
            std::future::ready(Ok::<_, &str>(*n > 0))
        });
        assert_eq!(poll_once(&mut fut), Poll::Ready(Ok(true)));
    }

    #[test]
    #[should_panic(expected = "polled after completion")]
    fn poll_after_completion_panics() {
        let mut fut = every(Collection::sequence([1]), |_| {
            std::future::ready(Ok::<_, &str>(true))
        });
        let _ = poll_once(&mut fut);
        let _ = poll_once(&mut fut);
    }
}
