//! Some combinator: logical OR over a collection of async tests.
//!
//! The mirror image of [`every`](crate::combinator::every()): a `true`
//! outcome settles the aggregate immediately with `true`; an error settles
//! immediately with that error; only when the final test reports with every
//! outcome `false` does the aggregate settle with `false`.
//!
//! Identity: the empty collection settles with `Ok(false)`.

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
/// Resolves with `Ok(true)` as soon as any test reports `true`, with
/// `Ok(false)` once every test has reported `false`, or with the first
/// error. Tests still running when the aggregate settles are dropped.
///
/// # Example
///
/// ```
/// use fanfold::{Collection, some};
/// use futures_lite::future;
///
/// let has_negative = future::block_on(some(
///     Collection::sequence([3, -1, 7]),
///     |n: &i32| future::ready(Ok::<_, ()>(*n < 0)),
/// ));
/// assert_eq!(has_negative, Ok(true));
/// ```
pub fn some<K, V, F, Fut, E>(coll: Collection<K, V>, mut test: F) -> SomeFuture<Fut>
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
        latch.settle(Ok(false));
    }
    debug!(expected, "some: tests launched");
    SomeFuture { ops, latch }
}

/// Future for the [`some`] combinator.
#[must_use = "futures do nothing unless polled"]
pub struct SomeFuture<Fut: Future> {
    ops: Slab<Fut>,
    latch: CompletionLatch<Fut::Output>,
}

impl<Fut: Future + Unpin> Unpin for SomeFuture<Fut> {}

impl<Fut, E> Future for SomeFuture<Fut>
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
                            Ok(true) => Verdict::Settle(Ok(true)),
                            Ok(false) if is_last => Verdict::Settle(Ok(false)),
                            Ok(false) => Verdict::Continue,
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
            None if this.latch.is_settled() => panic!("`SomeFuture` polled after completion"),
            None => Poll::Pending,
        }
    }
}

impl<Fut: Future> fmt::Debug for SomeFuture<Fut> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SomeFuture")
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

    /// Ready with the wrapped outcome, or pending forever.
    struct MaybeReady(Option<Result<bool, &'static str>>);

    impl Future for MaybeReady {
        type Output = Result<bool, &'static str>;
        fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
            self.0.take().map_or(Poll::Pending, Poll::Ready)
        }
    }

    #[test]
    fn true_short_circuits() {
        // The second test never completes; the true outcome settles the
        // aggregate without it.
        let mut fut = some(
            Collection::sequence([Some(false), None, Some(true)]),
            |outcome: &Option<bool>| MaybeReady(outcome.map(Ok)),
        );
        assert_eq!(poll_once(&mut fut), Poll::Ready(Ok(true)));
    }

    #[test]
    fn all_false_settles_false() {
        let mut fut = some(Collection::sequence([1, 3, 5]), |n| {
            std::future::ready(Ok::<_, &str>(n % 2 == 0))
        });
        assert_eq!(poll_once(&mut fut), Poll::Ready(Ok(false)));
    }

    #[test]
    fn error_settles_immediately() {
        let mut outcomes = vec![Ok(false), Err("io"), Ok(true)].into_iter();
        let mut fut = some(Collection::sequence([0, 1, 2]), |_| {
            std::future::ready(outcomes.next().expect("one test per item"))
        });
        assert_eq!(poll_once(&mut fut), Poll::Ready(Err("io")));
    }

    #[test]
    fn empty_collection_is_false() {
        let mut fut = some(Collection::sequence(Vec::<i32>::new()), |_| {
            std::future::ready(Ok::<_, &str>(true))
        });
        assert_eq!(poll_once(&mut fut), Poll::Ready(Ok(false)));
    }

    #[test]
    fn mapping_shaped_input() {
        let mut fut = some(Collection::mapping([("a", 0), ("b", 9)]), |n| {
            std::future::ready(Ok::<_, &str>(*n > 5))
        });
        assert_eq!(poll_once(&mut fut), Poll::Ready(Ok(true)));
    }
}
