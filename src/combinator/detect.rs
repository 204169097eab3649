//! Detect combinator: first item to pass an async truth test.
//!
//! Applies one truth test per item, driving all tests concurrently. The
//! first test to report `true` — in completion order, not input order —
//! settles the aggregate with its *original item*. An error settles
//! immediately with that error; when every test has reported `false` the
//! aggregate settles with no match.
//!
//! # Semantics
//!
//! The winner is whichever test reports `true` first in real time, which
//! may not be the earliest qualifying item by input order. Callers that
//! need input-order selection must sequence the tests themselves.
//!
//! Identity: the empty collection settles with `Ok(None)`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use slab::Slab;
use smallvec::SmallVec;

use crate::latch::{CompletionLatch, Verdict};
use crate::tracing_compat::debug;
use crate::types::Collection;

/// Finds an item of `coll` whose async truth test reports `true`.
///
/// Resolves with `Ok(Some(item))` for the first test to report `true` in
/// completion order, `Ok(None)` when all tests report `false`, or the
/// first error. For mapping-shaped input the detected item is the entry's
/// value.
///
/// # Example
///
/// ```
/// use fanfold::{Collection, detect};
/// use futures_lite::future;
///
/// let found = future::block_on(detect(
///     Collection::sequence(["short", "longer", "longest"]),
///     |s: &&str| future::ready(Ok::<_, ()>(s.len() > 5)),
/// ));
/// assert_eq!(found, Ok(Some("longer")));
/// ```
pub fn detect<K, V, F, Fut, E>(coll: Collection<K, V>, mut test: F) -> DetectFuture<V, Fut, E>
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
        latch.settle(Ok(None));
    }
    debug!(expected, "detect: tests launched");
    DetectFuture {
        ops,
        items: items.into_iter().map(Some).collect(),
        latch,
    }
}

/// Future for the [`detect`] combinator.
#[must_use = "futures do nothing unless polled"]
pub struct DetectFuture<V, Fut, E> {
    ops: Slab<Fut>,
    /// Items by input index; the winning item is taken out at settlement.
    items: Vec<Option<V>>,
    latch: CompletionLatch<Result<Option<V>, E>>,
}

impl<V, Fut: Unpin, E> Unpin for DetectFuture<V, Fut, E> {}

impl<V, Fut, E> Future for DetectFuture<V, Fut, E>
where
    Fut: Future<Output = Result<bool, E>> + Unpin,
{
    type Output = Result<Option<V>, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        if !this.latch.is_settled() {
            let mut finished: SmallVec<[usize; 8]> = SmallVec::new();
            for (index, op) in &mut this.ops {
                match Pin::new(op).poll(cx) {
                    Poll::Ready(outcome) => {
                        finished.push(index);
                        let items = &mut this.items;
                        this.latch.report(|is_last| match outcome {
                            Err(err) => Verdict::Settle(Err(err)),
                            Ok(true) => Verdict::Settle(Ok(items[index].take())),
                            Ok(false) if is_last => Verdict::Settle(Ok(None)),
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
            None if this.latch.is_settled() => panic!("`DetectFuture` polled after completion"),
            None => Poll::Pending,
        }
    }
}

impl<V, Fut, E> fmt::Debug for DetectFuture<V, Fut, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectFuture")
            .field("running", &self.ops.len())
            .field("expected", &self.latch.expected())
            .finish_non_exhaustive()
    }
}
