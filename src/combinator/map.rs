//! Map combinator: ordered async transform over a collection.
//!
//! Applies one async transform per item, driving all transforms
//! concurrently. Each result is written into a pre-sized accumulator at the
//! slot of its *source item*, so completions may arrive in any order while
//! the settled aggregate keeps the input's order (sequence) or key set
//! (mapping). The first error settles the aggregate immediately; no partial
//! results are ever delivered alongside an error.
//!
//! Identity: the empty collection settles with the empty aggregate of the
//! input's shape.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use slab::Slab;
use smallvec::SmallVec;

use crate::latch::{CompletionLatch, Verdict};
use crate::tracing_compat::debug;
use crate::types::{Aggregate, Collection, Shape};

/// Transforms every item of `coll` concurrently, preserving input order.
///
/// Resolves with `Ok(aggregate)` once every transform has reported, where
/// `aggregate` has the same shape as the input and each slot holds the
/// transform of the item that produced it, or with the first error.
///
/// # Example
///
/// ```
/// use fanfold::{Aggregate, Collection, map};
/// use futures_lite::future;
///
/// let lengths = future::block_on(map(
///     Collection::sequence(["a", "bb", "ccc"]),
///     |s: &str| future::ready(Ok::<_, ()>(s.len())),
/// ));
/// assert_eq!(lengths, Ok(Aggregate::Sequence(vec![1, 2, 3])));
/// ```
pub fn map<K, V, U, F, Fut, E>(coll: Collection<K, V>, transform: F) -> MapFuture<K, U, Fut, E>
where
    F: FnMut(V) -> Fut,
    Fut: Future<Output = Result<U, E>> + Unpin,
{
    let (shape, items) = coll.into_parts();
    let expected = items.len();
    let mut ops = Slab::with_capacity(expected);
    for fut in items.into_iter().map(transform) {
        ops.insert(fut);
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
    debug!(expected, "map: transforms launched");
    MapFuture {
        ops,
        shape,
        slots,
        latch,
    }
}

/// Future for the [`map`] combinator.
#[must_use = "futures do nothing unless polled"]
pub struct MapFuture<K, U, Fut, E> {
    ops: Slab<Fut>,
    /// Input shape, reattached to the accumulator at settlement.
    shape: Option<Shape<K>>,
    /// Accumulator slots addressed by source index.
    slots: Vec<Option<U>>,
    latch: CompletionLatch<Result<Aggregate<K, U>, E>>,
}

impl<K, U, Fut: Unpin, E> Unpin for MapFuture<K, U, Fut, E> {}

impl<K, U, Fut, E> Future for MapFuture<K, U, Fut, E>
where
    Fut: Future<Output = Result<U, E>> + Unpin,
{
    type Output = Result<Aggregate<K, U>, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        if !this.latch.is_settled() {
            let mut finished: SmallVec<[usize; 8]> = SmallVec::new();
            for (index, op) in &mut this.ops {
                match Pin::new(op).poll(cx) {
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
            None if this.latch.is_settled() => panic!("`MapFuture` polled after completion"),
            None => Poll::Pending,
        }
    }
}

impl<K, U, Fut, E> fmt::Debug for MapFuture<K, U, Fut, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapFuture")
            .field("running", &self.ops.len())
            .field("expected", &self.latch.expected())
            .finish_non_exhaustive()
    }
}
