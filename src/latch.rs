//! Completion latch: exactly-once settlement for fan-out operations.
//!
//! Every combinator in this crate launches some number of sub-operations and
//! must deliver a single aggregate value no matter how their completions
//! interleave. The [`CompletionLatch`] is the shared state that makes this
//! safe: it counts reports, applies a per-combinator fold rule under a lock,
//! and guarantees the `settled` flag transitions false → true at most once.
//! Reports arriving after settlement are discarded.
//!
//! # Semantics
//!
//! A latch is created with the number of `expected` sub-operations, each of
//! which must report exactly once, in any order, possibly from different
//! threads. [`CompletionLatch::report`] runs the fold rule for one report:
//!
//! 1. If the latch is already settled, the report is discarded.
//! 2. Otherwise the fold rule decides, given whether this is the final
//!    expected report, to settle now ([`Verdict::Settle`]) or keep waiting
//!    ([`Verdict::Continue`]).
//! 3. Settling stores the aggregate value and flips `settled`; the value is
//!    handed out exactly once via [`CompletionLatch::take`].
//!
//! An empty fan-out (`expected == 0`) receives no reports; callers settle it
//! directly with the combinator's identity value via
//! [`CompletionLatch::settle`].
//!
//! # Invariants
//!
//! - `settled` transitions false → true at most once per latch.
//! - The settled value is produced by exactly one report (or one direct
//!   [`settle`](CompletionLatch::settle) call) and observed by exactly one
//!   [`take`](CompletionLatch::take).
//! - A discarded report has no observable effect.

use parking_lot::Mutex;

use crate::tracing_compat::trace;

/// Decision returned by a fold rule for one sub-operation report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict<R> {
    /// Keep waiting for further reports.
    Continue,
    /// Settle the aggregate now with this value.
    Settle(R),
}

impl<R> Verdict<R> {
    /// Returns true if this verdict settles the aggregate.
    #[must_use]
    pub const fn is_settle(&self) -> bool {
        matches!(self, Self::Settle(_))
    }
}

/// Shared completion state for one combinator invocation.
///
/// The latch owns the mutable coordination state (`completed`, `settled`,
/// the aggregate value) behind a mutex, so sub-operation completions may
/// legitimately race from different threads. It is exclusively owned by one
/// combinator invocation and never reused.
#[derive(Debug)]
pub struct CompletionLatch<R> {
    expected: usize,
    state: Mutex<LatchState<R>>,
}

#[derive(Debug)]
struct LatchState<R> {
    completed: usize,
    settled: bool,
    value: Option<R>,
}

impl<R> CompletionLatch<R> {
    /// Creates a latch expecting `expected` sub-operation reports.
    #[must_use]
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            state: Mutex::new(LatchState {
                completed: 0,
                settled: false,
                value: None,
            }),
        }
    }

    /// The number of sub-operations this latch was created for.
    #[must_use]
    pub const fn expected(&self) -> usize {
        self.expected
    }

    /// The number of reports accepted so far, including the settling one.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.state.lock().completed
    }

    /// Returns true once the aggregate has been decided.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state.lock().settled
    }

    /// Applies one sub-operation report under the latch lock.
    ///
    /// `decide` is the combinator's fold rule; it is invoked with `true`
    /// when this report is the final expected one. Returns true if this
    /// report settled the aggregate. Reports against an already-settled
    /// latch are discarded and return false.
    pub fn report<F>(&self, decide: F) -> bool
    where
        F: FnOnce(bool) -> Verdict<R>,
    {
        let mut state = self.state.lock();
        if state.settled {
            trace!("report discarded after settlement");
            return false;
        }
        debug_assert!(
            state.completed < self.expected,
            "more reports than expected sub-operations"
        );
        state.completed += 1;
        let is_last = state.completed == self.expected;
        match decide(is_last) {
            Verdict::Settle(value) => {
                state.settled = true;
                state.value = Some(value);
                trace!(
                    completed = state.completed,
                    expected = self.expected,
                    "aggregate settled"
                );
                true
            }
            Verdict::Continue => false,
        }
    }

    /// Settles the latch directly, bypassing the fold rule.
    ///
    /// Used for the empty fan-out identity and for early settlement from
    /// outside a report. Returns true if this call won the false → true
    /// transition; a later `settle` against a settled latch is discarded.
    pub fn settle(&self, value: R) -> bool {
        let mut state = self.state.lock();
        if state.settled {
            return false;
        }
        state.settled = true;
        state.value = Some(value);
        trace!(expected = self.expected, "aggregate settled directly");
        true
    }

    /// Removes and returns the settled value, if any.
    ///
    /// Returns `Some` exactly once per settled latch.
    pub fn take(&self) -> Option<R> {
        self.state.lock().value.take()
    }
}
