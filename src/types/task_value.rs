//! Tagged one-or-many task results.
//!
//! A task may report zero, one, or several result values. [`TaskValue`]
//! models this as a tagged enum, decided by arity at the call site and
//! stored uniformly in the aggregate: a task that reports nothing stores
//! [`TaskValue::Unit`], a single value stores [`TaskValue::One`], and two
//! or more values store [`TaskValue::Many`] in report order.

use smallvec::SmallVec;

/// Inline capacity for multi-value results; tasks rarely report more.
type Values<T> = SmallVec<[T; 4]>;

/// The result values reported by a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValue<T> {
    /// The task reported no values.
    Unit,
    /// The task reported exactly one value.
    One(T),
    /// The task reported two or more values, in report order.
    Many(SmallVec<[T; 4]>),
}

impl<T> TaskValue<T> {
    /// A result carrying no values.
    #[must_use]
    pub const fn unit() -> Self {
        Self::Unit
    }

    /// A single-value result.
    #[must_use]
    pub const fn one(value: T) -> Self {
        Self::One(value)
    }

    /// A multi-value result, in report order.
    #[must_use]
    pub fn many(values: impl IntoIterator<Item = T>) -> Self {
        Self::Many(values.into_iter().collect())
    }

    /// Applies the arity rule: zero values → [`Unit`](Self::Unit), one →
    /// [`One`](Self::One), more → [`Many`](Self::Many).
    #[must_use]
    pub fn from_values(values: Vec<T>) -> Self {
        let mut values = Values::from_vec(values);
        match values.len() {
            0 => Self::Unit,
            1 => Self::One(values.remove(0)),
            _ => Self::Many(values),
        }
    }

    /// The number of values reported.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Unit => 0,
            Self::One(_) => 1,
            Self::Many(values) => values.len(),
        }
    }

    /// Returns true if the task reported no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Unit)
    }

    /// The single value, if exactly one was reported.
    #[must_use]
    pub const fn as_one(&self) -> Option<&T> {
        match self {
            Self::One(value) => Some(value),
            _ => None,
        }
    }

    /// Consumes the result, returning the single value if exactly one was
    /// reported.
    #[must_use]
    pub fn into_one(self) -> Option<T> {
        match self {
            Self::One(value) => Some(value),
            _ => None,
        }
    }

    /// Consumes the result, returning all values in report order.
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Unit => Vec::new(),
            Self::One(value) => vec![value],
            Self::Many(values) => values.into_vec(),
        }
    }
}

impl<T> From<T> for TaskValue<T> {
    fn from(value: T) -> Self {
        Self::One(value)
    }
}
