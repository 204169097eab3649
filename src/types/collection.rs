//! Input collections and shape-preserving aggregates.
//!
//! Combinators accept a [`Collection`]: either an ordered sequence of items
//! or a key → value mapping whose insertion order is preserved. Shape is
//! detected once at the boundary; internally every combinator addresses
//! results by index and reattaches mapping keys at settlement, so one
//! accumulation path serves both shapes. The shape-preserving combinators
//! resolve with an [`Aggregate`] of the same shape as their input.

use crate::tracing_compat::debug;

/// Marker key type for sequence-shaped collections.
///
/// Sequences carry no keys; this zero-sized type stands in for the key
/// parameter so construction via [`Collection::sequence`] needs no key type
/// annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoKey;

/// An input collection: an ordered sequence or a keyed mapping.
///
/// Exactly one shape is active per combinator call. Mapping keys are
/// assumed unique; insertion order is preserved in the result's key set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collection<K, V> {
    /// An ordered sequence of items; order is significant.
    Sequence(Vec<V>),
    /// A key → value mapping in insertion order.
    Mapping(Vec<(K, V)>),
}

impl<V> Collection<NoKey, V> {
    /// Builds a sequence-shaped collection.
    #[must_use]
    pub fn sequence(items: impl IntoIterator<Item = V>) -> Self {
        Self::Sequence(items.into_iter().collect())
    }
}

impl<K, V> Collection<K, V> {
    /// Builds a mapping-shaped collection from key/value pairs.
    #[must_use]
    pub fn mapping(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        Self::Mapping(entries.into_iter().collect())
    }

    /// The number of items (or entries).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Sequence(items) => items.len(),
            Self::Mapping(entries) => entries.len(),
        }
    }

    /// Returns true if the collection holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true for the mapping shape.
    #[must_use]
    pub const fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }

    /// Splits the collection into its shape and its values in input order.
    pub(crate) fn into_parts(self) -> (Shape<K>, Vec<V>) {
        match self {
            Self::Sequence(items) => (Shape::Sequence, items),
            Self::Mapping(entries) => {
                let (keys, values) = entries.into_iter().unzip();
                (Shape::Mapping(keys), values)
            }
        }
    }
}

impl<V> From<Vec<V>> for Collection<NoKey, V> {
    fn from(items: Vec<V>) -> Self {
        Self::Sequence(items)
    }
}

impl<K, V> From<Vec<(K, V)>> for Collection<K, V> {
    fn from(entries: Vec<(K, V)>) -> Self {
        Self::Mapping(entries)
    }
}

/// The shape split off an input collection, held until settlement.
///
/// Mapping keys are kept in input order so out-of-order completions can be
/// written by index and rezipped with their keys when the aggregate settles.
#[derive(Debug)]
pub(crate) enum Shape<K> {
    Sequence,
    Mapping(Vec<K>),
}

impl<K> Shape<K> {
    /// Reattaches this shape to settled values, producing the aggregate.
    pub(crate) fn rebuild<U>(self, values: Vec<U>) -> Aggregate<K, U> {
        match self {
            Self::Sequence => Aggregate::Sequence(values),
            Self::Mapping(keys) => {
                debug_assert_eq!(keys.len(), values.len(), "key/value count mismatch");
                debug!(entries = keys.len(), "rebuilding mapping aggregate");
                Aggregate::Mapping(keys.into_iter().zip(values).collect())
            }
        }
    }
}

/// A settled result with the same shape as the input collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate<K, V> {
    /// Sequence-shaped result, in input order.
    Sequence(Vec<V>),
    /// Mapping-shaped result, keyed by the input's keys in insertion order.
    Mapping(Vec<(K, V)>),
}

/// Shape mismatch when extracting a concrete shape from an [`Aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// The aggregate is mapping-shaped.
    #[error("expected a sequence-shaped aggregate, found a mapping")]
    ExpectedSequence,
    /// The aggregate is sequence-shaped.
    #[error("expected a mapping-shaped aggregate, found a sequence")]
    ExpectedMapping,
}

impl<K, V> Aggregate<K, V> {
    /// The number of result values (or entries).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Sequence(values) => values.len(),
            Self::Mapping(entries) => entries.len(),
        }
    }

    /// Returns true if the aggregate holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true for the mapping shape.
    #[must_use]
    pub const fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }

    /// Looks up a mapping entry by key. Sequences have no keys.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V>
    where
        K: PartialEq,
    {
        match self {
            Self::Sequence(_) => None,
            Self::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
        }
    }

    /// Iterates the mapping keys in insertion order; empty for sequences.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        let entries: &[(K, V)] = match self {
            Self::Sequence(_) => &[],
            Self::Mapping(entries) => entries,
        };
        entries.iter().map(|(k, _)| k)
    }

    /// Iterates the result values in input order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        let (seq, map): (&[V], &[(K, V)]) = match self {
            Self::Sequence(values) => (values, &[]),
            Self::Mapping(entries) => (&[], entries),
        };
        seq.iter().chain(map.iter().map(|(_, v)| v))
    }

    /// Extracts the sequence-shaped values.
    pub fn into_sequence(self) -> Result<Vec<V>, ShapeError> {
        match self {
            Self::Sequence(values) => Ok(values),
            Self::Mapping(_) => Err(ShapeError::ExpectedSequence),
        }
    }

    /// Extracts the mapping-shaped entries.
    pub fn into_mapping(self) -> Result<Vec<(K, V)>, ShapeError> {
        match self {
            Self::Sequence(_) => Err(ShapeError::ExpectedMapping),
            Self::Mapping(entries) => Ok(entries),
        }
    }
}
