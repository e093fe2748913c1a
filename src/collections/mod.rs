//! The four collection adapters and the contract they share.
//!
//! | Collection             | Evaluation | `map`/`foreach` see | `filter`/`reduce` see |
//! |------------------------|------------|---------------------|-----------------------|
//! | [`SequenceCollection`] | eager      | element             | element               |
//! | [`MappingCollection`]  | eager      | value               | `(key, value)`        |
//! | [`TextCollection`]     | eager      | `char`              | `char`                |
//! | [`LazyCollection`]     | lazy       | element             | element               |
//!
//! Every operation except `foreach` returns a new collection (or, for `reduce`, the accumulator)
//! and leaves the receiver untouched. `foreach` rewrites the receiver in place and returns `()`.
//! `flatmap(f)` is always `flatten().map(f)`.
//!
//! Each collection exposes these operations as inherent methods with the loosest bounds it can
//! support (for example a type-changing `map` on the eager collections). The [`Collection`] trait
//! is the common denominator for code that is generic over the container shape.
//!
//! ```rust
//! use parallel_collections::collections::{Collection, SequenceCollection, TextCollection};
//! use parallel_collections::types::Value;
//!
//! fn shout<'a, C: Collection<'a>>(c: &C, f: fn(C::Item) -> C::Item) -> C {
//!     c.flatmap(f)
//! }
//!
//! let text = TextCollection::new("qwerty");
//! assert_eq!(shout(&text, |c| c.to_ascii_uppercase()), "QWERTY");
//!
//! let seq = SequenceCollection::new(vec![Value::list([1, 2]), Value::Int64(3)]);
//! let doubled = shout(&seq, |v| Value::Int64(v.as_i64().unwrap_or(0) * 2));
//! assert_eq!(doubled, vec![Value::Int64(2), Value::Int64(4), Value::Int64(6)]);
//! ```

mod lazy;
mod mapping;
mod options;
mod sequence;
mod text;

pub use lazy::{LazyCollection, LazyIter};
pub use mapping::MappingCollection;
pub use options::CollectionOptions;
pub use sequence::SequenceCollection;
pub use text::TextCollection;

use crate::error::{BoxError, CollectionError, CollectionResult};
use crate::types::Value;

/// The operation set shared by all collection shapes.
///
/// `Item` is what transforms receive and return; `Entry` is what predicates and reducers
/// receive. `'a` bounds the closures a collection may hold: lazy collections store their
/// transforms, so transform and predicate closures must live for `'a`. The inherent methods on
/// the eager collections accept any borrowing closure.
pub trait Collection<'a>: Sized {
    type Item: 'a;
    type Entry: 'a;

    /// New collection with `f` applied to every item.
    fn map<F>(&self, f: F) -> Self
    where
        F: Fn(Self::Item) -> Self::Item + 'a;

    /// New collection with only the entries `predicate` accepts, in their original order.
    fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&Self::Entry) -> bool + 'a;

    /// Replace every item with `f(item)` in place.
    fn foreach<F>(&mut self, f: F)
    where
        F: FnMut(Self::Item) -> Self::Item;

    /// New collection with exactly one level of nesting removed.
    fn flatten(&self) -> Self;

    /// `flatten()` followed by `map(f)`.
    fn flatmap<F>(&self, f: F) -> Self
    where
        F: Fn(Self::Item) -> Self::Item + 'a,
    {
        self.flatten().map(f)
    }

    /// Left fold over every entry, starting from `seed`.
    fn reduce<A, R>(&self, seed: A, reducer: R) -> A
    where
        R: FnMut(A, Self::Entry) -> A;

    /// Like [`Collection::foreach`], but stops at the first failure and leaves the receiver
    /// unchanged.
    fn try_foreach<F, E>(&mut self, f: F) -> CollectionResult<()>
    where
        F: FnMut(Self::Item) -> Result<Self::Item, E>,
        E: Into<BoxError>;

    /// Like [`Collection::reduce`], but stops at the first failure.
    fn try_reduce<A, R, E>(&self, seed: A, reducer: R) -> CollectionResult<A>
    where
        R: FnMut(A, Self::Entry) -> Result<A, E>,
        E: Into<BoxError>;
}

fn parse_json(input: &str) -> CollectionResult<serde_json::Value> {
    Ok(serde_json::from_str(input)?)
}

fn shape_mismatch(expected: &'static str, found: serde_json::Value) -> CollectionError {
    CollectionError::ShapeMismatch {
        expected,
        found: Value::from(found).type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fmt::Debug;

    use super::{Collection, LazyCollection, MappingCollection, SequenceCollection, TextCollection};
    use crate::error::CollectionError;
    use crate::types::Value;

    fn assert_flatmap_law<'a, C>(c: &C, f: fn(C::Item) -> C::Item)
    where
        C: Collection<'a> + PartialEq + Debug,
    {
        assert_eq!(c.flatmap(f), c.flatten().map(f));
    }

    fn double(v: Value) -> Value {
        match v {
            Value::Int64(n) => Value::Int64(n * 2),
            Value::List(items) => Value::List(items.into_iter().map(double).collect()),
            other => other,
        }
    }

    #[test]
    fn flatmap_law_holds_for_every_eager_shape() {
        assert_flatmap_law(
            &SequenceCollection::new(vec![Value::list(0..3), Value::Int64(9)]),
            double,
        );
        assert_flatmap_law(
            &MappingCollection::new(HashMap::from([
                (0, Value::List(vec![Value::list([1, 2]), Value::list([3, 4])])),
                (1, Value::list([3, 4])),
            ])),
            double,
        );
        assert_flatmap_law(&TextCollection::new("a23"), |c| c.to_ascii_uppercase());
    }

    #[test]
    fn flatmap_law_holds_for_lazy() {
        let lazy = LazyCollection::new(vec![Value::list(0..3), Value::list(0..3)]);
        assert_eq!(lazy.flatmap(double).to_vec(), lazy.flatten().map(double).to_vec());
    }

    #[test]
    fn json_constructors_reject_wrong_shape() {
        let err = SequenceCollection::from_json("{\"a\": 1}").unwrap_err();
        assert!(matches!(
            err,
            CollectionError::ShapeMismatch { expected: "array", ref found } if found == "map"
        ));
        assert!(matches!(
            SequenceCollection::from_json("[1,").unwrap_err(),
            CollectionError::Json(_)
        ));
        assert!(matches!(
            MappingCollection::from_json("[1]").unwrap_err(),
            CollectionError::ShapeMismatch { expected: "object", .. }
        ));
        assert!(matches!(
            TextCollection::from_json("12").unwrap_err(),
            CollectionError::ShapeMismatch { expected: "string", .. }
        ));
    }
}
