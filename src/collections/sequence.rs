//! Eager ordered sequence.

use serde::{Deserialize, Serialize};

use super::options::CollectionOptions;
use super::{Collection, parse_json, shape_mismatch};
use crate::error::{BoxError, CollectionError, CollectionResult, Position};
use crate::observability::{CollectionKind, Operation};
use crate::types::{Nested, Value};

const KIND: CollectionKind = CollectionKind::Sequence;

/// An eager, ordered sequence whose elements may themselves be sequences.
///
/// Every operation except [`SequenceCollection::foreach`] materializes a new sequence; element
/// order always follows the source order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceCollection<T> {
    items: Vec<T>,
    #[serde(skip)]
    options: CollectionOptions,
}

impl<T> SequenceCollection<T> {
    /// Create a sequence that owns `items`.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            options: CollectionOptions::default(),
        }
    }

    /// Replace the options; collections derived from this one inherit them.
    pub fn with_options(mut self, options: CollectionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CollectionOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    fn derive<U>(&self, items: Vec<U>) -> SequenceCollection<U> {
        SequenceCollection {
            items,
            options: self.options.clone(),
        }
    }
}

impl SequenceCollection<Value> {
    /// Build a sequence from a JSON array.
    pub fn from_json(input: &str) -> CollectionResult<Self> {
        match parse_json(input)? {
            serde_json::Value::Array(items) => Ok(Self::new(items.into_iter().map(Value::from).collect())),
            other => Err(shape_mismatch("array", other)),
        }
    }
}

impl<T: Clone> SequenceCollection<T> {
    /// Returns a new sequence with `f` applied to every element.
    pub fn map<U, F>(&self, f: F) -> SequenceCollection<U>
    where
        F: FnMut(T) -> U,
    {
        let scope = self.options.begin(KIND, Operation::Map);
        let items = self.items.iter().cloned().map(f).collect();
        scope.finish(self.items.len());
        self.derive(items)
    }

    /// Like [`SequenceCollection::map`], but stops at the first element `f` fails on.
    pub fn try_map<U, F, E>(&self, mut f: F) -> CollectionResult<SequenceCollection<U>>
    where
        F: FnMut(T) -> Result<U, E>,
        E: Into<BoxError>,
    {
        let scope = self.options.begin(KIND, Operation::Map);
        let mut items = Vec::with_capacity(self.items.len());
        for (i, item) in self.items.iter().cloned().enumerate() {
            match f(item) {
                Ok(v) => items.push(v),
                Err(e) => {
                    let position = Position::Index(i);
                    scope.fail(&position);
                    return Err(CollectionError::element(position, e));
                }
            }
        }
        scope.finish(self.items.len());
        Ok(self.derive(items))
    }

    /// Returns a new sequence containing only elements for which `predicate` returns `true`.
    pub fn filter<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&T) -> bool,
    {
        let scope = self.options.begin(KIND, Operation::Filter);
        let items = self.items.iter().filter(|e| predicate(e)).cloned().collect();
        scope.finish(self.items.len());
        self.derive(items)
    }

    /// Like [`SequenceCollection::filter`], but with a predicate that can fail.
    pub fn try_filter<P, E>(&self, mut predicate: P) -> CollectionResult<Self>
    where
        P: FnMut(&T) -> Result<bool, E>,
        E: Into<BoxError>,
    {
        let scope = self.options.begin(KIND, Operation::Filter);
        let mut items = Vec::new();
        for (i, item) in self.items.iter().enumerate() {
            match predicate(item) {
                Ok(true) => items.push(item.clone()),
                Ok(false) => {}
                Err(e) => {
                    let position = Position::Index(i);
                    scope.fail(&position);
                    return Err(CollectionError::element(position, e));
                }
            }
        }
        scope.finish(self.items.len());
        Ok(self.derive(items))
    }

    /// Replaces every element with `f(element)`, in place.
    pub fn foreach<F>(&mut self, f: F)
    where
        F: FnMut(T) -> T,
    {
        let scope = self.options.begin(KIND, Operation::Foreach);
        let items = std::mem::take(&mut self.items);
        self.items = items.into_iter().map(f).collect();
        scope.finish(self.items.len());
    }

    /// Like [`SequenceCollection::foreach`]; on failure the sequence is left unchanged.
    pub fn try_foreach<F, E>(&mut self, mut f: F) -> CollectionResult<()>
    where
        F: FnMut(T) -> Result<T, E>,
        E: Into<BoxError>,
    {
        let scope = self.options.begin(KIND, Operation::Foreach);
        let mut items = Vec::with_capacity(self.items.len());
        for (i, item) in self.items.iter().cloned().enumerate() {
            match f(item) {
                Ok(v) => items.push(v),
                Err(e) => {
                    let position = Position::Index(i);
                    scope.fail(&position);
                    return Err(CollectionError::element(position, e));
                }
            }
        }
        scope.finish(items.len());
        self.items = items;
        Ok(())
    }

    /// Folds all elements left to right into `seed`.
    pub fn reduce<A, R>(&self, seed: A, reducer: R) -> A
    where
        R: FnMut(A, T) -> A,
    {
        let scope = self.options.begin(KIND, Operation::Reduce);
        let out = self.items.iter().cloned().fold(seed, reducer);
        scope.finish(self.items.len());
        out
    }

    /// Like [`SequenceCollection::reduce`], but stops at the first failure.
    pub fn try_reduce<A, R, E>(&self, seed: A, mut reducer: R) -> CollectionResult<A>
    where
        R: FnMut(A, T) -> Result<A, E>,
        E: Into<BoxError>,
    {
        let scope = self.options.begin(KIND, Operation::Reduce);
        let mut acc = seed;
        for (i, item) in self.items.iter().cloned().enumerate() {
            acc = match reducer(acc, item) {
                Ok(acc) => acc,
                Err(e) => {
                    let position = Position::Index(i);
                    scope.fail(&position);
                    return Err(CollectionError::element(position, e));
                }
            };
        }
        scope.finish(self.items.len());
        Ok(acc)
    }
}

impl<T: Clone + Nested> SequenceCollection<T> {
    /// Returns a new sequence with one level of nesting removed.
    ///
    /// Container elements are expanded in place; other elements are kept as single items.
    pub fn flatten(&self) -> Self {
        let scope = self.options.begin(KIND, Operation::Flatten);
        let items = self.items.iter().cloned().flat_map(Nested::unnest).collect();
        scope.finish(self.items.len());
        self.derive(items)
    }

    /// `flatten()` followed by `map(f)`.
    pub fn flatmap<U, F>(&self, f: F) -> SequenceCollection<U>
    where
        F: FnMut(T) -> U,
    {
        self.flatten().map(f)
    }
}

impl<'a, T: Clone + Nested + 'a> Collection<'a> for SequenceCollection<T> {
    type Item = T;
    type Entry = T;

    fn map<F>(&self, f: F) -> Self
    where
        F: Fn(T) -> T + 'a,
    {
        SequenceCollection::map(self, f)
    }

    fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + 'a,
    {
        SequenceCollection::filter(self, predicate)
    }

    fn foreach<F>(&mut self, f: F)
    where
        F: FnMut(T) -> T,
    {
        SequenceCollection::foreach(self, f);
    }

    fn flatten(&self) -> Self {
        SequenceCollection::flatten(self)
    }

    fn reduce<A, R>(&self, seed: A, reducer: R) -> A
    where
        R: FnMut(A, T) -> A,
    {
        SequenceCollection::reduce(self, seed, reducer)
    }

    fn try_foreach<F, E>(&mut self, f: F) -> CollectionResult<()>
    where
        F: FnMut(T) -> Result<T, E>,
        E: Into<BoxError>,
    {
        SequenceCollection::try_foreach(self, f)
    }

    fn try_reduce<A, R, E>(&self, seed: A, reducer: R) -> CollectionResult<A>
    where
        R: FnMut(A, T) -> Result<A, E>,
        E: Into<BoxError>,
    {
        SequenceCollection::try_reduce(self, seed, reducer)
    }
}

impl<T: PartialEq> PartialEq for SequenceCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: PartialEq> PartialEq<Vec<T>> for SequenceCollection<T> {
    fn eq(&self, other: &Vec<T>) -> bool {
        &self.items == other
    }
}

impl<T> From<Vec<T>> for SequenceCollection<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> FromIterator<T> for SequenceCollection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for SequenceCollection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'s, T> IntoIterator for &'s SequenceCollection<T> {
    type Item = &'s T;
    type IntoIter = std::slice::Iter<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::SequenceCollection;
    use crate::error::{CollectionError, Position};
    use crate::types::Value;

    fn ranges() -> SequenceCollection<Value> {
        SequenceCollection::new(vec![Value::list(0..10), Value::list(0..10)])
    }

    fn repeat_twice(v: Value) -> Value {
        match v {
            Value::List(items) => Value::List(items.iter().chain(items.iter()).cloned().collect()),
            Value::Int64(n) => Value::Int64(n * 2),
            other => other,
        }
    }

    #[test]
    fn flatten_concatenates_nested_sequences() {
        let out = ranges().flatten();
        let expected: Vec<Value> = (0..10).chain(0..10).map(Value::from).collect();
        assert_eq!(out.len(), 20);
        assert_eq!(out, expected);
    }

    #[test]
    fn flatten_keeps_atoms_and_only_removes_one_level() {
        let seq = SequenceCollection::new(vec![
            Value::Int64(1),
            Value::List(vec![Value::list([2]), Value::Int64(3)]),
            Value::Null,
        ]);
        assert_eq!(
            seq.flatten(),
            vec![Value::Int64(1), Value::list([2]), Value::Int64(3), Value::Null]
        );
    }

    #[test]
    fn flatten_expands_strings_into_characters() {
        let seq = SequenceCollection::new(vec![Value::from("ab"), Value::from("c"), Value::from("")]);
        assert_eq!(
            seq.flatten(),
            vec![Value::from("a"), Value::from("b"), Value::from("c")]
        );
        let digits = SequenceCollection::new(vec![Value::from("a23")]);
        assert_eq!(
            digits.flatmap(|v| Value::from(v.as_str().unwrap_or_default().to_uppercase())),
            vec![Value::from("A"), Value::from("2"), Value::from("3")]
        );
    }

    #[test]
    fn map_applies_to_each_element_and_leaves_receiver_unchanged() {
        let seq = ranges();
        let out = seq.map(repeat_twice);
        assert_eq!(
            out,
            vec![repeat_twice(Value::list(0..10)), repeat_twice(Value::list(0..10))]
        );
        assert_eq!(out.as_slice()[0].as_list().map(<[Value]>::len), Some(20));
        // Original unchanged
        assert_eq!(seq, ranges());
        assert!(!std::ptr::eq(out.as_slice().as_ptr(), seq.as_slice().as_ptr()));
    }

    #[test]
    fn map_can_change_the_element_type() {
        let seq = SequenceCollection::new(vec!["a", "bb", "ccc"]);
        assert_eq!(seq.map(str::len), vec![1, 2, 3]);
    }

    #[test]
    fn filter_keeps_matching_elements_in_order() {
        let seq = SequenceCollection::new(vec!['a', '2', '3']);
        let out = seq.filter(char::is_ascii_digit);
        assert_eq!(out, vec!['2', '3']);
        assert_eq!(seq.len(), 3);
    }

    #[test]
    fn filter_can_return_empty_sequence() {
        assert!(ranges().filter(|_| false).is_empty());
    }

    #[test]
    fn foreach_rewrites_in_place() {
        let mut seq = ranges();
        let () = seq.foreach(repeat_twice);
        assert_eq!(
            seq,
            vec![repeat_twice(Value::list(0..10)), repeat_twice(Value::list(0..10))]
        );
    }

    #[test]
    fn flatmap_is_flatten_then_map() {
        let seq = ranges();
        let expected: Vec<Value> = (0..10).chain(0..10).map(|n| Value::Int64(n * 2)).collect();
        assert_eq!(seq.flatmap(repeat_twice), expected);
        assert_eq!(seq.flatmap(repeat_twice), seq.flatten().map(repeat_twice));
    }

    #[test]
    fn reduce_groups_letters() {
        let seq = SequenceCollection::new(vec!["a", "a", "b"]);
        let grouped = seq.reduce(HashMap::<&str, Vec<&str>>::new(), |mut acc, letter| {
            acc.entry(letter).or_default().push(letter);
            acc
        });
        assert_eq!(
            grouped,
            HashMap::from([("a", vec!["a", "a"]), ("b", vec!["b"])])
        );
    }

    #[test]
    fn reduce_folds_left_to_right() {
        let seq = SequenceCollection::new(vec![1, 2, 3]);
        assert_eq!(seq.reduce(String::new(), |acc, n| format!("{acc}{n}")), "123");
    }

    #[test]
    fn try_map_reports_failing_index() {
        let seq = SequenceCollection::new(vec!["1", "2", "x", "4"]);
        let err = seq.try_map(str::parse::<i64>).unwrap_err();
        assert_eq!(err.position(), Some(&Position::Index(2)));
        assert!(err.to_string().contains("index 2"));
        assert!(matches!(err, CollectionError::ElementTransform { .. }));

        let ok = SequenceCollection::new(vec!["1", "2"]).try_map(str::parse::<i64>).unwrap();
        assert_eq!(ok, vec![1, 2]);
    }

    #[test]
    fn try_foreach_is_all_or_nothing() {
        let mut seq = SequenceCollection::new(vec![1, 2, 3]);
        let err = seq
            .try_foreach(|n| if n == 3 { Err("three") } else { Ok(n * 10) })
            .unwrap_err();
        assert_eq!(err.position(), Some(&Position::Index(2)));
        assert_eq!(seq, vec![1, 2, 3]);

        seq.try_foreach(|n| Ok::<_, String>(n + 1)).unwrap();
        assert_eq!(seq, vec![2, 3, 4]);
    }

    #[test]
    fn try_filter_and_try_reduce_propagate_failures() {
        let seq = SequenceCollection::new(vec![1, 0, 2]);
        let err = seq
            .try_filter(|n| if *n == 0 { Err("zero") } else { Ok(*n > 1) })
            .unwrap_err();
        assert_eq!(err.position(), Some(&Position::Index(1)));

        let err = seq
            .try_reduce(0, |acc, n| 10i32.checked_div(n).map(|q| acc + q).ok_or("division by zero"))
            .unwrap_err();
        assert_eq!(err.position(), Some(&Position::Index(1)));
    }

    #[test]
    fn from_json_reads_arrays() {
        let seq = SequenceCollection::from_json("[[1, 2], [3], 4]").unwrap();
        assert_eq!(
            seq.flatten(),
            vec![Value::Int64(1), Value::Int64(2), Value::Int64(3), Value::Int64(4)]
        );
        assert!(SequenceCollection::from_json("\"abc\"").is_err());
    }
}
