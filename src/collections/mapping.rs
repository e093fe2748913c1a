//! Eager key/value mapping.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use super::options::CollectionOptions;
use super::{Collection, parse_json, shape_mismatch};
use crate::error::{BoxError, CollectionError, CollectionResult, Position};
use crate::observability::{CollectionKind, Operation};
use crate::types::{Nested, Value};

const KIND: CollectionKind = CollectionKind::Mapping;

/// An eager key→value mapping.
///
/// Operations are value-centric: `map`, `foreach` and `flatten` transform values and never
/// touch the key set. `filter` and `reduce` see whole `(key, value)` entries. Iteration order is
/// the order of the underlying [`HashMap`] and is not part of the contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
#[serde(bound(
    serialize = "K: Serialize, V: Serialize",
    deserialize = "K: Deserialize<'de> + Eq + Hash, V: Deserialize<'de>"
))]
pub struct MappingCollection<K, V> {
    entries: HashMap<K, V>,
    #[serde(skip)]
    options: CollectionOptions,
}

impl<K, V> MappingCollection<K, V> {
    /// Create a mapping that owns `entries`.
    pub fn new(entries: HashMap<K, V>) -> Self {
        Self {
            entries,
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
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn iter(&self) -> std::collections::hash_map::Iter<'_, K, V> {
        self.entries.iter()
    }

    pub fn as_map(&self) -> &HashMap<K, V> {
        &self.entries
    }

    pub fn into_map(self) -> HashMap<K, V> {
        self.entries
    }

    fn derive<U>(&self, entries: HashMap<K, U>) -> MappingCollection<K, U> {
        MappingCollection {
            entries,
            options: self.options.clone(),
        }
    }
}

impl<K: Eq + Hash, V> MappingCollection<K, V> {
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }
}

impl MappingCollection<String, Value> {
    /// Build a mapping from a JSON object.
    pub fn from_json(input: &str) -> CollectionResult<Self> {
        match parse_json(input)? {
            serde_json::Value::Object(obj) => Ok(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
            other => Err(shape_mismatch("object", other)),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> MappingCollection<K, V> {
    /// Returns a new mapping with `f` applied to every value; keys are kept.
    pub fn map<U, F>(&self, mut f: F) -> MappingCollection<K, U>
    where
        F: FnMut(V) -> U,
    {
        let scope = self.options.begin(KIND, Operation::Map);
        let entries = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), f(v.clone())))
            .collect();
        scope.finish(self.entries.len());
        self.derive(entries)
    }

    /// Like [`MappingCollection::map`], but `f` also sees the key. The key itself is kept.
    pub fn map_entries<U, F>(&self, mut f: F) -> MappingCollection<K, U>
    where
        F: FnMut(&K, V) -> U,
    {
        let scope = self.options.begin(KIND, Operation::Map);
        let entries = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), f(k, v.clone())))
            .collect();
        scope.finish(self.entries.len());
        self.derive(entries)
    }

    /// Returns a new mapping containing only the entries `predicate` accepts.
    ///
    /// Keys are only ever removed, never added or renamed.
    pub fn filter<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&(K, V)) -> bool,
    {
        let scope = self.options.begin(KIND, Operation::Filter);
        let entries = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .filter(|entry| predicate(entry))
            .collect();
        scope.finish(self.entries.len());
        self.derive(entries)
    }

    /// Replaces every value with `f(value)`, in place.
    pub fn foreach<F>(&mut self, mut f: F)
    where
        F: FnMut(V) -> V,
    {
        let scope = self.options.begin(KIND, Operation::Foreach);
        let entries = std::mem::take(&mut self.entries);
        self.entries = entries.into_iter().map(|(k, v)| (k, f(v))).collect();
        scope.finish(self.entries.len());
    }

    /// Folds every `(key, value)` entry into `seed`, in map iteration order.
    pub fn reduce<A, R>(&self, seed: A, reducer: R) -> A
    where
        R: FnMut(A, (K, V)) -> A,
    {
        let scope = self.options.begin(KIND, Operation::Reduce);
        let out = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .fold(seed, reducer);
        scope.finish(self.entries.len());
        out
    }
}

impl<K: Eq + Hash + Clone + Debug, V: Clone> MappingCollection<K, V> {
    /// Like [`MappingCollection::map`], but stops at the first value `f` fails on.
    pub fn try_map<U, F, E>(&self, mut f: F) -> CollectionResult<MappingCollection<K, U>>
    where
        F: FnMut(V) -> Result<U, E>,
        E: Into<BoxError>,
    {
        let scope = self.options.begin(KIND, Operation::Map);
        let mut entries = HashMap::with_capacity(self.entries.len());
        for (k, v) in &self.entries {
            match f(v.clone()) {
                Ok(u) => {
                    entries.insert(k.clone(), u);
                }
                Err(e) => {
                    let position = key_position(k);
                    scope.fail(&position);
                    return Err(CollectionError::element(position, e));
                }
            }
        }
        scope.finish(self.entries.len());
        Ok(self.derive(entries))
    }

    /// Like [`MappingCollection::filter`], but with a predicate that can fail.
    pub fn try_filter<P, E>(&self, mut predicate: P) -> CollectionResult<Self>
    where
        P: FnMut(&(K, V)) -> Result<bool, E>,
        E: Into<BoxError>,
    {
        let scope = self.options.begin(KIND, Operation::Filter);
        let mut entries = HashMap::new();
        for (k, v) in &self.entries {
            let entry = (k.clone(), v.clone());
            match predicate(&entry) {
                Ok(true) => {
                    entries.insert(entry.0, entry.1);
                }
                Ok(false) => {}
                Err(e) => {
                    let position = key_position(k);
                    scope.fail(&position);
                    return Err(CollectionError::element(position, e));
                }
            }
        }
        scope.finish(self.entries.len());
        Ok(self.derive(entries))
    }

    /// Like [`MappingCollection::foreach`]; on failure the mapping is left unchanged.
    pub fn try_foreach<F, E>(&mut self, mut f: F) -> CollectionResult<()>
    where
        F: FnMut(V) -> Result<V, E>,
        E: Into<BoxError>,
    {
        let scope = self.options.begin(KIND, Operation::Foreach);
        let mut entries = HashMap::with_capacity(self.entries.len());
        for (k, v) in &self.entries {
            match f(v.clone()) {
                Ok(v) => {
                    entries.insert(k.clone(), v);
                }
                Err(e) => {
                    let position = key_position(k);
                    scope.fail(&position);
                    return Err(CollectionError::element(position, e));
                }
            }
        }
        scope.finish(entries.len());
        self.entries = entries;
        Ok(())
    }

    /// Like [`MappingCollection::reduce`], but stops at the first failure.
    pub fn try_reduce<A, R, E>(&self, seed: A, mut reducer: R) -> CollectionResult<A>
    where
        R: FnMut(A, (K, V)) -> Result<A, E>,
        E: Into<BoxError>,
    {
        let scope = self.options.begin(KIND, Operation::Reduce);
        let mut acc = seed;
        for (k, v) in &self.entries {
            acc = match reducer(acc, (k.clone(), v.clone())) {
                Ok(acc) => acc,
                Err(e) => {
                    let position = key_position(k);
                    scope.fail(&position);
                    return Err(CollectionError::element(position, e));
                }
            };
        }
        scope.finish(self.entries.len());
        Ok(acc)
    }
}

impl<K: Eq + Hash + Clone, V: Clone + Nested> MappingCollection<K, V> {
    /// Returns a new mapping where every container value has one level of nesting removed.
    ///
    /// `{0: [[1, 2], [3, 4]], 1: [3, 4]}` becomes `{0: [1, 2, 3, 4], 1: [3, 4]}`; values that
    /// are not containers are kept as they are.
    pub fn flatten(&self) -> Self {
        let scope = self.options.begin(KIND, Operation::Flatten);
        let entries = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone().flatten_one()))
            .collect();
        scope.finish(self.entries.len());
        self.derive(entries)
    }

    /// `flatten()` followed by `map(f)`.
    pub fn flatmap<U, F>(&self, f: F) -> MappingCollection<K, U>
    where
        F: FnMut(V) -> U,
    {
        self.flatten().map(f)
    }

    /// `flatten()` followed by [`MappingCollection::map_entries`]: `f` sees each key together
    /// with its flattened value.
    pub fn flatmap_entries<U, F>(&self, f: F) -> MappingCollection<K, U>
    where
        F: FnMut(&K, V) -> U,
    {
        self.flatten().map_entries(f)
    }
}

fn key_position<K: Debug>(key: &K) -> Position {
    Position::Key(format!("{key:?}"))
}

impl<'a, K, V> Collection<'a> for MappingCollection<K, V>
where
    K: Eq + Hash + Clone + Debug + 'a,
    V: Clone + Nested + 'a,
{
    type Item = V;
    type Entry = (K, V);

    fn map<F>(&self, f: F) -> Self
    where
        F: Fn(V) -> V + 'a,
    {
        MappingCollection::map(self, f)
    }

    fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&(K, V)) -> bool + 'a,
    {
        MappingCollection::filter(self, predicate)
    }

    fn foreach<F>(&mut self, f: F)
    where
        F: FnMut(V) -> V,
    {
        MappingCollection::foreach(self, f);
    }

    fn flatten(&self) -> Self {
        MappingCollection::flatten(self)
    }

    fn reduce<A, R>(&self, seed: A, reducer: R) -> A
    where
        R: FnMut(A, (K, V)) -> A,
    {
        MappingCollection::reduce(self, seed, reducer)
    }

    fn try_foreach<F, E>(&mut self, f: F) -> CollectionResult<()>
    where
        F: FnMut(V) -> Result<V, E>,
        E: Into<BoxError>,
    {
        MappingCollection::try_foreach(self, f)
    }

    fn try_reduce<A, R, E>(&self, seed: A, reducer: R) -> CollectionResult<A>
    where
        R: FnMut(A, (K, V)) -> Result<A, E>,
        E: Into<BoxError>,
    {
        MappingCollection::try_reduce(self, seed, reducer)
    }
}

impl<K, V> Default for MappingCollection<K, V> {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl<K: Eq + Hash, V: PartialEq> PartialEq for MappingCollection<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Eq + Hash, V: PartialEq> PartialEq<HashMap<K, V>> for MappingCollection<K, V> {
    fn eq(&self, other: &HashMap<K, V>) -> bool {
        &self.entries == other
    }
}

impl<K, V> From<HashMap<K, V>> for MappingCollection<K, V> {
    fn from(entries: HashMap<K, V>) -> Self {
        Self::new(entries)
    }
}

impl<K: Eq + Hash, V> FromIterator<(K, V)> for MappingCollection<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<K, V> IntoIterator for MappingCollection<K, V> {
    type Item = (K, V);
    type IntoIter = std::collections::hash_map::IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'m, K, V> IntoIterator for &'m MappingCollection<K, V> {
    type Item = (&'m K, &'m V);
    type IntoIter = std::collections::hash_map::Iter<'m, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
