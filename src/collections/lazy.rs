//! Lazily evaluated sequence.
//!
//! A [`LazyCollection`] holds a *factory* that starts a fresh pass over its elements. `map`,
//! `filter`, `flatten` and `flatmap` wrap the factory in another stage and return immediately;
//! no element is pulled or transformed until the collection is iterated or consumed by a
//! terminal operation (`reduce`, `foreach`, `to_vec`).
//!
//! Re-consumption policy: every pass starts over from the source, so iterating twice yields the
//! same elements twice. Partial consumption (dropping an iterator early) has no effect on later
//! passes. One-shot iterators go through [`LazyCollection::memoized`], which caches the elements
//! it has pulled so that later passes replay them instead of observing an exhausted source.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::options::CollectionOptions;
use super::sequence::SequenceCollection;
use super::Collection;
use crate::error::{BoxError, CollectionError, CollectionResult, Position};
use crate::observability::{CollectionKind, Operation};
use crate::types::Nested;

const KIND: CollectionKind = CollectionKind::Lazy;

type Pass<'a, T> = Box<dyn Iterator<Item = T> + 'a>;
type Source<'a, T> = Rc<dyn Fn() -> Pass<'a, T> + 'a>;

fn source<'a, T, F, I>(factory: F) -> Source<'a, T>
where
    F: Fn() -> I + 'a,
    I: Iterator<Item = T> + 'a,
{
    Rc::new(move || -> Pass<'a, T> { Box::new(factory()) })
}

fn replay<'a, T: Clone + 'a>(items: Vec<T>) -> Source<'a, T> {
    let items: Rc<[T]> = items.into();
    source(move || {
        let items = Rc::clone(&items);
        (0..items.len()).map(move |i| items[i].clone())
    })
}

/// Elements pulled so far from a one-shot iterator, plus whatever it has left.
struct Memo<I: Iterator> {
    seen: Vec<I::Item>,
    rest: Option<I>,
}

impl<I> Memo<I>
where
    I: Iterator,
    I::Item: Clone,
{
    fn get(&mut self, pos: usize) -> Option<I::Item> {
        if let Some(item) = self.seen.get(pos) {
            return Some(item.clone());
        }
        match self.rest.as_mut()?.next() {
            Some(item) => {
                self.seen.push(item.clone());
                Some(item)
            }
            None => {
                self.rest = None;
                None
            }
        }
    }
}

/// A deferred, restartable sequence.
///
/// Chaining never evaluates anything; see the [module docs](self) for the consumption rules.
/// Lazy collections are single-threaded (`!Send`).
pub struct LazyCollection<'a, T> {
    source: Source<'a, T>,
    options: CollectionOptions,
}

/// Iterator over one pass of a [`LazyCollection`].
pub struct LazyIter<'a, T> {
    inner: Pass<'a, T>,
}

impl<T> Iterator for LazyIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> fmt::Debug for LazyIter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyIter").finish_non_exhaustive()
    }
}

impl<'a, T: 'a> LazyCollection<'a, T> {
    /// Wrap a re-iterable source. Each pass iterates a fresh clone of `source`.
    ///
    /// Cloning is cheap for the usual sources: ranges, slices, `&Vec<T>`, iterator adapters over
    /// borrowed data.
    pub fn new<I>(source: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + 'a,
        I::IntoIter: 'a,
    {
        Self::from_fn(move || source.clone())
    }

    /// Wrap a factory that produces a fresh iterable for every pass.
    pub fn from_fn<F, I>(factory: F) -> Self
    where
        F: Fn() -> I + 'a,
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
    {
        Self {
            source: source(move || factory().into_iter()),
            options: CollectionOptions::default(),
        }
    }

    /// Wrap a one-shot iterator.
    ///
    /// Nothing is pulled until the first pass. Pulled elements are cached, so every pass
    /// (including passes that interleave) observes the full sequence.
    pub fn memoized<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
        T: Clone,
    {
        let memo = Rc::new(RefCell::new(Memo {
            seen: Vec::new(),
            rest: Some(iter.into_iter()),
        }));
        Self {
            source: source(move || {
                let memo = Rc::clone(&memo);
                let mut pos = 0;
                std::iter::from_fn(move || {
                    let item = memo.borrow_mut().get(pos)?;
                    pos += 1;
                    Some(item)
                })
            }),
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

    /// Start a new pass over the elements.
    pub fn iter(&self) -> LazyIter<'a, T> {
        LazyIter {
            inner: (self.source)(),
        }
    }

    /// Run one full pass and collect the elements.
    pub fn to_vec(&self) -> Vec<T> {
        let scope = self.options.begin(KIND, Operation::Collect);
        let items: Vec<T> = (self.source)().collect();
        scope.finish(items.len());
        items
    }

    /// Run one full pass into an eager [`SequenceCollection`] with the same options.
    pub fn to_sequence(&self) -> SequenceCollection<T> {
        SequenceCollection::new(self.to_vec()).with_options(self.options.clone())
    }

    fn stage<U>(&self, op: Operation, next: Source<'a, U>) -> LazyCollection<'a, U> {
        self.options.deferred(KIND, op);
        LazyCollection {
            source: next,
            options: self.options.clone(),
        }
    }

    /// Deferred `map`: `f` runs once per element per pass.
    pub fn map<U, F>(&self, f: F) -> LazyCollection<'a, U>
    where
        U: 'a,
        F: Fn(T) -> U + 'a,
    {
        let upstream = Rc::clone(&self.source);
        let f = Rc::new(f);
        self.stage(
            Operation::Map,
            source(move || {
                let f = Rc::clone(&f);
                upstream().map(move |x| f(x))
            }),
        )
    }

    /// Deferred `filter`.
    pub fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + 'a,
    {
        let upstream = Rc::clone(&self.source);
        let predicate = Rc::new(predicate);
        self.stage(
            Operation::Filter,
            source(move || {
                let predicate = Rc::clone(&predicate);
                upstream().filter(move |x| predicate(x))
            }),
        )
    }

    /// Deferred fallible `map`.
    ///
    /// Each element becomes `Ok(f(element))`, or an [`CollectionError::ElementTransform`] carrying
    /// the element's index in this stage's input when `f` fails. Nothing runs until the result is
    /// consumed; [`LazyCollection::try_to_vec`] stops at the first failure.
    pub fn try_map<U, F, E>(&self, f: F) -> LazyCollection<'a, CollectionResult<U>>
    where
        U: 'a,
        F: Fn(T) -> Result<U, E> + 'a,
        E: Into<BoxError> + 'a,
    {
        let upstream = Rc::clone(&self.source);
        let f = Rc::new(f);
        self.stage(
            Operation::Map,
            source(move || {
                let f = Rc::clone(&f);
                upstream().enumerate().map(move |(i, x)| {
                    f(x).map_err(|e| CollectionError::element(Position::Index(i), e))
                })
            }),
        )
    }

    /// Deferred fallible `filter`: rejected elements are dropped, and a failing predicate yields
    /// an `Err` in place of the element.
    pub fn try_filter<P, E>(&self, predicate: P) -> LazyCollection<'a, CollectionResult<T>>
    where
        P: Fn(&T) -> Result<bool, E> + 'a,
        E: Into<BoxError> + 'a,
    {
        let upstream = Rc::clone(&self.source);
        let predicate = Rc::new(predicate);
        self.stage(
            Operation::Filter,
            source(move || {
                let predicate = Rc::clone(&predicate);
                upstream()
                    .enumerate()
                    .filter_map(move |(i, x)| match predicate(&x) {
                        Ok(true) => Some(Ok(x)),
                        Ok(false) => None,
                        Err(e) => Some(Err(CollectionError::element(Position::Index(i), e))),
                    })
            }),
        )
    }

    /// Folds one full pass into `seed`.
    pub fn reduce<A, R>(&self, seed: A, mut reducer: R) -> A
    where
        R: FnMut(A, T) -> A,
    {
        let scope = self.options.begin(KIND, Operation::Reduce);
        let mut n = 0;
        let out = (self.source)().fold(seed, |acc, x| {
            n += 1;
            reducer(acc, x)
        });
        scope.finish(n);
        out
    }

    /// Like [`LazyCollection::reduce`], but stops at the first failure.
    pub fn try_reduce<A, R, E>(&self, seed: A, mut reducer: R) -> CollectionResult<A>
    where
        R: FnMut(A, T) -> Result<A, E>,
        E: Into<BoxError>,
    {
        let scope = self.options.begin(KIND, Operation::Reduce);
        let mut acc = seed;
        let mut n = 0;
        for (i, item) in (self.source)().enumerate() {
            acc = match reducer(acc, item) {
                Ok(acc) => acc,
                Err(e) => {
                    let position = Position::Index(i);
                    scope.fail(&position);
                    return Err(CollectionError::element(position, e));
                }
            };
            n += 1;
        }
        scope.finish(n);
        Ok(acc)
    }
}

impl<'a, T: 'a> LazyCollection<'a, CollectionResult<T>> {
    /// Run one full pass of a fallible pipeline and stop at the first failed element.
    pub fn try_to_vec(&self) -> CollectionResult<Vec<T>> {
        let scope = self.options.begin(KIND, Operation::Collect);
        let mut items = Vec::new();
        for item in (self.source)() {
            match item {
                Ok(v) => items.push(v),
                Err(e) => {
                    if let Some(position) = e.position() {
                        scope.fail(position);
                    }
                    return Err(e);
                }
            }
        }
        scope.finish(items.len());
        Ok(items)
    }

    /// Like [`LazyCollection::to_sequence`] for a fallible pipeline.
    pub fn try_to_sequence(&self) -> CollectionResult<SequenceCollection<T>> {
        Ok(SequenceCollection::new(self.try_to_vec()?).with_options(self.options.clone()))
    }
}

impl<'a, T: Clone + 'a> LazyCollection<'a, T> {
    /// Evaluates the whole pipeline now and replaces the source with the materialized
    /// `f(element)` results. Later passes replay those results.
    pub fn foreach<F>(&mut self, f: F)
    where
        F: FnMut(T) -> T,
    {
        let scope = self.options.begin(KIND, Operation::Foreach);
        let items: Vec<T> = (self.source)().map(f).collect();
        let n = items.len();
        self.source = replay(items);
        scope.finish(n);
    }

    /// Like [`LazyCollection::foreach`]; on failure the source is left as it was.
    pub fn try_foreach<F, E>(&mut self, mut f: F) -> CollectionResult<()>
    where
        F: FnMut(T) -> Result<T, E>,
        E: Into<BoxError>,
    {
        let scope = self.options.begin(KIND, Operation::Foreach);
        let mut items = Vec::new();
        for (i, item) in (self.source)().enumerate() {
            match f(item) {
                Ok(v) => items.push(v),
                Err(e) => {
                    let position = Position::Index(i);
                    scope.fail(&position);
                    return Err(CollectionError::element(position, e));
                }
            }
        }
        let n = items.len();
        self.source = replay(items);
        scope.finish(n);
        Ok(())
    }
}

impl<'a, T: Nested + 'a> LazyCollection<'a, T> {
    /// Deferred `flatten`: container elements are expanded one level as they are pulled.
    pub fn flatten(&self) -> Self {
        let upstream = Rc::clone(&self.source);
        self.stage(
            Operation::Flatten,
            source(move || upstream().flat_map(Nested::unnest)),
        )
    }

    /// Deferred `flatten().map(f)`.
    pub fn flatmap<U, F>(&self, f: F) -> LazyCollection<'a, U>
    where
        U: 'a,
        F: Fn(T) -> U + 'a,
    {
        self.flatten().map(f)
    }
}

impl<'a, T: Clone + Nested + 'a> Collection<'a> for LazyCollection<'a, T> {
    type Item = T;
    type Entry = T;

    fn map<F>(&self, f: F) -> Self
    where
        F: Fn(T) -> T + 'a,
    {
        LazyCollection::map(self, f)
    }

    fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + 'a,
    {
        LazyCollection::filter(self, predicate)
    }

    fn foreach<F>(&mut self, f: F)
    where
        F: FnMut(T) -> T,
    {
        LazyCollection::foreach(self, f);
    }

    fn flatten(&self) -> Self {
        LazyCollection::flatten(self)
    }

    fn reduce<A, R>(&self, seed: A, reducer: R) -> A
    where
        R: FnMut(A, T) -> A,
    {
        LazyCollection::reduce(self, seed, reducer)
    }

    fn try_foreach<F, E>(&mut self, f: F) -> CollectionResult<()>
    where
        F: FnMut(T) -> Result<T, E>,
        E: Into<BoxError>,
    {
        LazyCollection::try_foreach(self, f)
    }

    fn try_reduce<A, R, E>(&self, seed: A, reducer: R) -> CollectionResult<A>
    where
        R: FnMut(A, T) -> Result<A, E>,
        E: Into<BoxError>,
    {
        LazyCollection::try_reduce(self, seed, reducer)
    }
}

impl<T> Clone for LazyCollection<'_, T> {
    fn clone(&self) -> Self {
        Self {
            source: Rc::clone(&self.source),
            options: self.options.clone(),
        }
    }
}

impl<T> fmt::Debug for LazyCollection<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCollection")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a, T: 'a> IntoIterator for &LazyCollection<'a, T> {
    type Item = T;
    type IntoIter = LazyIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
