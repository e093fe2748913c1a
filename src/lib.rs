//! `parallel-collections` gives four container shapes one set of functional operations:
//! `map`, `filter`, `foreach`, `flatten`, `flatmap` and `reduce`.
//!
//! Calling code can treat "a collection of items" uniformly while each shape keeps its own
//! semantics: a mapping stays a mapping, text stays text, and a lazy sequence stays lazy.
//!
//! ## Collections
//!
//! - [`collections::SequenceCollection`]: eager ordered sequence, possibly nested one level
//! - [`collections::MappingCollection`]: eager key→value mapping; operations act on values and
//!   keep keys, while `filter`/`reduce` see `(key, value)` entries
//! - [`collections::TextCollection`]: eager text, processed character by character and joined
//!   back into text
//! - [`collections::LazyCollection`]: deferred, restartable sequence; nothing runs until it is
//!   iterated or consumed
//!
//! All four implement [`collections::Collection`] for code that is generic over the shape.
//!
//! ## Contract
//!
//! - Every operation except `foreach` returns a new value and leaves the receiver untouched.
//! - `foreach` rewrites the receiver in place and returns `()`.
//! - `flatten` removes exactly one level of nesting. Which elements count as nested is decided by
//!   [`types::Nested`]; [`types::Value`] expands lists into their items and strings into
//!   one-character strings.
//! - `flatmap(f)` is `flatten().map(f)`.
//! - `reduce` is a left fold from an explicit seed; no operation supplies a default accumulator.
//! - Order is preserved for sequences, text and lazy sequences. Mappings preserve keys, not order.
//! - Everything runs synchronously on the calling thread.
//!
//! Fallible variants (`try_map`, `try_filter`, `try_foreach`, `try_reduce`, and the lazy
//! `try_to_vec`) report the first failing element through [`CollectionError::ElementTransform`],
//! with its index or key.
//!
//! ## Example: sequence
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use parallel_collections::collections::SequenceCollection;
//! use parallel_collections::types::Value;
//!
//! let seq = SequenceCollection::new(vec![Value::list(0..3), Value::list(0..3)]);
//!
//! let flat = seq.flatten();
//! assert_eq!(flat.len(), 6);
//!
//! let doubled = seq.flatmap(|v| Value::Int64(v.as_i64().unwrap_or(0) * 2));
//! assert_eq!(doubled, seq.flatten().map(|v| Value::Int64(v.as_i64().unwrap_or(0) * 2)));
//!
//! let letters = SequenceCollection::new(vec!["a", "a", "b"]);
//! let grouped = letters.reduce(HashMap::<&str, Vec<&str>>::new(), |mut acc, letter| {
//!     acc.entry(letter).or_default().push(letter);
//!     acc
//! });
//! assert_eq!(grouped["a"], vec!["a", "a"]);
//! ```
//!
//! ## Example: mapping, text and lazy
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use parallel_collections::collections::{LazyCollection, MappingCollection, TextCollection};
//! use parallel_collections::types::Value;
//!
//! let m = MappingCollection::new(HashMap::from([
//!     (0, Value::List(vec![Value::list([1, 2]), Value::list([3, 4])])),
//!     (1, Value::list([3, 4])),
//! ]));
//! assert_eq!(
//!     m.flatten(),
//!     HashMap::from([(0, Value::list([1, 2, 3, 4])), (1, Value::list([3, 4]))])
//! );
//!
//! assert_eq!(TextCollection::new("qwerty").map(char::to_uppercase), "QWERTY");
//!
//! let lazy = LazyCollection::new(0..5).filter(|n| n % 2 == 0).map(|n| n * 10);
//! assert_eq!(lazy.to_vec(), vec![0, 20, 40]);
//! ```
//!
//! ## Modules
//!
//! - [`collections`]: the four collections, their options, and the shared [`collections::Collection`] trait
//! - [`types`]: element model ([`types::Value`], [`types::Nested`])
//! - [`observability`]: observer hooks and metrics for collection operations
//! - [`error`]: error types

pub mod collections;
pub mod error;
pub mod observability;
pub mod types;

pub use error::{BoxError, CollectionError, CollectionResult, Position};
