//! Element model shared by the collections.
//!
//! Collections are generic over their element type. Flattening needs to know whether an element
//! is itself a container; that capability is expressed by [`Nested`]. [`Value`] is the dynamic
//! element type shipped with the crate, for data whose nesting is only known at runtime (for
//! example data read from JSON).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Result of splitting one level of nesting off an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Unnested<T> {
    /// The element was a container; these are its direct children in order.
    Many(Vec<T>),
    /// The element was not a container and is passed through unchanged.
    One(T),
}

impl<T> IntoIterator for Unnested<T> {
    type Item = T;
    type IntoIter = UnnestedIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            Self::Many(children) => UnnestedIter::Many(children.into_iter()),
            Self::One(atom) => UnnestedIter::One(Some(atom).into_iter()),
        }
    }
}

/// Iterator over the items of an [`Unnested`].
#[derive(Debug)]
pub enum UnnestedIter<T> {
    Many(std::vec::IntoIter<T>),
    One(std::option::IntoIter<T>),
}

impl<T> Iterator for UnnestedIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match self {
            Self::Many(it) => it.next(),
            Self::One(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Many(it) => it.size_hint(),
            Self::One(it) => it.size_hint(),
        }
    }
}

/// Element types that may themselves be sequences of the same type.
///
/// `flatten` on a sequence expands every element through [`Nested::unnest`]. On a mapping it
/// applies [`Nested::flatten_one`] to every value.
pub trait Nested: Sized {
    /// Split off one level of nesting.
    fn unnest(self) -> Unnested<Self>;

    /// Rebuild a container element from its children.
    fn from_children(children: Vec<Self>) -> Self;

    /// Remove one level of nesting inside this element.
    ///
    /// A container's children are expanded into it; atoms are returned unchanged. For example the
    /// list `[[1, 2], [3, 4], 5]` becomes `[1, 2, 3, 4, 5]`.
    fn flatten_one(self) -> Self {
        match self.unnest() {
            Unnested::Many(children) => {
                Self::from_children(children.into_iter().flat_map(Nested::unnest).collect())
            }
            Unnested::One(atom) => atom,
        }
    }
}

/// A single dynamically typed element.
///
/// When flattening, [`Value::List`] expands into its items and [`Value::Utf8`] into one-character
/// strings. Maps, numbers, booleans and null are atoms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// String-keyed object.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Build a [`Value::List`] from anything convertible into values.
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Short name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int64(_) => "int64",
            Self::Float64(_) => "float64",
            Self::Utf8(_) => "utf8",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float64(v) => Some(*v),
            Self::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Utf8(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Nested for Value {
    fn unnest(self) -> Unnested<Self> {
        match self {
            Self::List(items) => Unnested::Many(items),
            Self::Utf8(s) => Unnested::Many(s.chars().map(Self::from).collect()),
            other => Unnested::One(other),
        }
    }

    fn from_children(children: Vec<Self>) -> Self {
        Self::List(children)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int64)
                .or_else(|| n.as_f64().map(Self::Float64))
                .unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::Utf8(s),
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(obj) => {
                Self::Map(obj.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int64(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Self::Utf8(v.to_string())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Utf8(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Utf8(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::{Nested, Unnested, Value};

    #[test]
    fn list_unnests_into_children_and_atoms_pass_through() {
        let list = Value::list([1, 2]);
        assert_eq!(
            list.unnest(),
            Unnested::Many(vec![Value::Int64(1), Value::Int64(2)])
        );
        assert_eq!(Value::Null.unnest(), Unnested::One(Value::Null));
        assert_eq!(Value::Map(Default::default()).unnest(), Unnested::One(Value::Map(Default::default())));
    }

    #[test]
    fn strings_unnest_into_characters() {
        assert_eq!(
            Value::from("ab").unnest(),
            Unnested::Many(vec![Value::from("a"), Value::from("b")])
        );
        assert_eq!(Value::from("").unnest(), Unnested::Many(vec![]));
        assert_eq!(
            Value::List(vec![Value::list([1]), Value::from("xy")]).flatten_one(),
            Value::List(vec![Value::Int64(1), Value::from("x"), Value::from("y")])
        );
    }

    #[test]
    fn flatten_one_removes_exactly_one_level() {
        let v = Value::List(vec![
            Value::list([1, 2]),
            Value::List(vec![Value::list([3])]),
            Value::Int64(4),
        ]);
        assert_eq!(
            v.flatten_one(),
            Value::List(vec![
                Value::Int64(1),
                Value::Int64(2),
                Value::list([3]),
                Value::Int64(4),
            ])
        );
        assert_eq!(Value::Int64(7).flatten_one(), Value::Int64(7));
    }

    #[test]
    fn converts_from_json() {
        let json = serde_json::json!({"a": [1, 2.5, "x", null, true]});
        let v = Value::from(json);
        let Value::Map(map) = v else {
            panic!("expected map");
        };
        assert_eq!(
            map["a"],
            Value::List(vec![
                Value::Int64(1),
                Value::Float64(2.5),
                Value::from("x"),
                Value::Null,
                Value::Bool(true),
            ])
        );
    }

    #[test]
    fn serializes_untagged() {
        let v = Value::List(vec![Value::Int64(1), Value::from("a"), Value::Null]);
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"[1,"a",null]"#);
        let back: Value = serde_json::from_str(r#"[1,"a",null]"#).unwrap();
        assert_eq!(back, v);
    }
}
