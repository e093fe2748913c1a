//! Eager character sequence.

use std::fmt::{self, Display, Write as _};

use serde::{Deserialize, Serialize};

use super::options::CollectionOptions;
use super::{Collection, parse_json, shape_mismatch};
use crate::error::{BoxError, CollectionError, CollectionResult, Position};
use crate::observability::{CollectionKind, Operation};

const KIND: CollectionKind = CollectionKind::Text;

/// Text processed one character at a time.
///
/// Transforms receive a `char` and may return anything [`Display`]able (a `char`, a `&str`, the
/// iterator from [`char::to_uppercase`], ...); results are joined back into text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextCollection {
    text: String,
    #[serde(skip)]
    options: CollectionOptions,
}

impl TextCollection {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            options: CollectionOptions::default(),
        }
    }

    /// Build text from a JSON string.
    pub fn from_json(input: &str) -> CollectionResult<Self> {
        match parse_json(input)? {
            serde_json::Value::String(s) => Ok(Self::new(s)),
            other => Err(shape_mismatch("string", other)),
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

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn chars(&self) -> std::str::Chars<'_> {
        self.text.chars()
    }

    /// Number of characters (not bytes).
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }

    fn derive(&self, text: String) -> Self {
        Self {
            text,
            options: self.options.clone(),
        }
    }

    /// Returns new text with `f` applied to every character.
    pub fn map<S, F>(&self, mut f: F) -> Self
    where
        S: Display,
        F: FnMut(char) -> S,
    {
        let scope = self.options.begin(KIND, Operation::Map);
        let mut out = String::with_capacity(self.text.len());
        let mut n = 0;
        for c in self.text.chars() {
            push(&mut out, f(c));
            n += 1;
        }
        scope.finish(n);
        self.derive(out)
    }

    /// Like [`TextCollection::map`], but stops at the first character `f` fails on.
    pub fn try_map<S, F, E>(&self, f: F) -> CollectionResult<Self>
    where
        S: Display,
        F: FnMut(char) -> Result<S, E>,
        E: Into<BoxError>,
    {
        let scope = self.options.begin(KIND, Operation::Map);
        match self.transform(f) {
            Ok((out, n)) => {
                scope.finish(n);
                Ok(self.derive(out))
            }
            Err((position, e)) => {
                scope.fail(&position);
                Err(CollectionError::element(position, e))
            }
        }
    }

    /// Returns new text containing only the characters `predicate` accepts.
    pub fn filter<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&char) -> bool,
    {
        let scope = self.options.begin(KIND, Operation::Filter);
        let out = self.text.chars().filter(|c| predicate(c)).collect();
        scope.finish(self.len());
        self.derive(out)
    }

    /// Like [`TextCollection::filter`], but with a predicate that can fail.
    pub fn try_filter<P, E>(&self, mut predicate: P) -> CollectionResult<Self>
    where
        P: FnMut(&char) -> Result<bool, E>,
        E: Into<BoxError>,
    {
        let scope = self.options.begin(KIND, Operation::Filter);
        let mut out = String::new();
        let mut n = 0;
        for (i, c) in self.text.chars().enumerate() {
            match predicate(&c) {
                Ok(true) => out.push(c),
                Ok(false) => {}
                Err(e) => {
                    let position = Position::Index(i);
                    scope.fail(&position);
                    return Err(CollectionError::element(position, e));
                }
            }
            n += 1;
        }
        scope.finish(n);
        Ok(self.derive(out))
    }

    /// Rewrites the text in place, character by character.
    pub fn foreach<S, F>(&mut self, mut f: F)
    where
        S: Display,
        F: FnMut(char) -> S,
    {
        let scope = self.options.begin(KIND, Operation::Foreach);
        let mut out = String::with_capacity(self.text.len());
        let mut n = 0;
        for c in self.text.chars() {
            push(&mut out, f(c));
            n += 1;
        }
        self.text = out;
        scope.finish(n);
    }

    /// Like [`TextCollection::foreach`]; on failure the text is left unchanged.
    pub fn try_foreach<S, F, E>(&mut self, f: F) -> CollectionResult<()>
    where
        S: Display,
        F: FnMut(char) -> Result<S, E>,
        E: Into<BoxError>,
    {
        let scope = self.options.begin(KIND, Operation::Foreach);
        match self.transform(f) {
            Ok((out, n)) => {
                self.text = out;
                scope.finish(n);
                Ok(())
            }
            Err((position, e)) => {
                scope.fail(&position);
                Err(CollectionError::element(position, e))
            }
        }
    }

    /// Returns a new, equal text. Text is already flat.
    pub fn flatten(&self) -> Self {
        let scope = self.options.begin(KIND, Operation::Flatten);
        let out = self.derive(self.text.clone());
        scope.finish(self.len());
        out
    }

    /// `flatten()` followed by `map(f)`.
    pub fn flatmap<S, F>(&self, f: F) -> Self
    where
        S: Display,
        F: FnMut(char) -> S,
    {
        self.flatten().map(f)
    }

    /// Folds all characters left to right into `seed`.
    pub fn reduce<A, R>(&self, seed: A, reducer: R) -> A
    where
        R: FnMut(A, char) -> A,
    {
        let scope = self.options.begin(KIND, Operation::Reduce);
        let out = self.text.chars().fold(seed, reducer);
        scope.finish(self.len());
        out
    }

    /// Like [`TextCollection::reduce`], but stops at the first failure.
    pub fn try_reduce<A, R, E>(&self, seed: A, mut reducer: R) -> CollectionResult<A>
    where
        R: FnMut(A, char) -> Result<A, E>,
        E: Into<BoxError>,
    {
        let scope = self.options.begin(KIND, Operation::Reduce);
        let mut acc = seed;
        let mut n = 0;
        for (i, c) in self.text.chars().enumerate() {
            acc = match reducer(acc, c) {
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

    fn transform<S, F, E>(&self, mut f: F) -> Result<(String, usize), (Position, E)>
    where
        S: Display,
        F: FnMut(char) -> Result<S, E>,
    {
        let mut out = String::with_capacity(self.text.len());
        let mut n = 0;
        for (i, c) in self.text.chars().enumerate() {
            push(&mut out, f(c).map_err(|e| (Position::Index(i), e))?);
            n += 1;
        }
        Ok((out, n))
    }
}

fn push(out: &mut String, piece: impl Display) {
    // Writing into a String cannot fail.
    let _ = write!(out, "{piece}");
}

impl<'a> Collection<'a> for TextCollection {
    type Item = char;
    type Entry = char;

    fn map<F>(&self, f: F) -> Self
    where
        F: Fn(char) -> char + 'a,
    {
        TextCollection::map(self, f)
    }

    fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&char) -> bool + 'a,
    {
        TextCollection::filter(self, predicate)
    }

    fn foreach<F>(&mut self, f: F)
    where
        F: FnMut(char) -> char,
    {
        TextCollection::foreach(self, f);
    }

    fn flatten(&self) -> Self {
        TextCollection::flatten(self)
    }

    fn reduce<A, R>(&self, seed: A, reducer: R) -> A
    where
        R: FnMut(A, char) -> A,
    {
        TextCollection::reduce(self, seed, reducer)
    }

    fn try_foreach<F, E>(&mut self, f: F) -> CollectionResult<()>
    where
        F: FnMut(char) -> Result<char, E>,
        E: Into<BoxError>,
    {
        TextCollection::try_foreach(self, f)
    }

    fn try_reduce<A, R, E>(&self, seed: A, reducer: R) -> CollectionResult<A>
    where
        R: FnMut(A, char) -> Result<A, E>,
        E: Into<BoxError>,
    {
        TextCollection::try_reduce(self, seed, reducer)
    }
}

impl PartialEq for TextCollection {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl PartialEq<str> for TextCollection {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for TextCollection {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

impl PartialEq<String> for TextCollection {
    fn eq(&self, other: &String) -> bool {
        &self.text == other
    }
}

impl fmt::Display for TextCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for TextCollection {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for TextCollection {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl FromIterator<char> for TextCollection {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::TextCollection;
    use crate::error::Position;

    #[test]
    fn map_joins_transformed_characters() {
        let text = TextCollection::new("qwerty");
        let out = text.map(|c| c.to_ascii_uppercase());
        assert_eq!(out, "QWERTY");
        // Original unchanged
        assert_eq!(text, "qwerty");
    }

    #[test]
    fn map_accepts_multi_character_results() {
        let text = TextCollection::new("straße");
        assert_eq!(text.map(char::to_uppercase), "STRASSE");
        assert_eq!(TextCollection::new("ab").map(|c| format!("{c}{c}")), "aabb");
    }

    #[test]
    fn filter_keeps_matching_characters() {
        let out = TextCollection::new("a23").filter(char::is_ascii_digit);
        assert_eq!(out, "23");
    }

    #[test]
    fn foreach_rewrites_text_in_place() {
        let mut text = TextCollection::new("qwerty");
        let () = text.foreach(char::to_uppercase);
        assert_eq!(text, "QWERTY");
    }

    #[test]
    fn flatten_returns_equal_but_separate_text() {
        let text = TextCollection::new("qwerty");
        let out = text.flatten();
        assert_eq!(out, text);
        assert!(!std::ptr::eq(out.as_str().as_ptr(), text.as_str().as_ptr()));
    }

    #[test]
    fn flatmap_matches_map() {
        let text = TextCollection::new("a23");
        assert_eq!(text.flatmap(char::to_uppercase), "A23");
        assert_eq!(
            text.filter(char::is_ascii_digit).map(char::to_uppercase),
            text.filter(char::is_ascii_digit).flatmap(char::to_uppercase)
        );
    }

    #[test]
    fn reduce_groups_letters() {
        let grouped = TextCollection::new("aab").reduce(HashMap::<char, Vec<char>>::new(), |mut acc, c| {
            acc.entry(c).or_default().push(c);
            acc
        });
        assert_eq!(grouped, HashMap::from([('a', vec!['a', 'a']), ('b', vec!['b'])]));
    }

    #[test]
    fn len_counts_characters_not_bytes() {
        assert_eq!(TextCollection::new("ßü").len(), 2);
        assert!(TextCollection::default().is_empty());
    }

    #[test]
    fn try_operations_report_character_index() {
        let mut text = TextCollection::new("1é3x");
        let err = text
            .try_map(|c| c.to_digit(10).ok_or("not a digit"))
            .unwrap_err();
        assert_eq!(err.position(), Some(&Position::Index(1)));

        let err = text
            .try_foreach(|c| if c == 'x' { Err("x") } else { Ok(c) })
            .unwrap_err();
        assert_eq!(err.position(), Some(&Position::Index(3)));
        assert_eq!(text, "1é3x");

        let sum = TextCollection::new("123")
            .try_reduce(0, |acc, c| c.to_digit(10).map(|d| acc + d).ok_or("not a digit"))
            .unwrap();
        assert_eq!(sum, 6);
    }

    #[test]
    fn from_json_reads_strings() {
        let text = TextCollection::from_json("\"abc\"").unwrap();
        assert_eq!(text.map(|c| c.to_ascii_uppercase()).to_string(), "ABC");
    }
}
