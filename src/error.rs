use std::fmt;

use thiserror::Error;

/// Convenience result type for fallible collection operations.
pub type CollectionResult<T> = Result<T, CollectionError>;

/// Boxed failure produced by a caller-supplied function.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Where in a collection an element lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    /// Zero-based traversal index (sequence element, character, or lazy item).
    Index(usize),
    /// Mapping key, rendered with its `Debug` representation.
    Key(String),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "index {i}"),
            Self::Key(k) => write!(f, "key {k}"),
        }
    }
}

/// Error type returned by fallible collection operations and constructors.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// A transform, predicate or reducer failed on a specific element.
    #[error("element transform failed at {position}: {source}")]
    ElementTransform {
        position: Position,
        #[source]
        source: BoxError,
    },

    /// JSON input could not be parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON input parsed, but has the wrong shape for the requested collection.
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: &'static str, found: String },
}

impl CollectionError {
    pub(crate) fn element(position: Position, source: impl Into<BoxError>) -> Self {
        Self::ElementTransform {
            position,
            source: source.into(),
        }
    }

    /// Position of the failing element, for [`CollectionError::ElementTransform`].
    pub fn position(&self) -> Option<&Position> {
        match self {
            Self::ElementTransform { position, .. } => Some(position),
            _ => None,
        }
    }
}
