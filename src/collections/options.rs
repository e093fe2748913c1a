use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::error::Position;
use crate::observability::{CollectionEvent, CollectionKind, CollectionObserver, Operation};

/// Options shared by every collection type.
///
/// Collections produced by an operation inherit the options of the collection they came from.
/// Use [`Default`] for an unlabeled, unobserved collection.
#[derive(Clone, Default)]
pub struct CollectionOptions {
    /// Name reported with every event, to tell collections apart in logs.
    pub label: Option<Arc<str>>,
    /// Optional observer for logging/metrics.
    pub observer: Option<Arc<dyn CollectionObserver>>,
}

impl CollectionOptions {
    pub fn with_label(mut self, label: impl Into<Arc<str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn CollectionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub(crate) fn begin(&self, kind: CollectionKind, op: Operation) -> OpScope<'_> {
        let start = self.observer.as_ref().map(|obs| {
            obs.on_event(&CollectionEvent::Started {
                kind,
                op,
                label: self.label.clone(),
            });
            Instant::now()
        });
        OpScope {
            options: self,
            kind,
            op,
            start,
        }
    }

    pub(crate) fn deferred(&self, kind: CollectionKind, op: Operation) {
        if let Some(obs) = &self.observer {
            obs.on_event(&CollectionEvent::Deferred {
                kind,
                op,
                label: self.label.clone(),
            });
        }
    }
}

impl fmt::Debug for CollectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionOptions")
            .field("label", &self.label)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

/// One running operation; reports `Finished` or `Failed` when closed.
pub(crate) struct OpScope<'o> {
    options: &'o CollectionOptions,
    kind: CollectionKind,
    op: Operation,
    start: Option<Instant>,
}

impl OpScope<'_> {
    pub(crate) fn finish(self, elements: usize) {
        if let (Some(obs), Some(start)) = (&self.options.observer, self.start) {
            obs.on_event(&CollectionEvent::Finished {
                kind: self.kind,
                op: self.op,
                label: self.options.label.clone(),
                elements,
                elapsed: start.elapsed(),
            });
        }
    }

    pub(crate) fn fail(self, position: &Position) {
        if let Some(obs) = &self.options.observer {
            obs.on_event(&CollectionEvent::Failed {
                kind: self.kind,
                op: self.op,
                label: self.options.label.clone(),
                position: position.clone(),
            });
        }
    }
}
