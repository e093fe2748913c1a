//! Observer hooks and metrics for collection operations.
//!
//! Attach an observer through [`crate::collections::CollectionOptions`]; every collection derived
//! from an observed collection reports to the same observer.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::Position;

/// Which container produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Sequence,
    Mapping,
    Text,
    Lazy,
}

/// Operation that produced an event.
///
/// `flatmap` reports its two stages (`Flatten` then `Map`) separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Map,
    Filter,
    Foreach,
    Flatten,
    Reduce,
    /// Materializing a lazy collection (`to_vec`/`to_sequence`).
    Collect,
}

/// Events emitted while collections run operations.
#[derive(Debug, Clone)]
pub enum CollectionEvent {
    Started {
        kind: CollectionKind,
        op: Operation,
        label: Option<Arc<str>>,
    },
    Finished {
        kind: CollectionKind,
        op: Operation,
        label: Option<Arc<str>>,
        /// Number of source elements visited.
        elements: usize,
        elapsed: Duration,
    },
    /// A lazy stage was composed; nothing was evaluated.
    Deferred {
        kind: CollectionKind,
        op: Operation,
        label: Option<Arc<str>>,
    },
    Failed {
        kind: CollectionKind,
        op: Operation,
        label: Option<Arc<str>>,
        position: Position,
    },
}

/// Observer hook for collection events.
pub trait CollectionObserver: Send + Sync {
    fn on_event(&self, event: &CollectionEvent);
}

/// Logs collection events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl CollectionObserver for StdErrObserver {
    fn on_event(&self, event: &CollectionEvent) {
        match event {
            CollectionEvent::Started { kind, op, label } => {
                eprintln!("[collections][start] {kind:?}::{op:?} label={}", show(label));
            }
            CollectionEvent::Finished {
                kind,
                op,
                label,
                elements,
                elapsed,
            } => {
                eprintln!(
                    "[collections][ok] {kind:?}::{op:?} label={} elements={elements} elapsed={elapsed:?}",
                    show(label)
                );
            }
            CollectionEvent::Deferred { kind, op, label } => {
                eprintln!("[collections][deferred] {kind:?}::{op:?} label={}", show(label));
            }
            CollectionEvent::Failed {
                kind,
                op,
                label,
                position,
            } => {
                eprintln!(
                    "[collections][fail] {kind:?}::{op:?} label={} at {position}",
                    show(label)
                );
            }
        }
    }
}

fn show(label: &Option<Arc<str>>) -> &str {
    label.as_deref().unwrap_or("-")
}

/// Forwards collection events to `tracing` (feature `tracing`).
#[cfg(feature = "tracing")]
#[derive(Debug, Default)]
pub struct TracingObserver;

#[cfg(feature = "tracing")]
impl CollectionObserver for TracingObserver {
    fn on_event(&self, event: &CollectionEvent) {
        match event {
            CollectionEvent::Started { kind, op, label } => {
                tracing::trace!(?kind, ?op, label = show(label), "collection op started");
            }
            CollectionEvent::Finished {
                kind,
                op,
                label,
                elements,
                elapsed,
            } => {
                tracing::debug!(?kind, ?op, label = show(label), elements, ?elapsed, "collection op finished");
            }
            CollectionEvent::Deferred { kind, op, label } => {
                tracing::trace!(?kind, ?op, label = show(label), "lazy stage deferred");
            }
            CollectionEvent::Failed {
                kind,
                op,
                label,
                position,
            } => {
                tracing::warn!(?kind, ?op, label = show(label), %position, "collection op failed");
            }
        }
    }
}

/// An observer that fans out events to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn CollectionObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn CollectionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl CollectionObserver for CompositeObserver {
    fn on_event(&self, event: &CollectionEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }
}

/// Running counters over every event an observed collection emits.
///
/// Share it as an observer (`Arc<CollectionMetrics>`) and snapshot it at any time.
#[derive(Debug, Default)]
pub struct CollectionMetrics {
    started: AtomicU64,
    finished: AtomicU64,
    failed: AtomicU64,
    deferred: AtomicU64,
    elements: AtomicU64,
    elapsed_ns: AtomicU64,
}

impl CollectionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CollectionMetricsSnapshot {
        CollectionMetricsSnapshot {
            operations_started: self.started.load(Ordering::SeqCst),
            operations_finished: self.finished.load(Ordering::SeqCst),
            operations_failed: self.failed.load(Ordering::SeqCst),
            stages_deferred: self.deferred.load(Ordering::SeqCst),
            elements_processed: self.elements.load(Ordering::SeqCst),
            busy: Duration::from_nanos(self.elapsed_ns.load(Ordering::SeqCst)),
        }
    }
}

impl CollectionObserver for CollectionMetrics {
    fn on_event(&self, event: &CollectionEvent) {
        match event {
            CollectionEvent::Started { .. } => {
                let _ = self.started.fetch_add(1, Ordering::SeqCst);
            }
            CollectionEvent::Finished {
                elements, elapsed, ..
            } => {
                let _ = self.finished.fetch_add(1, Ordering::SeqCst);
                let _ = self.elements.fetch_add(*elements as u64, Ordering::SeqCst);
                let add = elapsed.as_nanos().min(u64::MAX as u128) as u64;
                let _ = self.elapsed_ns.fetch_add(add, Ordering::SeqCst);
            }
            CollectionEvent::Deferred { .. } => {
                let _ = self.deferred.fetch_add(1, Ordering::SeqCst);
            }
            CollectionEvent::Failed { .. } => {
                let _ = self.failed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

/// Immutable snapshot of [`CollectionMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMetricsSnapshot {
    pub operations_started: u64,
    pub operations_finished: u64,
    pub operations_failed: u64,
    pub stages_deferred: u64,
    pub elements_processed: u64,
    /// Total time spent inside finished operations.
    pub busy: Duration,
}

impl fmt::Display for CollectionMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ops={}/{}, failed={}, deferred={}, elements_processed={}, busy={:?}",
            self.operations_finished,
            self.operations_started,
            self.operations_failed,
            self.stages_deferred,
            self.elements_processed,
            self.busy
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{
        CollectionEvent, CollectionKind, CollectionMetrics, CollectionObserver, CompositeObserver,
        Operation, StdErrObserver,
    };
    use crate::error::Position;

    fn finished(elements: usize) -> CollectionEvent {
        CollectionEvent::Finished {
            kind: CollectionKind::Sequence,
            op: Operation::Map,
            label: None,
            elements,
            elapsed: Duration::from_micros(5),
        }
    }

    #[test]
    fn metrics_count_events() {
        let m = CollectionMetrics::new();
        m.on_event(&CollectionEvent::Started {
            kind: CollectionKind::Sequence,
            op: Operation::Map,
            label: None,
        });
        m.on_event(&finished(3));
        m.on_event(&CollectionEvent::Failed {
            kind: CollectionKind::Mapping,
            op: Operation::Reduce,
            label: Some("m".into()),
            position: Position::Key("1".to_string()),
        });
        m.on_event(&CollectionEvent::Deferred {
            kind: CollectionKind::Lazy,
            op: Operation::Filter,
            label: None,
        });

        let snap = m.snapshot();
        assert_eq!(snap.operations_started, 1);
        assert_eq!(snap.operations_finished, 1);
        assert_eq!(snap.operations_failed, 1);
        assert_eq!(snap.stages_deferred, 1);
        assert_eq!(snap.elements_processed, 3);
        assert_eq!(snap.busy, Duration::from_micros(5));
        assert!(snap.to_string().contains("elements_processed=3"));
    }

    #[test]
    fn composite_fans_out_to_every_observer() {
        let a = Arc::new(CollectionMetrics::new());
        let b = Arc::new(CollectionMetrics::new());
        let observers: Vec<Arc<dyn CollectionObserver>> = vec![a.clone(), b.clone()];
        let composite = CompositeObserver::new(observers);
        composite.on_event(&finished(2));
        assert_eq!(a.snapshot().elements_processed, 2);
        assert_eq!(b.snapshot().elements_processed, 2);
        assert!(format!("{composite:?}").contains("observers_len: 2"));
    }

    #[test]
    fn stderr_observer_accepts_every_event() {
        let obs = StdErrObserver;
        obs.on_event(&finished(1));
        obs.on_event(&CollectionEvent::Failed {
            kind: CollectionKind::Text,
            op: Operation::Foreach,
            label: Some("t".into()),
            position: Position::Index(4),
        });
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn tracing_observer_accepts_every_event() {
        use super::TracingObserver;

        let obs = TracingObserver;
        let label = Some("traced".into());
        obs.on_event(&CollectionEvent::Started {
            kind: CollectionKind::Sequence,
            op: Operation::Map,
            label: label.clone(),
        });
        obs.on_event(&finished(2));
        obs.on_event(&CollectionEvent::Deferred {
            kind: CollectionKind::Lazy,
            op: Operation::Flatten,
            label: label.clone(),
        });
        obs.on_event(&CollectionEvent::Failed {
            kind: CollectionKind::Mapping,
            op: Operation::Reduce,
            label,
            position: Position::Key("\"k\"".to_string()),
        });
    }
}
