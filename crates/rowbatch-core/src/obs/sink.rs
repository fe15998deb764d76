//! Event routing for batch instrumentation.
//!
//! Update code reports through `record`; only the global sink writes
//! into `obs::metrics`. Tests swap the sink per thread.
use crate::{modification::ChangeKind, obs::metrics};
use std::{cell::RefCell, rc::Rc, time::Instant};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent<'a> {
    BatchStart {
        commands: u64,
        parameters: u64,
    },
    BatchFinish {
        commands: u64,
        rows_affected: u64,
        elapsed_micros: u64,
    },
    BatchFull {
        commands: u64,
    },
    CommandApplied {
        table: &'a str,
        kind: ChangeKind,
        generated_values: u64,
    },
    ConcurrencyConflict {
        table: &'a str,
    },
    ProtocolViolation,
    StoreFailure,
    Cancelled,
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

///
/// GlobalMetricsSink
///
/// Folds events into the process-wide counters when no override is set.
///

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        metrics::with_state_mut(|m| m.apply(event));
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    let override_sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match override_sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state (counters + perf).
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

///
/// Span
///
/// Brackets one batch round trip. `BatchFinish` is emitted on drop, so
/// failed executions are timed too.
///

pub(crate) struct Span {
    commands: u64,
    rows: u64,
    started: Instant,
}

impl Span {
    #[must_use]
    pub(crate) fn new(commands: usize, parameters: usize) -> Self {
        let commands = commands as u64;
        record(MetricsEvent::BatchStart {
            commands,
            parameters: parameters as u64,
        });

        Self {
            commands,
            rows: 0,
            started: Instant::now(),
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed().as_micros();

        record(MetricsEvent::BatchFinish {
            commands: self.commands,
            rows_affected: self.rows,
            elapsed_micros: u64::try_from(elapsed).unwrap_or(u64::MAX),
        });
    }
}

///
/// TESTS
///
