use crate::{modification::ChangeKind, obs::sink::MetricsEvent};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    sync::{LazyLock, Mutex, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters and simple perf totals for batch execution.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub perf: EventPerf,
    pub tables: BTreeMap<String, TableCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            perf: EventPerf::default(),
            tables: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

impl EventState {
    /// Fold one event into the counters.
    pub(crate) fn apply(&mut self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::BatchStart {
                commands,
                parameters,
            } => {
                self.ops.batches_started = self.ops.batches_started.saturating_add(1);
                self.ops.parameters_bound = self.ops.parameters_bound.saturating_add(parameters);
                if commands > self.perf.batch_commands_max {
                    self.perf.batch_commands_max = commands;
                }
            }

            MetricsEvent::BatchFinish {
                commands,
                rows_affected,
                elapsed_micros,
            } => {
                self.ops.batches_finished = self.ops.batches_finished.saturating_add(1);
                self.ops.commands_executed = self.ops.commands_executed.saturating_add(commands);
                self.ops.rows_affected = self.ops.rows_affected.saturating_add(rows_affected);
                add_micros(
                    &mut self.perf.batch_micros_total,
                    &mut self.perf.batch_micros_max,
                    elapsed_micros,
                );
            }

            MetricsEvent::BatchFull { .. } => {
                self.ops.batch_full = self.ops.batch_full.saturating_add(1);
            }

            MetricsEvent::CommandApplied {
                table,
                kind,
                generated_values,
            } => {
                self.ops.generated_values =
                    self.ops.generated_values.saturating_add(generated_values);

                let entry = self.tables.entry(table.to_string()).or_default();
                match kind {
                    ChangeKind::Insert => entry.inserts = entry.inserts.saturating_add(1),
                    ChangeKind::Update => entry.updates = entry.updates.saturating_add(1),
                    ChangeKind::Delete => entry.deletes = entry.deletes.saturating_add(1),
                }
            }

            MetricsEvent::ConcurrencyConflict { table } => {
                self.ops.concurrency_conflicts = self.ops.concurrency_conflicts.saturating_add(1);
                let entry = self.tables.entry(table.to_string()).or_default();
                entry.conflicts = entry.conflicts.saturating_add(1);
            }

            MetricsEvent::ProtocolViolation => {
                self.ops.protocol_violations = self.ops.protocol_violations.saturating_add(1);
            }

            MetricsEvent::StoreFailure => {
                self.ops.store_failures = self.ops.store_failures.saturating_add(1);
            }

            MetricsEvent::Cancelled => {
                self.ops.cancellations = self.ops.cancellations.saturating_add(1);
            }
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Batch lifecycle
    pub batches_started: u64,
    pub batches_finished: u64,
    pub batch_full: u64,

    // Work done
    pub commands_executed: u64,
    pub parameters_bound: u64,
    pub rows_affected: u64,
    pub generated_values: u64,

    // Failures
    pub concurrency_conflicts: u64,
    pub protocol_violations: u64,
    pub store_failures: u64,
    pub cancellations: u64,
}

///
/// TableCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TableCounters {
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
    pub conflicts: u64,
}

///
/// EventPerf
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventPerf {
    // Wall-clock totals per batch round trip
    pub batch_micros_total: u128,
    pub batch_micros_max: u64,

    // Largest batch seen
    pub batch_commands_max: u64,
}

static EVENT_STATE: LazyLock<Mutex<EventState>> =
    LazyLock::new(|| Mutex::new(EventState::default()));

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    let state = EVENT_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    f(&state)
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    let mut state = EVENT_STATE.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut state)
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Accumulate a duration and track a max.
fn add_micros(total: &mut u128, max: &mut u64, delta: u64) {
    *total = total.saturating_add(u128::from(delta));
    if delta > *max {
        *max = delta;
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since `since_ms`.
    pub counters: Option<EventState>,
    /// Per-table summaries, sorted by table name.
    pub table_counters: Vec<TableSummary>,
}

///
/// TableSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TableSummary {
    pub table: String,
    pub commands: u64,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
    pub conflicts: u64,
    pub conflict_rate: f64,
}

/// Build a metrics report from the in-memory counters.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub(crate) fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let table_counters = snap
        .tables
        .iter()
        .map(|(table, c)| {
            let commands = c.inserts + c.updates + c.deletes;
            let attempts = commands + c.conflicts;
            let conflict_rate = if attempts > 0 {
                c.conflicts as f64 / attempts as f64
            } else {
                0.0
            };

            TableSummary {
                table: table.clone(),
                commands,
                inserts: c.inserts,
                updates: c.updates,
                deletes: c.deletes,
                conflicts: c.conflicts,
                conflict_rate,
            }
        })
        .collect();

    EventReport {
        counters: Some(snap),
        table_counters,
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_events_accumulate() {
        let mut state = EventState::default();

        state.apply(MetricsEvent::BatchStart {
            commands: 3,
            parameters: 7,
        });
        state.apply(MetricsEvent::BatchFinish {
            commands: 3,
            rows_affected: 3,
            elapsed_micros: 40,
        });
        state.apply(MetricsEvent::BatchStart {
            commands: 1,
            parameters: 2,
        });
        state.apply(MetricsEvent::BatchFinish {
            commands: 1,
            rows_affected: 1,
            elapsed_micros: 90,
        });

        assert_eq!(state.ops.batches_started, 2);
        assert_eq!(state.ops.batches_finished, 2);
        assert_eq!(state.ops.commands_executed, 4);
        assert_eq!(state.ops.parameters_bound, 9);
        assert_eq!(state.ops.rows_affected, 4);
        assert_eq!(state.perf.batch_micros_total, 130);
        assert_eq!(state.perf.batch_micros_max, 90);
        assert_eq!(state.perf.batch_commands_max, 3);
    }

    #[test]
    fn table_counters_split_by_kind_and_conflict() {
        let mut state = EventState::default();

        state.apply(MetricsEvent::CommandApplied {
            table: "orders",
            kind: ChangeKind::Insert,
            generated_values: 1,
        });
        state.apply(MetricsEvent::CommandApplied {
            table: "orders",
            kind: ChangeKind::Delete,
            generated_values: 0,
        });
        state.apply(MetricsEvent::ConcurrencyConflict { table: "orders" });

        let orders = state.tables.get("orders").expect("orders counters");
        assert_eq!(orders.inserts, 1);
        assert_eq!(orders.deletes, 1);
        assert_eq!(orders.conflicts, 1);
        assert_eq!(state.ops.generated_values, 1);
        assert_eq!(state.ops.concurrency_conflicts, 1);
    }

    #[test]
    fn report_serializes_to_json() {
        let report = report();
        let json = serde_json::to_string(&report).expect("report should serialize");

        assert!(json.contains("\"counters\""));
        assert!(json.contains("\"table_counters\""));
    }
}
