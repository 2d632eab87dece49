//! Scheduler
//!
//! Owns the dependency graph, the FIFO ready queue, the in-flight lease
//! table and the expression registry for the whole process. Every mutation
//! goes through one mutex; the lock is never held across a Store call or any
//! other blocking operation. Store writes use snapshots captured inside the
//! critical section and are retried by a background flush when they fail.
//!
//! ## Lifecycle driven here
//! 1. **Submit**: register parsed tasks, seed the ready queue with leaves.
//! 2. **Acquire**: pop the queue head, lease it to a worker.
//! 3. **SubmitResult**: fan the value into dependents, enqueue newly ready
//!    tasks, complete the expression when its last task finishes.
//! 4. **Reap**: return expired leases to the queue so lost workers cannot
//!    strand a task.

use crate::parser::TaskSpec;
use crate::scheduler::graph::TaskGraph;
use crate::scheduler::types::{now_ms, Expression, ExpressionStatus, Task, TaskState};
use crate::store::{Store, StoreError};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome of a result submission, mapped to a wire `Ack` by the dispatch
/// handlers. `Accepted` covers both first delivery and identical replay so a
/// retrying worker observes the same acknowledgement either way.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted,
    Conflict,
    UnknownTask,
    Malformed(&'static str),
}

struct InFlightLease {
    worker: String,
    lease_deadline: u64,
}

struct SchedulerState {
    graph: TaskGraph,
    ready: VecDeque<i32>,
    inflight: HashMap<i32, InFlightLease>,
    expressions: HashMap<String, Expression>,
    expr_counter: u64,
}

/// Point-in-time counters for the stats endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerStats {
    pub ready: usize,
    pub inflight: usize,
    pub tasks: usize,
    pub expressions_pending: usize,
    pub expressions_completed: usize,
    pub expressions_error: usize,
}

pub struct Scheduler {
    state: Mutex<SchedulerState>,
    /// Expression snapshots whose durable write failed, drained by the
    /// background flush loop.
    pending_writes: Mutex<Vec<Expression>>,
    store: Arc<dyn Store>,
    lease_ttl_ms: u64,
}

impl Scheduler {
    pub fn new(store: Arc<dyn Store>, lease_ttl_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SchedulerState {
                graph: TaskGraph::new(),
                ready: VecDeque::new(),
                inflight: HashMap::new(),
                expressions: HashMap::new(),
                expr_counter: 0,
            }),
            pending_writes: Mutex::new(Vec::new()),
            store,
            lease_ttl_ms,
        })
    }

    /// Spawns the lease reaper and the store flush loop.
    pub fn start(self: Arc<Self>) {
        let reap_period = Duration::from_millis((self.lease_ttl_ms / 4).max(250));

        let reaper = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(reap_period);
            loop {
                interval.tick().await;
                let reclaimed = reaper.reap();
                if reclaimed > 0 {
                    tracing::info!("Reaped {} expired task lease(s)", reclaimed);
                }
            }
        });

        let flusher = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(FLUSH_INTERVAL);
            loop {
                interval.tick().await;
                flusher.flush_pending_writes();
            }
        });

        tracing::info!(
            "Scheduler started (lease {} ms, reap every {:?})",
            self.lease_ttl_ms,
            reap_period
        );
    }

    /// Registers a parsed expression and seeds the ready queue with its
    /// leaves. Returns the assigned expression id.
    pub fn submit(&self, owner_id: i64, specs: Vec<TaskSpec>) -> String {
        let task_count = specs.len();
        let (expression_id, snapshot, wedged) = {
            let mut state = self.state.lock().expect("scheduler mutex poisoned");

            state.expr_counter += 1;
            let expression_id = format!("{}-{}", now_ms(), state.expr_counter);

            let expression = Expression {
                id: expression_id.clone(),
                owner_id,
                status: ExpressionStatus::Pending,
                result: None,
                created_at: now_ms(),
            };
            state
                .expressions
                .insert(expression_id.clone(), expression.clone());

            let ready = state.graph.register(&expression_id, specs);
            state.ready.extend(&ready);

            tracing::info!(
                "Submitted expression {} with {} task(s), {} immediately ready",
                expression_id,
                task_count,
                ready.len()
            );

            // An expression such as "10/0" emits no ready task and will never
            // receive a result, so the wedge check must run right here.
            let wedged = self.transition_if_wedged(&mut state, &expression_id);

            (expression_id, expression, wedged)
        };

        self.write_through(&snapshot, true);
        if let Some(errored) = wedged {
            self.write_through(&errored, false);
        }

        expression_id
    }

    /// Hands the oldest ready task to a worker, leasing it for
    /// `lease_ttl_ms`. Returns `None` when the queue is empty. Never blocks.
    pub fn acquire_task(&self, worker: &str) -> Option<Task> {
        let mut state = self.state.lock().expect("scheduler mutex poisoned");

        loop {
            let task_id = state.ready.pop_front()?;

            // The owning expression may have reached a terminal state while
            // the id sat in the queue.
            let Some(task) = state.graph.task_mut(task_id) else {
                continue;
            };
            if task.state != TaskState::Ready {
                continue;
            }

            task.state = TaskState::InFlight;
            let leased = task.clone();

            state.inflight.insert(
                task_id,
                InFlightLease {
                    worker: worker.to_string(),
                    lease_deadline: now_ms() + self.lease_ttl_ms,
                },
            );

            tracing::debug!(
                "Leased task {} ({} {} {}) to worker {}",
                leased.id,
                leased.arg1,
                leased.op.as_str(),
                leased.arg2,
                worker
            );

            return Some(leased);
        }
    }

    /// Accepts a worker's result.
    ///
    /// Identical re-submissions are acknowledged exactly like the first
    /// delivery; a differing value for an already-recorded task is refused as
    /// a conflict; a non-finite value is refused outright and the task keeps
    /// its lease until the reaper recovers it.
    pub fn submit_result(
        &self,
        task_id: i32,
        value: f64,
        claimed_expression_id: &str,
    ) -> SubmitOutcome {
        let (outcome, completed, errored) = {
            let mut state = self.state.lock().expect("scheduler mutex poisoned");

            if !value.is_finite() {
                tracing::warn!("Refusing non-finite result for task {}", task_id);
                return SubmitOutcome::Malformed("non-finite result");
            }

            if let Some(stored) = state.graph.result(task_id) {
                return if stored == value {
                    tracing::debug!("Duplicate result for task {} replayed", task_id);
                    SubmitOutcome::Accepted
                } else {
                    tracing::error!(
                        "Conflicting result for task {}: recorded {} got {}",
                        task_id,
                        stored,
                        value
                    );
                    SubmitOutcome::Conflict
                };
            }

            let expression_id = match state.graph.task(task_id) {
                Some(task) => task.expression_id.clone(),
                None => {
                    tracing::warn!("Result for unknown task {}", task_id);
                    return SubmitOutcome::UnknownTask;
                }
            };

            if expression_id != claimed_expression_id {
                tracing::warn!(
                    "Result for task {} claims expression {} but belongs to {}",
                    task_id,
                    claimed_expression_id,
                    expression_id
                );
                return SubmitOutcome::Malformed("expression mismatch");
            }

            state.inflight.remove(&task_id);
            // A reaped task may have been re-enqueued before the original
            // worker's late result landed; drop the stale queue entry.
            state.ready.retain(|&id| id != task_id);

            let newly_ready = state.graph.resolve(task_id, value);
            state.ready.extend(&newly_ready);

            tracing::debug!(
                "Recorded result for task {}: {} ({} dependent(s) now ready)",
                task_id,
                value,
                newly_ready.len()
            );

            let completed = if state.graph.remaining_tasks(&expression_id) == 0 {
                self.complete_expression(&mut state, &expression_id)
            } else {
                None
            };

            let errored = if completed.is_none() {
                self.transition_if_wedged(&mut state, &expression_id)
            } else {
                None
            };

            (SubmitOutcome::Accepted, completed, errored)
        };

        if let Err(e) = self
            .store
            .record_result(task_id, value, claimed_expression_id)
        {
            tracing::warn!("Failed to persist result for task {}: {}", task_id, e);
        }
        if let Some(snapshot) = completed {
            self.write_through(&snapshot, false);
        }
        if let Some(snapshot) = errored {
            self.write_through(&snapshot, false);
        }

        outcome
    }

    /// Returns expired in-flight tasks to the ready queue. Runs periodically;
    /// also re-checks quiescence in case a terminal wedge was exposed.
    pub fn reap(&self) -> usize {
        let (reclaimed, errored) = {
            let mut state = self.state.lock().expect("scheduler mutex poisoned");
            let now = now_ms();

            let expired: Vec<i32> = state
                .inflight
                .iter()
                .filter(|(_, lease)| lease.lease_deadline < now)
                .map(|(&id, _)| id)
                .collect();

            let mut reclaimed = 0usize;
            for task_id in expired {
                let Some(lease) = state.inflight.remove(&task_id) else {
                    continue;
                };

                if let Some(task) = state.graph.task_mut(task_id) {
                    task.state = TaskState::Ready;
                    state.ready.push_back(task_id);
                    reclaimed += 1;
                    tracing::warn!(
                        "Lease expired for task {} (worker {}), re-enqueued",
                        task_id,
                        lease.worker
                    );
                }
            }

            let pending: Vec<String> = state
                .expressions
                .values()
                .filter(|expr| expr.status == ExpressionStatus::Pending)
                .map(|expr| expr.id.clone())
                .collect();

            let mut errored = Vec::new();
            for expression_id in pending {
                if let Some(snapshot) = self.transition_if_wedged(&mut state, &expression_id) {
                    errored.push(snapshot);
                }
            }

            (reclaimed, errored)
        };

        for snapshot in errored {
            self.write_through(&snapshot, false);
        }

        reclaimed
    }

    /// In-memory view of an expression. The HTTP read path prefers the
    /// Store; this backs the stats endpoint and tests.
    pub fn expression(&self, expression_id: &str) -> Option<Expression> {
        let state = self.state.lock().expect("scheduler mutex poisoned");
        state.expressions.get(expression_id).cloned()
    }

    pub fn stats(&self) -> SchedulerStats {
        let state = self.state.lock().expect("scheduler mutex poisoned");

        let mut stats = SchedulerStats {
            ready: state.ready.len(),
            inflight: state.inflight.len(),
            tasks: state.graph.task_count(),
            ..Default::default()
        };
        for expression in state.expressions.values() {
            match expression.status {
                ExpressionStatus::Pending => stats.expressions_pending += 1,
                ExpressionStatus::Completed => stats.expressions_completed += 1,
                ExpressionStatus::Error => stats.expressions_error += 1,
            }
        }

        stats
    }

    /// Retries durable writes that failed on the hot path.
    pub fn flush_pending_writes(&self) {
        let queued: Vec<Expression> = {
            let mut pending = self.pending_writes.lock().expect("flush mutex poisoned");
            pending.drain(..).collect()
        };

        if queued.is_empty() {
            return;
        }

        tracing::info!("Flushing {} deferred expression write(s)", queued.len());
        for snapshot in queued {
            self.write_through(&snapshot, false);
        }
    }

    fn complete_expression(
        &self,
        state: &mut SchedulerState,
        expression_id: &str,
    ) -> Option<Expression> {
        let (sink_id, value) = state.graph.final_value(expression_id)?;

        let snapshot = {
            let expression = state.expressions.get_mut(expression_id)?;
            if expression.status != ExpressionStatus::Pending {
                return None;
            }
            expression.status = ExpressionStatus::Completed;
            expression.result = Some(value);
            expression.clone()
        };

        state.graph.remove_expression(expression_id);

        tracing::info!(
            "Expression {} completed: task {} = {}",
            expression_id,
            sink_id,
            value
        );

        Some(snapshot)
    }

    /// Transitions a wedged expression to ERROR and purges its tasks.
    fn transition_if_wedged(
        &self,
        state: &mut SchedulerState,
        expression_id: &str,
    ) -> Option<Expression> {
        if !state.graph.is_wedged(expression_id) {
            return None;
        }

        let snapshot = {
            let expression = state.expressions.get_mut(expression_id)?;
            if expression.status != ExpressionStatus::Pending {
                return None;
            }
            expression.status = ExpressionStatus::Error;
            expression.clone()
        };

        state.graph.remove_expression(expression_id);

        tracing::warn!(
            "Expression {} can no longer progress, marked as error",
            expression_id
        );

        Some(snapshot)
    }

    /// Persists an expression snapshot outside the lock, queueing it for the
    /// flush loop when the Store is unavailable.
    fn write_through(&self, snapshot: &Expression, create: bool) {
        let written = if create {
            self.store.create_expression(snapshot)
        } else {
            match self.store.update_expression_status(
                &snapshot.id,
                snapshot.status,
                snapshot.result,
            ) {
                // The PENDING row itself may have failed to land earlier.
                Err(StoreError::NotFound) => self.store.create_expression(snapshot),
                other => other,
            }
        };

        if let Err(e) = written {
            tracing::error!(
                "Failed to persist expression {} ({:?}): {}; deferring",
                snapshot.id,
                snapshot.status,
                e
            );
            self.pending_writes
                .lock()
                .expect("flush mutex poisoned")
                .push(snapshot.clone());
        }
    }
}
