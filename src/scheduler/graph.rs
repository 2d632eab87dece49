//! Task Dependency Graph
//!
//! Arena of tasks keyed by integer id, with an adjacency map from each task
//! to the tasks consuming its `result<k>` reference. The graph resolves
//! symbolic arguments to literal decimals as upstream results arrive and
//! reports readiness transitions to the scheduler.
//!
//! All mutation happens under the scheduler mutex; the graph itself carries
//! no synchronization.

use crate::parser::TaskSpec;
use crate::scheduler::types::{result_ref, result_ref_for, Op, Task, TaskState};
use std::collections::HashMap;

pub struct TaskGraph {
    /// Tasks of all PENDING expressions, including Done ones until their
    /// expression reaches a terminal status.
    tasks: HashMap<i32, Task>,
    /// Tasks per expression, in registration (ascending id) order.
    expression_tasks: HashMap<String, Vec<i32>>,
    /// Recorded results. Retained for the process lifetime so duplicate
    /// submissions observe the same answer even after their expression
    /// finished.
    results: HashMap<i32, f64>,
    /// Consumers of each task's result, installed at registration.
    dependents: HashMap<i32, Vec<i32>>,
    task_counter: i32,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            expression_tasks: HashMap::new(),
            results: HashMap::new(),
            dependents: HashMap::new(),
            task_counter: 0,
        }
    }

    /// Installs an expression's task list, assigning globally unique
    /// monotonically increasing ids.
    ///
    /// Parser output references tasks by their 1-based position in the list;
    /// those references are rewritten to the assigned global ids here so that
    /// `result<k>` always satisfies `k < consumer.id`, process-wide. Returns
    /// the ids of tasks that are immediately ready.
    pub fn register(&mut self, expression_id: &str, specs: Vec<TaskSpec>) -> Vec<i32> {
        let base = self.task_counter + 1;
        self.task_counter += specs.len() as i32;

        let remap = |arg: String| -> String {
            match result_ref(&arg) {
                Some(local) => result_ref_for(base + local - 1),
                None => arg,
            }
        };

        let mut ids = Vec::with_capacity(specs.len());
        let mut ready = Vec::new();

        for (index, spec) in specs.into_iter().enumerate() {
            let id = base + index as i32;
            let mut task = Task {
                id,
                arg1: remap(spec.arg1),
                arg2: remap(spec.arg2),
                op: spec.op,
                operation_time: spec.operation_time,
                expression_id: expression_id.to_string(),
                state: TaskState::Waiting,
            };

            for arg in [&task.arg1, &task.arg2] {
                if let Some(upstream) = result_ref(arg) {
                    self.dependents.entry(upstream).or_default().push(id);
                }
            }

            if is_ready(&task) {
                task.state = TaskState::Ready;
                ready.push(id);
            }

            ids.push(id);
            self.tasks.insert(id, task);
        }

        self.expression_tasks
            .insert(expression_id.to_string(), ids);

        ready
    }

    /// Records a task's result and substitutes it into every dependent,
    /// returning dependents that became ready.
    ///
    /// The substituted form is the shortest decimal that round-trips the
    /// value, so downstream tasks and the wire see a canonical literal.
    pub fn resolve(&mut self, task_id: i32, value: f64) -> Vec<i32> {
        self.results.insert(task_id, value);
        if let Some(task) = self.tasks.get_mut(&task_id) {
            task.state = TaskState::Done;
        }

        let reference = result_ref_for(task_id);
        let literal = value.to_string();
        let mut newly_ready = Vec::new();

        for dependent_id in self.dependents.get(&task_id).cloned().unwrap_or_default() {
            let Some(dependent) = self.tasks.get_mut(&dependent_id) else {
                continue;
            };

            if dependent.arg1 == reference {
                dependent.arg1 = literal.clone();
            }
            if dependent.arg2 == reference {
                dependent.arg2 = literal.clone();
            }

            if dependent.state == TaskState::Waiting && is_ready(dependent) {
                dependent.state = TaskState::Ready;
                newly_ready.push(dependent_id);
            }
        }

        newly_ready
    }

    /// Final value of a drained expression: the result of its sink, the task
    /// no other task consumes. Falls back to the largest id holding a result
    /// if the dependents index names no sink.
    pub fn final_value(&self, expression_id: &str) -> Option<(i32, f64)> {
        let ids = self.expression_tasks.get(expression_id)?;

        let sink = ids
            .iter()
            .copied()
            .filter(|id| self.dependents.get(id).map_or(true, |d| d.is_empty()))
            .filter(|id| self.results.contains_key(id))
            .max();

        let chosen = sink.or_else(|| {
            ids.iter()
                .copied()
                .filter(|id| self.results.contains_key(id))
                .max()
        })?;

        self.results.get(&chosen).map(|&value| (chosen, value))
    }

    /// Number of tasks of the expression not yet Done.
    pub fn remaining_tasks(&self, expression_id: &str) -> usize {
        self.expression_tasks
            .get(expression_id)
            .map(|ids| {
                ids.iter()
                    .filter(|id| {
                        self.tasks
                            .get(*id)
                            .map_or(false, |task| task.state != TaskState::Done)
                    })
                    .count()
            })
            .unwrap_or(0)
    }

    /// True when nothing of this expression can ever run again: tasks remain
    /// but none is ready or in flight, so no result will arrive to unblock
    /// the waiters.
    pub fn is_wedged(&self, expression_id: &str) -> bool {
        let Some(ids) = self.expression_tasks.get(expression_id) else {
            return false;
        };

        let mut remaining = 0usize;
        for id in ids {
            match self.tasks.get(id).map(|task| task.state) {
                Some(TaskState::Ready) | Some(TaskState::InFlight) => return false,
                Some(TaskState::Waiting) => remaining += 1,
                _ => {}
            }
        }

        remaining > 0
    }

    pub fn task(&self, task_id: i32) -> Option<&Task> {
        self.tasks.get(&task_id)
    }

    pub fn task_mut(&mut self, task_id: i32) -> Option<&mut Task> {
        self.tasks.get_mut(&task_id)
    }

    pub fn result(&self, task_id: i32) -> Option<f64> {
        self.results.get(&task_id).copied()
    }

    /// Drops an expression's tasks and adjacency entries once it reaches a
    /// terminal status. Recorded results are kept for replay detection.
    pub fn remove_expression(&mut self, expression_id: &str) {
        if let Some(ids) = self.expression_tasks.remove(expression_id) {
            for id in ids {
                self.tasks.remove(&id);
                self.dependents.remove(&id);
            }
        }
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

/// A task is ready when both arguments are literal decimals and the task is
/// not a division by an exact zero. A zero divisor keeps the task permanently
/// unready; the scheduler's quiescence check turns that into an expression
/// error.
pub fn is_ready(task: &Task) -> bool {
    if task.arg1.parse::<f64>().is_err() {
        return false;
    }
    let Ok(arg2) = task.arg2.parse::<f64>() else {
        return false;
    };

    !(task.op == Op::Div && arg2 == 0.0)
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}
