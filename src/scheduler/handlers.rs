//! Dispatch Surface Handlers
//!
//! Axum adapters between the worker RPC endpoints and the scheduler. These
//! stay thin: deserialize, delegate, map the outcome onto the wire `Ack`.

use super::protocol::{Ack, PullTaskRequest, TaskEnvelope, TaskResult};
use super::scheduler::{Scheduler, SubmitOutcome};

use axum::{Extension, Json};
use std::sync::Arc;

/// `PullTask`: hands the oldest ready task to the calling worker, or the
/// empty envelope when the queue is drained. Always 200; workers poll.
pub async fn handle_pull_task(
    Extension(scheduler): Extension<Arc<Scheduler>>,
    Json(req): Json<PullTaskRequest>,
) -> Json<TaskEnvelope> {
    match scheduler.acquire_task(&req.worker) {
        Some(task) => Json(TaskEnvelope::from(task)),
        None => Json(TaskEnvelope::empty()),
    }
}

/// `PushResult`: records a worker's result and acknowledges it.
pub async fn handle_push_result(
    Extension(scheduler): Extension<Arc<Scheduler>>,
    Json(result): Json<TaskResult>,
) -> Json<Ack> {
    let ack = match scheduler.submit_result(result.id, result.result, &result.expr_id) {
        SubmitOutcome::Accepted => Ack::accepted(),
        SubmitOutcome::Conflict => Ack::refused("conflicting result for task"),
        SubmitOutcome::UnknownTask => Ack::refused("unknown task"),
        SubmitOutcome::Malformed(reason) => Ack::refused(reason),
    };

    Json(ack)
}
