use super::client::OrchestratorClient;
use super::ComputeError;
use crate::scheduler::protocol::{TaskEnvelope, TaskResult};
use crate::scheduler::types::Op;

use std::sync::Arc;
use std::time::Duration;

const IDLE_BACKOFF_START: Duration = Duration::from_secs(1);
const IDLE_BACKOFF_STEP: Duration = Duration::from_millis(100);
const IDLE_BACKOFF_CAP: Duration = Duration::from_secs(5);

const TRANSPORT_BACKOFF_START: Duration = Duration::from_millis(150);
const TRANSPORT_BACKOFF_CAP: Duration = Duration::from_secs(5);

const MAX_SUBMIT_ATTEMPTS: usize = 5;

/// A pool of N independent worker loops sharing one HTTP client.
pub struct WorkerPool {
    client: Arc<OrchestratorClient>,
    worker_count: usize,
}

impl WorkerPool {
    pub fn new(scheduler_addr: &str, worker_count: usize) -> Arc<Self> {
        Arc::new(Self {
            client: Arc::new(OrchestratorClient::new(scheduler_addr)),
            worker_count,
        })
    }

    pub async fn start(self: Arc<Self>) {
        tracing::info!("Starting {} compute worker(s)", self.worker_count);

        for worker_id in 0..self.worker_count {
            let pool = self.clone();
            tokio::spawn(async move {
                pool.worker_loop(worker_id).await;
            });
        }
    }

    /// The main loop for a single worker.
    ///
    /// 1. Pull a task (transport errors back off exponentially).
    /// 2. Sleep the idle ladder when the queue is empty.
    /// 3. Simulate the declared latency, compute, push the result.
    async fn worker_loop(&self, worker_id: usize) {
        let worker_name = format!("agent-{}-{}", uuid::Uuid::new_v4(), worker_id);
        tracing::info!("Worker {} started as {}", worker_id, worker_name);

        let mut idle_backoff = IDLE_BACKOFF_START;
        let mut transport_backoff = TRANSPORT_BACKOFF_START;

        loop {
            let envelope = match self.client.pull_task(&worker_name).await {
                Ok(envelope) => {
                    transport_backoff = TRANSPORT_BACKOFF_START;
                    envelope
                }
                Err(e) => {
                    tracing::warn!(
                        "Worker {}: pull failed ({}), retrying in {:?}",
                        worker_id,
                        e,
                        transport_backoff
                    );
                    tokio::time::sleep(transport_backoff).await;
                    transport_backoff = next_transport_backoff(transport_backoff);
                    continue;
                }
            };

            if envelope.is_empty() {
                tokio::time::sleep(idle_backoff).await;
                idle_backoff = next_idle_backoff(idle_backoff);
                continue;
            }
            idle_backoff = IDLE_BACKOFF_START;

            self.run_task(worker_id, envelope).await;
        }
    }

    async fn run_task(&self, worker_id: usize, envelope: TaskEnvelope) {
        tracing::info!(
            "Worker {} computing task {}: {} {} {} ({} ms)",
            worker_id,
            envelope.id,
            envelope.arg1,
            envelope.op,
            envelope.arg2,
            envelope.op_time
        );

        // The declared latency is part of the task contract
        tokio::time::sleep(Duration::from_millis(envelope.op_time.max(0) as u64)).await;

        let value = match compute(&envelope) {
            Ok(value) => value,
            Err(e) => {
                // Abandon with a reject push; the orchestrator refuses it and
                // the lease reaper decides what happens next.
                tracing::error!(
                    "Worker {}: cannot evaluate task {} ({}), posting reject",
                    worker_id,
                    envelope.id,
                    e
                );
                f64::NAN
            }
        };

        let result = TaskResult {
            id: envelope.id,
            result: value,
            expr_id: envelope.expr_id.clone(),
        };

        match self.client.push_result(&result, MAX_SUBMIT_ATTEMPTS).await {
            Ok(ack) if ack.ok => {
                tracing::debug!("Worker {}: task {} acknowledged", worker_id, envelope.id);
            }
            Ok(ack) => {
                tracing::warn!(
                    "Worker {}: result for task {} refused: {}",
                    worker_id,
                    envelope.id,
                    ack.message
                );
            }
            Err(e) => {
                // Drop the result; the lease reaper re-dispatches the task
                tracing::warn!(
                    "Worker {}: dropping result for task {} after retries: {}",
                    worker_id,
                    envelope.id,
                    e
                );
            }
        }
    }
}

/// Evaluates a leased task envelope. Both arguments must already be literal
/// decimals; the orchestrator only dispatches resolved tasks.
pub fn compute(envelope: &TaskEnvelope) -> Result<f64, ComputeError> {
    let op = envelope
        .operation()
        .ok_or_else(|| ComputeError::UnknownOperation(envelope.op.clone()))?;

    let a: f64 = envelope
        .arg1
        .parse()
        .map_err(|_| ComputeError::BadArgument(envelope.arg1.clone()))?;
    let b: f64 = envelope
        .arg2
        .parse()
        .map_err(|_| ComputeError::BadArgument(envelope.arg2.clone()))?;

    match op {
        Op::Add => Ok(a + b),
        Op::Sub => Ok(a - b),
        Op::Mul => Ok(a * b),
        Op::Div => {
            if b == 0.0 {
                return Err(ComputeError::DivisionByZero);
            }
            Ok(a / b)
        }
    }
}

pub fn next_idle_backoff(current: Duration) -> Duration {
    (current + IDLE_BACKOFF_STEP).min(IDLE_BACKOFF_CAP)
}

pub fn next_transport_backoff(current: Duration) -> Duration {
    (current * 2).min(TRANSPORT_BACKOFF_CAP)
}
