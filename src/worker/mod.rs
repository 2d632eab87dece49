//! Compute Agent Module
//!
//! The worker side of the cluster: stateless loops that pull ready tasks from
//! the orchestrator, simulate the declared per-operation latency, compute the
//! two-operand result and push it back.
//!
//! ## Failure discipline
//! - Pull transport errors back off exponentially (capped at 5 s) and retry
//!   forever; an idle queue grows a gentler backoff that resets on work.
//! - Push transport errors retry a bounded number of times, then the result
//!   is dropped: the orchestrator's lease reaper re-dispatches the task, so a
//!   lost acknowledgement costs latency, never correctness.
//! - A task the worker cannot evaluate (unparseable argument, zero divisor)
//!   is abandoned with a reject push instead of crashing the loop.

pub mod client;
pub mod pool;


pub use client::OrchestratorClient;
pub use pool::WorkerPool;

/// Faults a worker can hit while evaluating a leased task.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ComputeError {
    #[error("argument is not a decimal literal: {0}")]
    BadArgument(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("unknown operation: {0:?}")]
    UnknownOperation(String),
}
