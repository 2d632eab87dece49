//! Environment Configuration
//!
//! Every tunable of the cluster is an environment variable with a default,
//! read once at process start and passed down by value. Nothing in the hot
//! path consults the environment.

use crate::scheduler::types::Op;

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

/// Simulated per-operation latency in milliseconds, stamped onto each task
/// at plan time and honored by the worker before computing.
#[derive(Debug, Clone, Copy)]
pub struct OperationTimes {
    pub addition_ms: u64,
    pub subtraction_ms: u64,
    pub multiplication_ms: u64,
    pub division_ms: u64,
}

impl OperationTimes {
    pub fn from_env() -> Self {
        Self {
            addition_ms: env_u64("TIME_ADDITION_MS", 100),
            subtraction_ms: env_u64("TIME_SUBTRACTION_MS", 100),
            multiplication_ms: env_u64("TIME_MULTIPLICATIONS_MS", 200),
            division_ms: env_u64("TIME_DIVISIONS_MS", 200),
        }
    }

    pub fn for_op(&self, op: Op) -> u64 {
        match op {
            Op::Add => self.addition_ms,
            Op::Sub => self.subtraction_ms,
            Op::Mul => self.multiplication_ms,
            Op::Div => self.division_ms,
        }
    }
}

impl Default for OperationTimes {
    fn default() -> Self {
        Self {
            addition_ms: 100,
            subtraction_ms: 100,
            multiplication_ms: 200,
            division_ms: 200,
        }
    }
}

/// Orchestrator process configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Address the HTTP server (client API + worker RPC) binds to.
    pub bind_addr: String,
    /// Lease granted to an in-flight task before the reaper may re-enqueue it.
    pub lease_ttl_ms: u64,
    pub operation_times: OperationTimes,
    /// HS256 signing key for session tokens. Required; no default.
    pub jwt_secret: String,
}

impl OrchestratorConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;

        Ok(Self {
            bind_addr: std::env::var("SCHED_ADDR").unwrap_or_else(|_| "localhost:50052".to_string()),
            lease_ttl_ms: env_u64("LEASE_TTL_MS", 30_000),
            operation_times: OperationTimes::from_env(),
            jwt_secret,
        })
    }
}

/// Agent process configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Number of independent worker loops to run in this process.
    pub worker_count: usize,
    /// Orchestrator endpoint (host:port) the workers pull from.
    pub scheduler_addr: String,
}

impl AgentConfig {
    pub fn from_env() -> Self {
        Self {
            worker_count: env_usize("WORKER_COUNT", 3),
            scheduler_addr: std::env::var("SCHED_ADDR")
                .unwrap_or_else(|_| "localhost:50052".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_times_defaults() {
        let times = OperationTimes::default();

        assert_eq!(times.for_op(Op::Add), 100);
        assert_eq!(times.for_op(Op::Sub), 100);
        assert_eq!(times.for_op(Op::Mul), 200);
        assert_eq!(times.for_op(Op::Div), 200);
    }
}
