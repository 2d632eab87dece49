use serde::{Deserialize, Serialize};

/// Arithmetic operation carried by a task. Serializes to its single-character
/// wire form (`"+"`, `"-"`, `"*"`, `"/"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Op {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
        }
    }

    pub fn from_str(token: &str) -> Option<Self> {
        match token {
            "+" => Some(Op::Add),
            "-" => Some(Op::Sub),
            "*" => Some(Op::Mul),
            "/" => Some(Op::Div),
            _ => None,
        }
    }
}

/// Lifecycle state of a task inside the scheduler.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskState {
    /// At least one argument is still an unresolved `result<k>` reference.
    Waiting,
    /// Both arguments are literals; the task sits in the ready queue.
    Ready,
    /// Handed to a worker; carries a lease deadline.
    InFlight,
    /// Result recorded. Terminal.
    Done,
}

/// A two-operand sub-problem extracted from an expression.
///
/// Arguments are carried as strings so a partially-resolved task can ship
/// over the wire without a sum type on the argument shape: each is either a
/// decimal literal or `result<k>` naming another task of the same expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i32,
    pub arg1: String,
    pub arg2: String,
    pub op: Op,
    /// Declarative latency in milliseconds the worker must simulate.
    pub operation_time: u64,
    pub expression_id: String,
    pub state: TaskState,
}

pub const RESULT_REF_PREFIX: &str = "result";

/// Parses a `result<k>` argument into the referenced task id.
pub fn result_ref(arg: &str) -> Option<i32> {
    arg.strip_prefix(RESULT_REF_PREFIX)
        .and_then(|rest| rest.parse::<i32>().ok())
}

/// Builds the textual `result<k>` form for a task id.
pub fn result_ref_for(task_id: i32) -> String {
    format!("{}{}", RESULT_REF_PREFIX, task_id)
}

/// Status of an expression as seen by clients. Transitions PENDING →
/// COMPLETED or PENDING → ERROR exactly once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionStatus {
    Pending,
    Completed,
    Error,
}

/// A user-submitted expression plus its scheduling-level identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expression {
    pub id: String,
    /// Owner principal; reads are scoped to it.
    pub owner_id: i64,
    pub status: ExpressionStatus,
    /// Defined only when `status == Completed`.
    pub result: Option<f64>,
    pub created_at: u64,
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}
