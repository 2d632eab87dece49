use crate::scheduler::types::{Op, Task};
use serde::{Deserialize, Serialize};

// Endpoints
pub const ENDPOINT_PULL_TASK: &str = "/internal/task/pull";
pub const ENDPOINT_PUSH_RESULT: &str = "/internal/task/result";

/// Worker-side identification sent with each pull. Purely a scheduling hint;
/// workers own no state across requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct PullTaskRequest {
    pub worker: String,
}

/// A task as shipped to a worker. All fields are always present; the empty
/// envelope (nothing to do) is distinguished by `id == 0 && op == ""`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskEnvelope {
    pub id: i32,
    pub arg1: String,
    pub arg2: String,
    pub op: String,
    pub op_time: i64,
    pub expr_id: String,
}

impl TaskEnvelope {
    pub fn empty() -> Self {
        Self {
            id: 0,
            arg1: String::new(),
            arg2: String::new(),
            op: String::new(),
            op_time: 0,
            expr_id: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id == 0 && self.op.is_empty()
    }

    pub fn operation(&self) -> Option<Op> {
        Op::from_str(&self.op)
    }
}

impl From<Task> for TaskEnvelope {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            arg1: task.arg1,
            arg2: task.arg2,
            op: task.op.as_str().to_string(),
            op_time: task.operation_time as i64,
            expr_id: task.expression_id,
        }
    }
}

/// A computed value pushed back by a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub id: i32,
    pub result: f64,
    pub expr_id: String,
}

/// Acknowledgement for a pushed result.
#[derive(Debug, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
    pub message: String,
}

impl Ack {
    pub fn accepted() -> Self {
        Self {
            ok: true,
            message: "result recorded".to_string(),
        }
    }

    pub fn refused(message: &str) -> Self {
        Self {
            ok: false,
            message: message.to_string(),
        }
    }
}
