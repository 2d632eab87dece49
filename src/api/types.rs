use crate::scheduler::types::{Expression, ExpressionStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SubmitExpressionRequest {
    pub expression: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitExpressionResponse {
    pub id: String,
}

/// An expression as shown to its owner. `result` is present only for
/// completed expressions; status strings are `pending`/`completed`/`error`.
#[derive(Debug, Serialize)]
pub struct ExpressionView {
    pub id: String,
    pub status: ExpressionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
    pub created_at: u64,
}

impl From<Expression> for ExpressionView {
    fn from(expression: Expression) -> Self {
        Self {
            id: expression.id,
            status: expression.status,
            result: expression.result,
            created_at: expression.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExpressionResponse {
    pub expression: ExpressionView,
}

#[derive(Debug, Serialize)]
pub struct ExpressionListResponse {
    pub expressions: Vec<ExpressionView>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
