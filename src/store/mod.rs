//! Persistence Contract
//!
//! The scheduler's authoritative state lives in memory while an expression is
//! pending; the Store records expressions, per-task results and final values
//! so completed work and ownership survive restarts and so the read API has
//! something to serve. The scheduler calls it outside its own lock and treats
//! every call as an independent transaction.

pub mod memory;

#[cfg(test)]
mod tests;

pub use memory::MemoryStore;

use crate::scheduler::types::{Expression, ExpressionStatus};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("conflicting write: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A registered user. The digest is a salted hash; the plaintext password
/// never reaches the store.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub login: String,
    pub password_digest: String,
}

/// Durable record of expressions, results and users.
///
/// `record_result` is idempotent on task id: re-recording the same value is a
/// no-op, a different value is a conflict. Implementations provide their own
/// internal concurrency control.
pub trait Store: Send + Sync {
    fn create_expression(&self, expression: &Expression) -> Result<(), StoreError>;

    fn update_expression_status(
        &self,
        id: &str,
        status: ExpressionStatus,
        result: Option<f64>,
    ) -> Result<(), StoreError>;

    fn record_result(
        &self,
        task_id: i32,
        result: f64,
        expression_id: &str,
    ) -> Result<(), StoreError>;

    fn get_expression(&self, id: &str, owner_id: i64) -> Result<Expression, StoreError>;

    fn list_expressions(&self, owner_id: i64) -> Result<Vec<Expression>, StoreError>;

    fn create_user(&self, login: &str, password_digest: &str) -> Result<i64, StoreError>;

    fn get_user_by_login(&self, login: &str) -> Result<UserRecord, StoreError>;

    fn user_exists(&self, login: &str) -> Result<bool, StoreError>;
}
