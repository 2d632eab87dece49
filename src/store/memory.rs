use super::{Store, StoreError, UserRecord};
use crate::scheduler::types::{Expression, ExpressionStatus};

use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// In-memory store. Concurrent maps per table; adequate for a single-process
/// deployment and for tests. Rows live as long as the process.
pub struct MemoryStore {
    expressions: DashMap<String, Expression>,
    results: DashMap<i32, StoredResult>,
    users: DashMap<String, UserRecord>,
    user_counter: AtomicI64,
}

#[derive(Debug, Clone)]
struct StoredResult {
    value: f64,
    expression_id: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            expressions: DashMap::new(),
            results: DashMap::new(),
            users: DashMap::new(),
            user_counter: AtomicI64::new(0),
        }
    }

    pub fn expression_count(&self) -> usize {
        self.expressions.len()
    }

    pub fn result_count(&self) -> usize {
        self.results.len()
    }
}

impl Store for MemoryStore {
    fn create_expression(&self, expression: &Expression) -> Result<(), StoreError> {
        self.expressions
            .insert(expression.id.clone(), expression.clone());
        Ok(())
    }

    fn update_expression_status(
        &self,
        id: &str,
        status: ExpressionStatus,
        result: Option<f64>,
    ) -> Result<(), StoreError> {
        let mut row = self.expressions.get_mut(id).ok_or(StoreError::NotFound)?;
        row.status = status;
        row.result = result;
        Ok(())
    }

    fn record_result(
        &self,
        task_id: i32,
        result: f64,
        expression_id: &str,
    ) -> Result<(), StoreError> {
        if let Some(existing) = self.results.get(&task_id) {
            if existing.value == result {
                return Ok(());
            }
            return Err(StoreError::Conflict(format!(
                "task {} already recorded as {}",
                task_id, existing.value
            )));
        }

        self.results.insert(
            task_id,
            StoredResult {
                value: result,
                expression_id: expression_id.to_string(),
            },
        );
        Ok(())
    }

    fn get_expression(&self, id: &str, owner_id: i64) -> Result<Expression, StoreError> {
        let row = self.expressions.get(id).ok_or(StoreError::NotFound)?;
        if row.owner_id != owner_id {
            // Another user's expression is indistinguishable from a missing one
            return Err(StoreError::NotFound);
        }
        Ok(row.clone())
    }

    fn list_expressions(&self, owner_id: i64) -> Result<Vec<Expression>, StoreError> {
        let mut rows: Vec<Expression> = self
            .expressions
            .iter()
            .filter(|entry| entry.value().owner_id == owner_id)
            .map(|entry| entry.value().clone())
            .collect();

        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    fn create_user(&self, login: &str, password_digest: &str) -> Result<i64, StoreError> {
        match self.users.entry(login.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "login {} already taken",
                login
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let id = self.user_counter.fetch_add(1, Ordering::SeqCst) + 1;
                slot.insert(UserRecord {
                    id,
                    login: login.to_string(),
                    password_digest: password_digest.to_string(),
                });

                tracing::info!("Created user {} (id {})", login, id);
                Ok(id)
            }
        }
    }

    fn get_user_by_login(&self, login: &str) -> Result<UserRecord, StoreError> {
        self.users
            .get(login)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    fn user_exists(&self, login: &str) -> Result<bool, StoreError> {
        Ok(self.users.contains_key(login))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
