//! Store Tests
//!
//! Exercises the in-memory engine against the contract the scheduler relies
//! on: idempotent result recording, owner-scoped reads, login uniqueness.

#[cfg(test)]
mod tests {
    use crate::scheduler::types::{now_ms, Expression, ExpressionStatus};
    use crate::store::{MemoryStore, Store, StoreError};

    fn expression(id: &str, owner_id: i64) -> Expression {
        Expression {
            id: id.to_string(),
            owner_id,
            status: ExpressionStatus::Pending,
            result: None,
            created_at: now_ms(),
        }
    }

    #[test]
    fn test_expression_roundtrip_and_status_update() {
        // ARRANGE
        let store = MemoryStore::new();
        store.create_expression(&expression("expr-1", 7)).unwrap();

        // ACT
        store
            .update_expression_status("expr-1", ExpressionStatus::Completed, Some(42.0))
            .unwrap();

        // ASSERT
        let row = store.get_expression("expr-1", 7).unwrap();
        assert_eq!(row.status, ExpressionStatus::Completed);
        assert_eq!(row.result, Some(42.0));
    }

    #[test]
    fn test_update_missing_expression_is_not_found() {
        let store = MemoryStore::new();

        let err = store
            .update_expression_status("nope", ExpressionStatus::Error, None)
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn test_reads_are_owner_scoped() {
        let store = MemoryStore::new();
        store.create_expression(&expression("expr-1", 7)).unwrap();

        // Another owner cannot see the row at all
        assert!(matches!(
            store.get_expression("expr-1", 8),
            Err(StoreError::NotFound)
        ));
        assert!(store.list_expressions(8).unwrap().is_empty());
        assert_eq!(store.list_expressions(7).unwrap().len(), 1);
    }

    #[test]
    fn test_record_result_is_idempotent_on_value() {
        let store = MemoryStore::new();

        store.record_result(1, 4.0, "expr-1").unwrap();
        // Same value again: fine
        store.record_result(1, 4.0, "expr-1").unwrap();
        assert_eq!(store.result_count(), 1);

        // Different value: refused
        let err = store.record_result(1, 5.0, "expr-1").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_user_creation_rejects_duplicate_login() {
        let store = MemoryStore::new();

        let id = store.create_user("alice", "digest-a").unwrap();
        assert!(id > 0);
        assert!(store.user_exists("alice").unwrap());

        let err = store.create_user("alice", "digest-b").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // The original digest is untouched
        let user = store.get_user_by_login("alice").unwrap();
        assert_eq!(user.password_digest, "digest-a");
    }
}
