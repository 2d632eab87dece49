//! Scheduler Tests
//!
//! Drives the scheduler through the same pull/push cycle the workers use,
//! without the HTTP layer in between.

#[cfg(test)]
mod tests {
    use crate::config::OperationTimes;
    use crate::parser::parse;
    use crate::scheduler::scheduler::{Scheduler, SubmitOutcome};
    use crate::scheduler::types::{ExpressionStatus, Op, Task};
    use crate::store::{MemoryStore, Store};
    use std::sync::Arc;

    const LEASE_MS: u64 = 30_000;
    const OWNER: i64 = 1;

    fn scheduler() -> (Arc<Scheduler>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Scheduler::new(store.clone(), LEASE_MS), store)
    }

    fn submit(scheduler: &Scheduler, text: &str) -> String {
        let specs = parse(text, &OperationTimes::default()).unwrap();
        scheduler.submit(OWNER, specs)
    }

    fn compute(task: &Task) -> f64 {
        let a: f64 = task.arg1.parse().expect("leased arg1 is a literal");
        let b: f64 = task.arg2.parse().expect("leased arg2 is a literal");
        match task.op {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
            Op::Div => a / b,
        }
    }

    /// Runs a single worker to quiescence: pull, compute, push, repeat.
    fn pump(scheduler: &Scheduler) {
        while let Some(task) = scheduler.acquire_task("pump") {
            let value = compute(&task);
            let outcome = scheduler.submit_result(task.id, value, &task.expression_id);
            assert_eq!(outcome, SubmitOutcome::Accepted);
        }
    }

    // ============================================================
    // TEST 1: Single-task expression (S1)
    // ============================================================

    #[test]
    fn test_single_addition_completes() {
        // ARRANGE
        let (scheduler, store) = scheduler();
        let expr_id = submit(&scheduler, "2+2");

        // ACT: one worker round
        pump(&scheduler);

        // ASSERT
        let expression = scheduler.expression(&expr_id).unwrap();
        assert_eq!(expression.status, ExpressionStatus::Completed);
        assert_eq!(expression.result, Some(4.0));

        // Write-through reached the store
        let row = store.get_expression(&expr_id, OWNER).unwrap();
        assert_eq!(row.status, ExpressionStatus::Completed);
        assert_eq!(row.result, Some(4.0));
    }

    // ============================================================
    // TEST 2: Data dependencies gate dispatch (S2, S3)
    // ============================================================

    #[test]
    fn test_dependent_task_waits_for_upstream() {
        // "2 + 2 * 2": the product is the only leaf
        let (scheduler, _) = scheduler();
        let expr_id = submit(&scheduler, "2 + 2 * 2");

        // ACT: first pull must be the multiplication
        let first = scheduler.acquire_task("w1").unwrap();
        assert_eq!(first.op, Op::Mul);

        // The addition still waits on result1
        assert!(scheduler.acquire_task("w2").is_none());

        scheduler.submit_result(first.id, compute(&first), &first.expression_id);

        // ASSERT: the addition is now ready with the substituted literal
        let second = scheduler.acquire_task("w1").unwrap();
        assert_eq!(second.op, Op::Add);
        assert_eq!(second.arg2, "4");

        scheduler.submit_result(second.id, compute(&second), &second.expression_id);

        let expression = scheduler.expression(&expr_id).unwrap();
        assert_eq!(expression.status, ExpressionStatus::Completed);
        assert_eq!(expression.result, Some(6.0));
    }

    #[test]
    fn test_parenthesized_expression_result() {
        let (scheduler, _) = scheduler();
        let expr_id = submit(&scheduler, "(2+3)*4");

        pump(&scheduler);

        let expression = scheduler.expression(&expr_id).unwrap();
        assert_eq!(expression.result, Some(20.0));
    }

    #[test]
    fn test_mixed_expression_result() {
        let (scheduler, _) = scheduler();
        let expr_id = submit(&scheduler, "2*(3+4)-5/5");

        pump(&scheduler);

        let expression = scheduler.expression(&expr_id).unwrap();
        assert_eq!(expression.status, ExpressionStatus::Completed);
        assert_eq!(expression.result, Some(13.0));
    }

    // ============================================================
    // TEST 3: Division by zero wedges the expression (S4)
    // ============================================================

    #[test]
    fn test_division_by_zero_errors_at_submit() {
        let (scheduler, store) = scheduler();
        let expr_id = submit(&scheduler, "10/0");

        // Never becomes ready, so the expression errors without a worker round
        assert!(scheduler.acquire_task("w1").is_none());
        let expression = scheduler.expression(&expr_id).unwrap();
        assert_eq!(expression.status, ExpressionStatus::Error);
        assert_eq!(expression.result, None);

        let row = store.get_expression(&expr_id, OWNER).unwrap();
        assert_eq!(row.status, ExpressionStatus::Error);
    }

    #[test]
    fn test_resolved_zero_divisor_errors_after_quiescence() {
        // "1/(2-2)": the subtraction computes fine, then the division's
        // divisor resolves to 0 and the expression drains to error.
        let (scheduler, _) = scheduler();
        let expr_id = submit(&scheduler, "1/(2-2)");

        pump(&scheduler);

        let expression = scheduler.expression(&expr_id).unwrap();
        assert_eq!(expression.status, ExpressionStatus::Error);
    }

    // ============================================================
    // TEST 4: Serialization by dependency with two workers (S6)
    // ============================================================

    #[test]
    fn test_sequential_chain_admits_one_inflight_task() {
        let (scheduler, _) = scheduler();
        let expr_id = submit(&scheduler, "1+2+3+4");

        let mut rounds = 0;
        loop {
            let Some(task) = scheduler.acquire_task("w1") else {
                break;
            };
            // The second worker always comes up empty: every remaining task
            // depends on the one in flight.
            assert!(scheduler.acquire_task("w2").is_none());
            assert_eq!(scheduler.stats().inflight, 1);

            scheduler.submit_result(task.id, compute(&task), &task.expression_id);
            rounds += 1;
        }

        assert_eq!(rounds, 3);
        let expression = scheduler.expression(&expr_id).unwrap();
        assert_eq!(expression.result, Some(10.0));
    }

    // ============================================================
    // TEST 5: Idempotent replay and conflicts (P3, P5)
    // ============================================================

    #[test]
    fn test_identical_replay_is_idempotent() {
        let (scheduler, _) = scheduler();
        let expr_id = submit(&scheduler, "2+2");

        let task = scheduler.acquire_task("w1").unwrap();
        let first = scheduler.submit_result(task.id, 4.0, &task.expression_id);
        // A transport retry delivers the same result again after completion
        let replay = scheduler.submit_result(task.id, 4.0, &task.expression_id);

        assert_eq!(first, SubmitOutcome::Accepted);
        assert_eq!(replay, SubmitOutcome::Accepted);

        let expression = scheduler.expression(&expr_id).unwrap();
        assert_eq!(expression.status, ExpressionStatus::Completed);
        assert_eq!(expression.result, Some(4.0));
    }

    #[test]
    fn test_conflicting_replay_is_refused() {
        let (scheduler, _) = scheduler();
        let expr_id = submit(&scheduler, "2+2");

        let task = scheduler.acquire_task("w1").unwrap();
        scheduler.submit_result(task.id, 4.0, &task.expression_id);

        let conflict = scheduler.submit_result(task.id, 5.0, &task.expression_id);

        assert_eq!(conflict, SubmitOutcome::Conflict);
        // The recorded value stands
        let expression = scheduler.expression(&expr_id).unwrap();
        assert_eq!(expression.result, Some(4.0));
    }

    #[test]
    fn test_duplicate_inflight_delivery_records_once() {
        // Two workers racing the same task id (duplicated dispatch after a
        // reap) must produce exactly one effective execution.
        let (scheduler, store) = scheduler();
        submit(&scheduler, "3*3");

        let task = scheduler.acquire_task("w1").unwrap();
        assert_eq!(
            scheduler.submit_result(task.id, 9.0, &task.expression_id),
            SubmitOutcome::Accepted
        );
        assert_eq!(
            scheduler.submit_result(task.id, 9.0, &task.expression_id),
            SubmitOutcome::Accepted
        );

        assert_eq!(store.result_count(), 1);
    }

    // ============================================================
    // TEST 6: Lease expiry recovery (P4)
    // ============================================================

    #[test]
    fn test_expired_lease_is_reaped_and_redispatched() {
        // ARRANGE: lease of zero expires immediately
        let store = Arc::new(MemoryStore::new());
        let scheduler = Scheduler::new(store, 0);
        let specs = parse("6*7", &OperationTimes::default()).unwrap();
        let expr_id = scheduler.submit(OWNER, specs);

        // ACT: a worker takes the task and dies
        let lost = scheduler.acquire_task("doomed").unwrap();
        assert!(scheduler.acquire_task("other").is_none());

        // Let the zero-length lease pass its deadline
        std::thread::sleep(std::time::Duration::from_millis(5));
        let reclaimed = scheduler.reap();
        assert_eq!(reclaimed, 1);

        // ASSERT: the task is dispatchable again and completes normally
        let retried = scheduler.acquire_task("survivor").unwrap();
        assert_eq!(retried.id, lost.id);
        scheduler.submit_result(retried.id, 42.0, &retried.expression_id);

        let expression = scheduler.expression(&expr_id).unwrap();
        assert_eq!(expression.status, ExpressionStatus::Completed);
        assert_eq!(expression.result, Some(42.0));
    }

    #[test]
    fn test_late_result_after_reap_still_wins() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = Scheduler::new(store, 0);
        let specs = parse("6*7", &OperationTimes::default()).unwrap();
        scheduler.submit(OWNER, specs);

        let task = scheduler.acquire_task("slow").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        scheduler.reap();

        // The original worker's result arrives while the task sits re-queued
        assert_eq!(
            scheduler.submit_result(task.id, 42.0, &task.expression_id),
            SubmitOutcome::Accepted
        );
        // Nothing is left to dispatch
        assert!(scheduler.acquire_task("other").is_none());
    }

    // ============================================================
    // TEST 7: Malformed submissions
    // ============================================================

    #[test]
    fn test_non_finite_result_is_refused_and_lease_kept() {
        let (scheduler, _) = scheduler();
        submit(&scheduler, "2+2");

        let task = scheduler.acquire_task("w1").unwrap();
        let outcome = scheduler.submit_result(task.id, f64::NAN, &task.expression_id);

        assert!(matches!(outcome, SubmitOutcome::Malformed(_)));
        // Still leased: not dispatchable until the reaper acts
        assert_eq!(scheduler.stats().inflight, 1);
        assert!(scheduler.acquire_task("w2").is_none());
    }

    #[test]
    fn test_unknown_task_is_refused() {
        let (scheduler, _) = scheduler();
        submit(&scheduler, "2+2");

        assert_eq!(
            scheduler.submit_result(999, 1.0, "whatever"),
            SubmitOutcome::UnknownTask
        );
    }

    #[test]
    fn test_expression_mismatch_is_refused() {
        let (scheduler, _) = scheduler();
        submit(&scheduler, "2+2");

        let task = scheduler.acquire_task("w1").unwrap();
        let outcome = scheduler.submit_result(task.id, 4.0, "some-other-expression");

        assert!(matches!(outcome, SubmitOutcome::Malformed(_)));
    }

    // ============================================================
    // TEST 8: Queue ordering and multiple expressions
    // ============================================================

    #[test]
    fn test_ready_queue_is_fifo_across_expressions() {
        let (scheduler, _) = scheduler();
        let first = submit(&scheduler, "1+1");
        let second = submit(&scheduler, "2+2");

        let a = scheduler.acquire_task("w1").unwrap();
        let b = scheduler.acquire_task("w1").unwrap();

        // Leaves of the earlier expression precede the later one's
        assert_eq!(a.expression_id, first);
        assert_eq!(b.expression_id, second);
        // Global task ids are monotonically increasing across expressions
        assert!(a.id < b.id);
    }

    #[test]
    fn test_interleaved_expressions_complete_independently() {
        let (scheduler, _) = scheduler();
        let left = submit(&scheduler, "2+3*4");
        let right = submit(&scheduler, "10-7");

        pump(&scheduler);

        assert_eq!(
            scheduler.expression(&left).unwrap().result,
            Some(14.0)
        );
        assert_eq!(
            scheduler.expression(&right).unwrap().result,
            Some(3.0)
        );
    }
}
