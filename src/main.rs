use axum::http::StatusCode;
use axum::{
    Extension, Json, Router,
    routing::{get, post},
};
use distributed_calculator::api::handlers::{
    handle_get_expression, handle_list_expressions, handle_login, handle_register,
    handle_submit_expression,
};
use distributed_calculator::auth::AuthContext;
use distributed_calculator::config::OrchestratorConfig;
use distributed_calculator::scheduler::handlers::{handle_pull_task, handle_push_result};
use distributed_calculator::scheduler::protocol::{ENDPOINT_PULL_TASK, ENDPOINT_PUSH_RESULT};
use distributed_calculator::scheduler::scheduler::Scheduler;
use distributed_calculator::store::{MemoryStore, Store};
use serde::Serialize;
use std::sync::Arc;
use sysinfo::System;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = OrchestratorConfig::from_env()?;
    tracing::info!("Starting orchestrator on {}", config.bind_addr);

    // 1. Durable store and scheduler:
    let store = Arc::new(MemoryStore::new());
    let scheduler = Scheduler::new(store.clone(), config.lease_ttl_ms);
    scheduler.clone().start();

    let auth = Arc::new(AuthContext::new(&config.jwt_secret));

    // 2. HTTP router (client API + worker RPC on one listener):
    let app = Router::new()
        .route("/health/stats", get(handle_stats))
        // Client API
        .route(
            "/expressions",
            post(handle_submit_expression).get(handle_list_expressions),
        )
        .route("/expressions/:id", get(handle_get_expression))
        .route("/register", post(handle_register))
        .route("/login", post(handle_login))
        // Worker RPC
        .route(ENDPOINT_PULL_TASK, post(handle_pull_task))
        .route(ENDPOINT_PUSH_RESULT, post(handle_push_result))
        .layer(Extension(scheduler.clone()))
        .layer(Extension(store.clone() as Arc<dyn Store>))
        .layer(Extension(store.clone()))
        .layer(Extension(auth))
        .layer(Extension(config.operation_times));

    // 3. Serve until shutdown:
    tracing::info!("HTTP server listening on {}", config.bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct NodeStatsResponse {
    ready_tasks: usize,
    inflight_tasks: usize,
    tracked_tasks: usize,
    expressions_pending: usize,
    expressions_completed: usize,
    expressions_error: usize,
    stored_expressions: usize,
    stored_results: usize,
    cpu_usage: f32,
    mem_used_mb: u64,
    mem_total_mb: u64,
}

async fn handle_stats(
    Extension(scheduler): Extension<Arc<Scheduler>>,
    Extension(store): Extension<Arc<MemoryStore>>,
) -> (StatusCode, Json<NodeStatsResponse>) {
    let stats = scheduler.stats();

    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpu_usage = sys.global_cpu_info().cpu_usage();
    // sysinfo returns bytes for memory values.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    (
        StatusCode::OK,
        Json(NodeStatsResponse {
            ready_tasks: stats.ready,
            inflight_tasks: stats.inflight,
            tracked_tasks: stats.tasks,
            expressions_pending: stats.expressions_pending,
            expressions_completed: stats.expressions_completed,
            expressions_error: stats.expressions_error,
            stored_expressions: store.expression_count(),
            stored_results: store.result_count(),
            cpu_usage,
            mem_used_mb,
            mem_total_mb,
        }),
    )
}
