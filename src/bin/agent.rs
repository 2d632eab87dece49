use distributed_calculator::config::AgentConfig;
use distributed_calculator::worker::WorkerPool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AgentConfig::from_env();
    tracing::info!(
        "Starting agent: {} worker(s) against {}",
        config.worker_count,
        config.scheduler_addr
    );

    let pool = WorkerPool::new(&config.scheduler_addr, config.worker_count);
    pool.start().await;

    tracing::info!("Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    Ok(())
}
