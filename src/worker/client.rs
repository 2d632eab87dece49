use crate::scheduler::protocol::{
    Ack, PullTaskRequest, TaskEnvelope, TaskResult, ENDPOINT_PULL_TASK, ENDPOINT_PUSH_RESULT,
};

use anyhow::Result;
use std::time::Duration;

/// Per-RPC client deadline. On expiry the caller treats the request as a
/// transport error.
const REQUEST_DEADLINE: Duration = Duration::from_secs(10);

/// HTTP client for the orchestrator's dispatch surface.
pub struct OrchestratorClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OrchestratorClient {
    pub fn new(scheduler_addr: &str) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: format!("http://{}", scheduler_addr),
        }
    }

    /// Asks the orchestrator for a task. A single attempt; the worker loop
    /// owns the retry cadence for pulls.
    pub async fn pull_task(&self, worker: &str) -> Result<TaskEnvelope> {
        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, ENDPOINT_PULL_TASK))
            .json(&PullTaskRequest {
                worker: worker.to_string(),
            })
            .timeout(REQUEST_DEADLINE)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("pull failed: {}", response.status()));
        }

        Ok(response.json().await?)
    }

    /// Pushes a result, retrying transport faults with exponential backoff
    /// and jitter. A non-2xx status counts as delivered-and-refused, not as a
    /// transport fault, and is returned without further retries.
    pub async fn push_result(&self, result: &TaskResult, attempts: usize) -> Result<Ack> {
        let url = format!("{}{}", self.base_url, ENDPOINT_PUSH_RESULT);
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .post(url.clone())
                .json(result)
                .timeout(REQUEST_DEADLINE)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    if !resp.status().is_success() {
                        return Err(anyhow::anyhow!("push refused: {}", resp.status()));
                    }
                    return Ok(resp.json().await?);
                }
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(anyhow::anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }
}
