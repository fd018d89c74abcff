use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

/// Answers whether the controller is reachable again after telemetry loss.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn is_alive(&self) -> bool;
}

/// Fetches the controller's landing page; any non-empty success counts.
pub struct HttpLivenessProbe {
    http: Client,
    url: String,
}

impl HttpLivenessProbe {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl LivenessProbe for HttpLivenessProbe {
    async fn is_alive(&self) -> bool {
        let response = match self.http.get(&self.url).send().await {
            Ok(response) => response,
            Err(err) => {
                debug!(url = %self.url, error = %err, "liveness check failed");
                return false;
            }
        };
        if !response.status().is_success() {
            debug!(url = %self.url, status = %response.status(), "controller not ready");
            return false;
        }
        response
            .bytes()
            .await
            .map(|body| !body.is_empty())
            .unwrap_or(false)
    }
}

/// Polls `probe` every `interval` until it reports the controller alive.
/// The first check happens one `interval` after the call.
pub async fn wait_until_alive(probe: &dyn LivenessProbe, interval: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    let mut attempts = 0u32;
    loop {
        ticker.tick().await;
        attempts += 1;
        if probe.is_alive().await {
            info!(attempts, "controller reachable again");
            return;
        }
    }
}

#[cfg(test)]
#[path = "tests/liveness_tests.rs"]
mod tests;
