use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::client::MessageChannel;
use crate::error::{ChannelError, ChannelResult};

/// A mock message channel for testing.
#[derive(Clone, Default)]
pub struct MockChannel {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Payloads that were accepted, in order.
    published: Vec<String>,
    /// Number of publish calls, successful or not.
    attempts: usize,
    /// Outcomes consumed one per publish before falling back to `fail_with`.
    scripted: VecDeque<Option<String>>,
    /// If set, unscripted publishes fail with this error.
    fail_with: Option<String>,
    latency: Option<Duration>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock channel where every publish fails.
    pub fn failing(error_message: impl Into<String>) -> Self {
        let channel = Self::new();
        channel.state.lock().unwrap().fail_with = Some(error_message.into());
        channel
    }

    /// Queue a successful outcome for the next publish.
    pub fn expect_success(self) -> Self {
        self.state.lock().unwrap().scripted.push_back(None);
        self
    }

    /// Queue a failure for the next publish.
    pub fn expect_failure(self, error_message: impl Into<String>) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripted
            .push_back(Some(error_message.into()));
        self
    }

    /// Delay each publish by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().unwrap().latency = Some(latency);
        self
    }

    pub fn published(&self) -> Vec<String> {
        self.state.lock().unwrap().published.clone()
    }

    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.published.clear();
        state.attempts = 0;
    }
}

impl MessageChannel for MockChannel {
    fn publish(&self, payload: String) -> impl Future<Output = ChannelResult<()>> + Send {
        let state = self.state.clone();
        async move {
            let latency = state.lock().unwrap().latency;
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }

            let mut state = state.lock().unwrap();
            state.attempts += 1;

            let outcome = match state.scripted.pop_front() {
                Some(outcome) => outcome,
                None => state.fail_with.clone(),
            };

            match outcome {
                Some(error) => Err(ChannelError::Kafka(error)),
                None => {
                    state.published.push(payload);
                    Ok(())
                }
            }
        }
    }
}
