// Queue API Port
// Pull requests against the backend queue service (read-only, idempotent)

use crate::domain::QueueSnapshot;
use async_trait::async_trait;
use thiserror::Error;

/// Queue API errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Request timed out after {0}ms")]
    Timeout(u64),
}

/// Queue API trait
#[async_trait]
pub trait QueueApi: Send + Sync {
    /// Full queue snapshot, used for initial render before the push channel connects
    async fn fetch_queue(&self) -> Result<QueueSnapshot, ApiError>;

    /// Number of entries marked DONE today (civil date at the clinic's offset)
    async fn served_today(&self) -> Result<u64, ApiError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct State {
        queue: Result<QueueSnapshot, ApiError>,
        served_today: Result<u64, ApiError>,
        served_delay: Option<Duration>,
        fetch_calls: usize,
        served_calls: usize,
    }

    /// Mock Queue API with scripted responses
    #[derive(Clone)]
    pub struct MockQueueApi {
        state: Arc<Mutex<State>>,
    }

    impl MockQueueApi {
        pub fn new(queue: QueueSnapshot, served_today: u64) -> Self {
            Self {
                state: Arc::new(Mutex::new(State {
                    queue: Ok(queue),
                    served_today: Ok(served_today),
                    served_delay: None,
                    fetch_calls: 0,
                    served_calls: 0,
                })),
            }
        }

        pub fn new_failing() -> Self {
            let api = Self::new(QueueSnapshot::empty(), 0);
            api.set_queue(Err(ApiError::Transport("connection refused".to_string())));
            api.set_served_today(Err(ApiError::Transport("connection refused".to_string())));
            api
        }

        pub fn set_queue(&self, queue: Result<QueueSnapshot, ApiError>) {
            self.state.lock().unwrap().queue = queue;
        }

        pub fn set_served_today(&self, served: Result<u64, ApiError>) {
            self.state.lock().unwrap().served_today = served;
        }

        /// Make every served-today call take this long before answering
        pub fn set_served_delay(&self, delay: Duration) {
            self.state.lock().unwrap().served_delay = Some(delay);
        }

        pub fn fetch_calls(&self) -> usize {
            self.state.lock().unwrap().fetch_calls
        }

        pub fn served_calls(&self) -> usize {
            self.state.lock().unwrap().served_calls
        }
    }

    #[async_trait]
    impl QueueApi for MockQueueApi {
        async fn fetch_queue(&self) -> Result<QueueSnapshot, ApiError> {
            let mut state = self.state.lock().unwrap();
            state.fetch_calls += 1;
            state.queue.clone()
        }

        async fn served_today(&self) -> Result<u64, ApiError> {
            let delay = {
                let mut state = self.state.lock().unwrap();
                state.served_calls += 1;
                state.served_delay
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.state.lock().unwrap().served_today.clone()
        }
    }
}
