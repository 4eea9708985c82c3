/*!
 * Mock provider implementation for testing.
 *
 * This module provides a provider that simulates different behaviors without
 * touching the network:
 * - `MockProvider::working()` - echoes a tagged version of the user text
 * - `MockProvider::failing()` - always fails with a connection error
 * - `MockProvider::html()` - answers with a web page
 * - `MockProvider::scripted(..)` - answers through a custom function
 *
 * It also records how many calls were in flight at once.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{ChatCompletion, ChatRequest, CompletionChoice, CompletionMessage, Provider, RawResponse, TokenUsage};

/// Custom response generator
pub type Responder = Arc<dyn Fn(&ChatRequest) -> Result<RawResponse, ProviderError> + Send + Sync>;

/// Behavior mode for the mock provider
#[derive(Clone)]
pub enum MockBehavior {
    /// Always succeeds with `[TRANSLATED] <text>`
    Working,
    /// Always fails with an error
    Failing,
    /// Returns an HTML document as plain text
    Html,
    /// Delegates to a custom function
    Scripted(Responder),
}

impl std::fmt::Debug for MockBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Working => f.write_str("Working"),
            Self::Failing => f.write_str("Failing"),
            Self::Html => f.write_str("Html"),
            Self::Scripted(_) => f.write_str("Scripted"),
        }
    }
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    behavior: MockBehavior,
    /// Fixed delay before answering
    delay: Duration,
    /// Extra random delay upper bound, shuffles completion order
    jitter_ms: u64,
    request_count: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    closed: AtomicBool,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            jitter_ms: 0,
            request_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock whose endpoint serves a web page
    pub fn html() -> Self {
        Self::new(MockBehavior::Html)
    }

    /// Create a mock answering through `responder`
    pub fn scripted<F>(responder: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<RawResponse, ProviderError> + Send + Sync + 'static,
    {
        Self::new(MockBehavior::Scripted(Arc::new(responder)))
    }

    /// Wait this long before every answer
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Add up to `jitter_ms` of random delay to every answer
    pub fn with_jitter(mut self, jitter_ms: u64) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    /// Build a well-formed completion with token usage
    pub fn completion(text: impl Into<String>, prompt_tokens: u64, completion_tokens: u64) -> RawResponse {
        RawResponse::Structured(ChatCompletion {
            choices: vec![CompletionChoice {
                message: CompletionMessage {
                    content: Some(text.into()),
                },
            }],
            usage: Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
            }),
        })
    }

    /// Number of requests received
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Whether `close` has been called
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Copies of every request received, in arrival order
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    fn answer(&self, request: &ChatRequest) -> Result<RawResponse, ProviderError> {
        match &self.behavior {
            MockBehavior::Working => {
                let text = request.user_text();
                Ok(Self::completion(format!("[TRANSLATED] {}", text), text.chars().count() as u64, 5))
            }
            MockBehavior::Failing => Err(ProviderError::ConnectionError("mock connection refused".to_string())),
            MockBehavior::Html => Ok(RawResponse::Text("<!DOCTYPE html><html><body>Login</body></html>".to_string())),
            MockBehavior::Scripted(responder) => responder(request),
        }
    }
}

// Decrements the in-flight count even when the call future is dropped by a timeout
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: ChatRequest) -> Result<RawResponse, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        let jitter = if self.jitter_ms > 0 {
            Duration::from_millis(rand::rng().random_range(0..=self.jitter_ms))
        } else {
            Duration::ZERO
        };
        let wait = self.delay + jitter;
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.answer(&request)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
