//! Shared test doubles.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::{Arc, Mutex};

use homewarden::gateway::{ApiMethod, ApiRequest, GatewayClient, GatewayError, RetryPolicy, Transport};
use serde_json::Value;

/// Scripted transport that records every request it receives.
///
/// Each route holds a queue of results; the last one repeats once the queue
/// is down to a single entry. Unscripted routes answer 404.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<(ApiMethod, String), VecDeque<Result<Value, GatewayError>>>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    /// Empty fake; every route answers 404.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result for `method path`.
    pub fn respond(self, method: ApiMethod, path: &str, result: Result<Value, GatewayError>) -> Self {
        self.routes
            .lock()
            .expect("routes lock")
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(result);
        self
    }

    /// Queue a successful GET payload.
    pub fn on_get(self, path: &str, value: Value) -> Self {
        self.respond(ApiMethod::Get, path, Ok(value))
    }

    /// Queue a POST result.
    pub fn on_post(self, path: &str, result: Result<Value, GatewayError>) -> Self {
        self.respond(ApiMethod::Post, path, result)
    }

    /// Every request received, in order.
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Only the POST requests received.
    pub fn posts(&self) -> Vec<ApiRequest> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == ApiMethod::Post)
            .collect()
    }

    /// Number of requests received for `method path`.
    pub fn count(&self, method: ApiMethod, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: &ApiRequest) -> Result<Value, GatewayError> {
        self.calls.lock().expect("calls lock").push(request.clone());

        let mut routes = self.routes.lock().expect("routes lock");
        let Some(queue) = routes.get_mut(&(request.method, request.path.clone())) else {
            return Err(GatewayError::HttpStatus {
                status: 404,
                body: "not found".to_owned(),
            });
        };
        if queue.len() > 1 {
            queue.pop_front().expect("queue is non-empty")
        } else {
            queue.front().cloned().expect("route has a scripted result")
        }
    }
}

/// Gateway over a shared fake, attempting each call once.
pub fn single_attempt_gateway(fake: &Arc<FakeTransport>) -> GatewayClient<Arc<FakeTransport>> {
    GatewayClient::new(Arc::clone(fake), RetryPolicy::single_attempt())
}

/// In-memory sink for a scoped `tracing` subscriber.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Everything logged so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log lock")).into_owned()
    }

    /// Install a thread-local subscriber writing here until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("log lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
