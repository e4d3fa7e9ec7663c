//! Shared helpers for integration tests.

#![allow(dead_code)]

use cuproute::{App, Request};
use std::sync::Once;

static LOGGING: Once = Once::new();

/// Install a test-writer subscriber once per test binary so log output is
/// captured per test.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A fresh application with test logging installed.
pub fn app() -> App {
    init_test_logging();
    App::new()
}

/// Build a request the way a transport adapter would.
pub struct RequestBuilder {
    method: String,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: String,
}

/// A request for `/` with the given method; refine it with the builder methods.
pub fn app_request(method: &str) -> RequestBuilder {
    RequestBuilder {
        method: method.to_string(),
        path: "/".to_string(),
        query: Vec::new(),
        headers: Vec::new(),
        body: String::new(),
    }
}

impl RequestBuilder {
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn build(self) -> Request {
        let request = self
            .query
            .into_iter()
            .fold(Request::new(&self.method, self.path), |req, (name, value)| {
                req.with_query_value(&name, value)
            });
        request.with_headers(self.headers).with_body(self.body)
    }
}
