//! Remote API transport.
//!
//! The command core treats the hypervisor API as one opaque operation:
//! `request(method, path, body)` either resolves with parsed JSON or fails
//! with a [`TransportError`]. Authentication, TLS, and timeouts live here;
//! retry policy deliberately does not exist (see the invocation contract —
//! failures surface verbatim, exactly once).

use std::fmt;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::settings::Settings;

/// HTTP method of a remote call. A narrow enum instead of `reqwest::Method`
/// so handler code and tests don't depend on the HTTP crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// Failure of one remote call. The upstream message is kept verbatim.
#[derive(Debug, Clone)]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        TransportError {
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

/// One remote call in, one JSON value or error out. Object-safe so the
/// execution context can hold `Arc<dyn Transport>` and tests can substitute
/// a stub.
pub trait Transport: Send + Sync {
    fn request<'a>(
        &'a self,
        method: Method,
        path: &'a str,
        body: Option<&'a Value>,
    ) -> BoxFuture<'a, Result<Value, TransportError>>;
}

// ── HTTP implementation ─────────────────────────────────────────

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed transport speaking the hypervisor's JSON API.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    auth_header: String,
}

impl HttpTransport {
    pub fn new(settings: &Settings) -> Result<HttpTransport, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(!settings.verify_tls)
            .build()
            .map_err(|e| TransportError::new(format!("failed to build HTTP client: {e}")))?;
        Ok(HttpTransport {
            http,
            base_url: settings.api_url.trim_end_matches('/').to_string(),
            auth_header: settings.auth_header(),
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut req = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
            Method::Put => self.http.put(&url),
            Method::Delete => self.http.delete(&url),
        }
        .header("Authorization", &self.auth_header);

        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;

        if !status.is_success() {
            // The API puts the useful message in the status line and any
            // field-level detail under "errors".
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("errors").map(|e| format!(" — {e}")))
                .unwrap_or_default();
            return Err(TransportError::new(format!(
                "{method} {path} failed: {status}{detail}"
            )));
        }

        let parsed: Value = serde_json::from_str(&text)
            .map_err(|e| TransportError::new(format!("invalid JSON from {path}: {e}")))?;

        // Replies are wrapped as {"data": ...}; unwrap so handlers see the payload.
        Ok(match parsed {
            Value::Object(mut map) => map.remove("data").unwrap_or(Value::Null),
            other => other,
        })
    }
}

impl Transport for HttpTransport {
    fn request<'a>(
        &'a self,
        method: Method,
        path: &'a str,
        body: Option<&'a Value>,
    ) -> BoxFuture<'a, Result<Value, TransportError>> {
        Box::pin(self.send(method, path, body))
    }
}

// ── Test transport ──────────────────────────────────────────────

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::{BoxFuture, Method, Transport, TransportError, Value};

    /// One recorded call: method, path, and body if any.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedCall {
        pub method: String,
        pub path: String,
        pub body: Option<Value>,
    }

    /// Transport stub: pops canned results in order, records every call.
    /// Running out of canned results yields `Null` (convenient for handlers
    /// whose reply content the test ignores).
    #[derive(Default)]
    pub struct StubTransport {
        responses: Mutex<Vec<Result<Value, TransportError>>>,
        calls: Mutex<Vec<RecordedCall>>,
        panic_message: Mutex<Option<String>>,
    }

    impl StubTransport {
        pub fn new() -> Self {
            StubTransport::default()
        }

        /// Make every request panic, for boundary-containment tests.
        pub fn panic_with(self, message: &str) -> Self {
            *self
                .panic_message
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(message.to_string());
            self
        }

        pub fn respond_with(self, value: Value) -> Self {
            self.responses
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(Ok(value));
            self
        }

        pub fn fail_with(self, message: &str) -> Self {
            self.responses
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(Err(TransportError::new(message)));
            self
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .len()
        }
    }

    impl Transport for StubTransport {
        #[allow(clippy::panic)]
        fn request<'a>(
            &'a self,
            method: Method,
            path: &'a str,
            body: Option<&'a Value>,
        ) -> BoxFuture<'a, Result<Value, TransportError>> {
            if let Some(message) = self
                .panic_message
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone()
            {
                return Box::pin(async move { panic!("{message}") });
            }
            self.calls
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(RecordedCall {
                    method: method.to_string(),
                    path: path.to_string(),
                    body: body.cloned(),
                });
            let mut responses = self
                .responses
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let next = if responses.is_empty() {
                Ok(Value::Null)
            } else {
                responses.remove(0)
            };
            Box::pin(async move { next })
        }
    }
}
