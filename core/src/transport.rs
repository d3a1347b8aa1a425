//! The I/O half of the host-does-IO split.
//!
//! A `Transport` turns an `HttpRequest` into an `HttpResponse`. It never
//! interprets status codes: 4xx/5xx come back as data and the
//! `StudioClient::parse_*` methods classify them. Only failures that leave
//! no response at all (DNS, connect, timeout) are errors here.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use ureq::http::Response;
use ureq::Body;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Upper bound on a buffered response body. Download bodies bypass it by
/// streaming through `execute_into`.
pub const MAX_BUFFERED_BODY: u64 = 10 * 1024 * 1024;

pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;

    /// Like `execute`, but a 2xx body is written to `sink` instead of being
    /// buffered; the returned response then has an empty body. Other
    /// statuses keep their body so the error detail can be extracted.
    fn execute_into(
        &self,
        request: &HttpRequest,
        sink: &mut dyn Write,
    ) -> Result<HttpResponse, ApiError> {
        let mut response = self.execute(request)?;
        if response.is_success() {
            sink.write_all(&response.body)?;
            response.body.clear();
        }
        Ok(response)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }

    fn execute_into(
        &self,
        request: &HttpRequest,
        sink: &mut dyn Write,
    ) -> Result<HttpResponse, ApiError> {
        (**self).execute_into(request, sink)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }

    fn execute_into(
        &self,
        request: &HttpRequest,
        sink: &mut dyn Write,
    ) -> Result<HttpResponse, ApiError> {
        (**self).execute_into(request, sink)
    }
}

/// Blocking transport backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }

    fn call(&self, req: &HttpRequest) -> Result<Response<Body>, ApiError> {
        let response = match req.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&req.url);
                for (k, v) in &req.query {
                    builder = builder.query(k, v);
                }
                for (k, v) in &req.headers {
                    builder = builder.header(k, v);
                }
                builder.call()?
            }
            HttpMethod::Delete => {
                let mut builder = self.agent.delete(&req.url);
                for (k, v) in &req.query {
                    builder = builder.query(k, v);
                }
                for (k, v) in &req.headers {
                    builder = builder.header(k, v);
                }
                builder.call()?
            }
            HttpMethod::Post | HttpMethod::Put => {
                let mut builder = if req.method == HttpMethod::Post {
                    self.agent.post(&req.url)
                } else {
                    self.agent.put(&req.url)
                };
                for (k, v) in &req.query {
                    builder = builder.query(k, v);
                }
                for (k, v) in &req.headers {
                    builder = builder.header(k, v);
                }
                match &req.body {
                    Some(body) => builder.send(body.as_bytes())?,
                    None => builder.send_empty()?,
                }
            }
        };
        Ok(response)
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

fn response_headers(response: &Response<Body>) -> Vec<(String, String)> {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn read_buffered(response: &mut Response<Body>) -> Result<Vec<u8>, ApiError> {
    Ok(response
        .body_mut()
        .with_config()
        .limit(MAX_BUFFERED_BODY)
        .read_to_vec()?)
}

impl Transport for UreqTransport {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut response = self.call(req)?;
        let status = response.status().as_u16();
        let headers = response_headers(&response);
        let body = read_buffered(&mut response)?;

        debug!(method = %req.method, url = %req.url, status, bytes = body.len(), "request completed");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn execute_into(
        &self,
        req: &HttpRequest,
        sink: &mut dyn Write,
    ) -> Result<HttpResponse, ApiError> {
        let mut response = self.call(req)?;
        let status = response.status().as_u16();
        let headers = response_headers(&response);
        let body = if response.status().is_success() {
            let streamed = io::copy(&mut response.body_mut().as_reader(), sink)?;
            debug!(method = %req.method, url = %req.url, status, bytes = streamed, "response streamed");
            Vec::new()
        } else {
            read_buffered(&mut response)?
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
