// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request builder over a pooled session.
//!
//! Settings are plain values until `execute`/`execute_get`; a request that
//! is built but never executed holds no transport resources.

use crate::error::HttpErrorCode;
use crate::session::HttpSession;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Outcome of an executed request.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub code: HttpErrorCode,
    /// HTTP status, 0 when no response arrived.
    pub status: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// A single HTTP exchange in the making.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    url: String,
    timeout: Option<Duration>,
    post_fields: Option<String>,
    headers: Vec<(String, String)>,
    form_buffers: Vec<(String, Vec<u8>)>,
    form_files: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(url: &str) -> Self {
        Self { url: url.to_string(), ..Self::default() }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Raw request body for POST (JSON or form-encoded, caller's choice).
    pub fn post_fields(mut self, body: String) -> Self {
        self.post_fields = Some(body);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Multipart part backed by an in-memory buffer.
    pub fn form_buffer(mut self, name: &str, content: Vec<u8>) -> Self {
        self.form_buffers.push((name.to_string(), content));
        self
    }

    /// Multipart part streamed from a file path.
    pub fn form_file(mut self, name: &str, path: &str) -> Self {
        self.form_files.push((name.to_string(), path.to_string()));
        self
    }

    /// POST the request on the given session.
    pub async fn execute(&self, session: &HttpSession) -> HttpResponse {
        self.run(session, reqwest::Method::POST).await
    }

    /// GET the request on the given session.
    pub async fn execute_get(&self, session: &HttpSession) -> HttpResponse {
        self.run(session, reqwest::Method::GET).await
    }

    async fn run(&self, session: &HttpSession, method: reqwest::Method) -> HttpResponse {
        let url = match Url::parse(&self.url) {
            Ok(url) => url,
            Err(_) => {
                let response =
                    HttpResponse { code: HttpErrorCode::InvalidInput, ..HttpResponse::default() };
                session.record_outcome(response.code);
                return response;
            }
        };

        let mut builder = session.client().request(method, url);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }

        if !self.form_buffers.is_empty() || !self.form_files.is_empty() {
            let mut form = reqwest::multipart::Form::new();
            for (name, content) in &self.form_buffers {
                form = form.part(
                    name.clone(),
                    reqwest::multipart::Part::bytes(content.clone()).file_name(name.clone()),
                );
            }
            for (name, path) in &self.form_files {
                match tokio::fs::read(path).await {
                    Ok(content) => {
                        form = form.part(
                            name.clone(),
                            reqwest::multipart::Part::bytes(content).file_name(name.clone()),
                        );
                    }
                    Err(_) => {
                        let response = HttpResponse {
                            code: HttpErrorCode::InvalidInput,
                            ..HttpResponse::default()
                        };
                        session.record_outcome(response.code);
                        return response;
                    }
                }
            }
            builder = builder.multipart(form);
        } else if let Some(body) = &self.post_fields {
            builder = builder.body(body.clone());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(error) => {
                let code = HttpErrorCode::from_transport(&error);
                debug!(url = %self.url, %code, "request failed in transport");
                session.record_outcome(code);
                return HttpResponse { code, ..HttpResponse::default() };
            }
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_ascii_lowercase(), value.to_str().unwrap_or_default().to_string())
            })
            .collect();
        let body = response.text().await.unwrap_or_default();

        let code = HttpErrorCode::from_status(status);
        session.record_outcome(code);
        HttpResponse { code, status, body, headers }
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
