// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP trigger request and response.

use std::collections::HashMap;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::headers::{Headers, QueryParams};

/// Immutable HTTP request delivered by the platform.
///
/// Use [`HttpRequest::builder_from`] to derive a modified copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpRequest {
    method: String,
    path: String,
    headers: Headers,
    query: QueryParams,
    path_params: HashMap<String, String>,
    mime_type: String,
    body: Bytes,
}

impl HttpRequest {
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// Builder pre-filled with every field of `request`.
    pub fn builder_from(request: &HttpRequest) -> HttpRequestBuilder {
        HttpRequestBuilder {
            inner: request.clone(),
        }
    }

    /// Copy of this request with the given path parameters.
    pub fn with_path_params(&self, params: HashMap<String, String>) -> HttpRequest {
        HttpRequest::builder_from(self).path_params(params).build()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Raw path as delivered, including any query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path with any `?query` suffix removed.
    pub fn route_path(&self) -> &str {
        self.path
            .split_once('?')
            .map_or(self.path.as_str(), |(path, _)| path)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name)
    }

    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn body_text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.body)
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[derive(Debug, Clone, Default)]
pub struct HttpRequestBuilder {
    inner: HttpRequest,
}

impl HttpRequestBuilder {
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.inner.method = method.into();
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.inner.path = path.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.headers.add(name, value);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.inner.headers = headers;
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.query.add(name, value);
        self
    }

    pub fn query(mut self, query: QueryParams) -> Self {
        self.inner.query = query;
        self
    }

    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.path_params.insert(name.into(), value.into());
        self
    }

    pub fn path_params(mut self, params: HashMap<String, String>) -> Self {
        self.inner.path_params = params;
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.inner.mime_type = mime_type.into();
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.inner.body = body.into();
        self
    }

    pub fn build(self) -> HttpRequest {
        self.inner
    }
}

/// Mutable HTTP response accumulated along the middleware chain.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    status: u16,
    headers: Headers,
    body: Option<Bytes>,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Headers::new(),
            body: None,
        }
    }
}

impl HttpResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Append a header value; names compare case-insensitively.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.add(name, value);
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.set(name, value);
        self
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    pub fn take_body(&mut self) -> Option<Bytes> {
        self.body.take()
    }

    /// Set a `text/plain` body.
    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.set_header("Content-Type", "text/plain");
        self.set_body(text.into())
    }

    /// Serialize `value` as an `application/json` body.
    pub fn set_json<T: Serialize>(&mut self, value: &T) -> Result<&mut Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.set_header("Content-Type", "application/json");
        Ok(self.set_body(body))
    }
}
