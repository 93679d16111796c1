// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-trigger state threaded through the middleware chain.
//!
//! A context pairs one immutable request with one mutable response. Cloning a
//! context shares the request and copies the response, so a middleware can
//! fork state without touching what its caller sees.

mod event;
mod headers;
mod http;

use std::sync::Arc;

pub use event::{EventRequest, EventRequestBuilder, EventResponse};
pub use headers::{Headers, QueryParams};
pub use http::{HttpRequest, HttpRequestBuilder, HttpResponse};

/// Context for an HTTP trigger.
#[derive(Debug, Clone)]
pub struct HttpContext {
    request: Arc<HttpRequest>,
    response: HttpResponse,
}

impl HttpContext {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request: Arc::new(request),
            response: HttpResponse::default(),
        }
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut HttpResponse {
        &mut self.response
    }

    /// Swap in a new request, keeping the response accumulated so far.
    pub fn with_request(self, request: HttpRequest) -> Self {
        Self {
            request: Arc::new(request),
            response: self.response,
        }
    }

    pub fn into_response(self) -> HttpResponse {
        self.response
    }
}

/// Context for a topic event trigger.
#[derive(Debug, Clone)]
pub struct EventContext {
    request: Arc<EventRequest>,
    response: EventResponse,
}

impl EventContext {
    pub fn new(request: EventRequest) -> Self {
        Self {
            request: Arc::new(request),
            response: EventResponse::default(),
        }
    }

    pub fn request(&self) -> &EventRequest {
        &self.request
    }

    pub fn response(&self) -> &EventResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut EventResponse {
        &mut self.response
    }

    pub fn with_request(self, request: EventRequest) -> Self {
        Self {
            request: Arc::new(request),
            response: self.response,
        }
    }

    pub fn into_response(self) -> EventResponse {
        self.response
    }
}
