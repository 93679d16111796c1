// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Topic event request and response.

use std::collections::HashMap;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Immutable topic event.
///
/// `extras` carries values one middleware wants to hand to the next; set them
/// by building a new request with [`EventRequest::builder_from`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventRequest {
    topic: String,
    mime_type: String,
    body: Bytes,
    extras: HashMap<String, Value>,
}

impl EventRequest {
    pub fn builder() -> EventRequestBuilder {
        EventRequestBuilder::default()
    }

    pub fn builder_from(request: &EventRequest) -> EventRequestBuilder {
        EventRequestBuilder {
            inner: request.clone(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn extras(&self) -> &HashMap<String, Value> {
        &self.extras
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventRequestBuilder {
    inner: EventRequest,
}

impl EventRequestBuilder {
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.inner.topic = topic.into();
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

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inner.extras.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> EventRequest {
        self.inner
    }
}

/// Outcome of handling an event.
///
/// `success = false` asks the platform to redeliver.
#[derive(Debug, Clone, PartialEq)]
pub struct EventResponse {
    success: bool,
    body: Option<Bytes>,
}

impl Default for EventResponse {
    fn default() -> Self {
        Self {
            success: true,
            body: None,
        }
    }
}

impl EventResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn set_success(&mut self, success: bool) -> &mut Self {
        self.success = success;
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
}
