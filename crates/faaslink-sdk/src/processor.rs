// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Turns one wire trigger into one wire response.
//!
//! ```text
//! TriggerRequest -> context -> pipeline -> response -> TriggerResponse
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use faaslink_protocol::faas_proto::{
    HeaderValue, HttpResponseContext, HttpTriggerContext, TopicResponseContext,
    TopicTriggerContext, TriggerRequest, TriggerResponse, trigger_request, trigger_response,
};
use tracing::{debug, error, warn};

use crate::context::{
    EventContext, EventRequest, EventResponse, Headers, HttpContext, HttpRequest, HttpResponse,
    QueryParams,
};
use crate::error::{BoxError, ChainError, ProcessError};
use crate::middleware::Pipeline;

/// Kind of trigger carried by a [`TriggerRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Http,
    Topic,
    Unknown,
}

impl TriggerKind {
    pub fn of(request: &TriggerRequest) -> Self {
        match request.context {
            Some(trigger_request::Context::Http(_)) => TriggerKind::Http,
            Some(trigger_request::Context::Topic(_)) => TriggerKind::Topic,
            None => TriggerKind::Unknown,
        }
    }

    /// Reply sent when processing a trigger of this kind failed.
    ///
    /// HTTP gets a bare 500; topics get `success = false` so the platform
    /// redelivers.
    pub fn failure_response(self) -> TriggerResponse {
        let context = match self {
            TriggerKind::Http => Some(trigger_response::Context::Http(HttpResponseContext {
                headers: HashMap::new(),
                status: 500,
            })),
            TriggerKind::Topic => Some(trigger_response::Context::Topic(TopicResponseContext {
                success: false,
            })),
            TriggerKind::Unknown => None,
        };
        TriggerResponse {
            data: Vec::new(),
            context,
        }
    }

    /// Reply sent when the chain produced no context.
    pub fn empty_response(self) -> TriggerResponse {
        match self {
            TriggerKind::Http => http_response_to_wire(HttpResponse::new()),
            TriggerKind::Topic => event_response_to_wire(EventResponse::new()),
            TriggerKind::Unknown => TriggerResponse::default(),
        }
    }
}

/// Runs the registered pipelines for incoming triggers.
///
/// Stateless across calls; every trigger gets a fresh context.
pub struct TriggerProcessor {
    http: Pipeline<HttpContext>,
    events: Pipeline<EventContext>,
}

impl TriggerProcessor {
    pub fn new(http: Pipeline<HttpContext>, events: Pipeline<EventContext>) -> Self {
        Self { http, events }
    }

    pub fn http_pipeline(&self) -> &Pipeline<HttpContext> {
        &self.http
    }

    pub fn event_pipeline(&self) -> &Pipeline<EventContext> {
        &self.events
    }

    /// Process one trigger.
    ///
    /// A chain that yields no context produces an empty successful response.
    /// Failures, including panics in user code, are logged and returned.
    pub async fn process(&self, request: TriggerRequest) -> Result<TriggerResponse, ProcessError> {
        let TriggerRequest {
            data,
            mime_type,
            context,
        } = request;

        match context {
            Some(trigger_request::Context::Http(http)) => {
                self.process_http(http, mime_type, data.into()).await
            }
            Some(trigger_request::Context::Topic(topic)) => {
                self.process_event(topic, mime_type, data.into()).await
            }
            None => {
                warn!("trigger carries neither an http nor a topic context");
                Err(ProcessError::UnsupportedTrigger)
            }
        }
    }

    async fn process_http(
        &self,
        wire: HttpTriggerContext,
        mime_type: String,
        body: Bytes,
    ) -> Result<TriggerResponse, ProcessError> {
        if self.http.is_empty() {
            error!(
                method = %wire.method,
                path = %wire.path,
                "no http handler or middleware registered"
            );
            return Err(ProcessError::NoHttpHandlers);
        }

        let request = http_request_from_wire(wire, mime_type, body);
        let method = request.method().to_string();
        let path = request.path().to_string();
        debug!(%method, %path, "processing http trigger");

        match self.http.run(HttpContext::new(request)).await {
            Ok(Some(ctx)) => Ok(http_response_to_wire(ctx.into_response())),
            Ok(None) => {
                warn!(
                    %method,
                    %path,
                    "middleware chain returned no context, sending empty response"
                );
                Ok(TriggerKind::Http.empty_response())
            }
            Err(err) => {
                let err = process_error(err);
                error!(
                    %method,
                    %path,
                    handler = handler_name(&err),
                    error = %err,
                    "http trigger failed"
                );
                Err(err)
            }
        }
    }

    async fn process_event(
        &self,
        wire: TopicTriggerContext,
        mime_type: String,
        body: Bytes,
    ) -> Result<TriggerResponse, ProcessError> {
        if self.events.is_empty() {
            error!(topic = %wire.topic, "no event handler or middleware registered");
            return Err(ProcessError::NoEventHandlers);
        }

        let request = EventRequest::builder()
            .topic(wire.topic)
            .mime_type(mime_type)
            .body(body)
            .build();
        let topic = request.topic().to_string();
        debug!(%topic, "processing event trigger");

        match self.events.run(EventContext::new(request)).await {
            Ok(Some(ctx)) => Ok(event_response_to_wire(ctx.into_response())),
            Ok(None) => {
                warn!(%topic, "middleware chain returned no context, sending empty response");
                Ok(TriggerKind::Topic.empty_response())
            }
            Err(err) => {
                let err = process_error(err);
                error!(%topic, handler = handler_name(&err), error = %err, "event trigger failed");
                Err(err)
            }
        }
    }
}

fn process_error(err: BoxError) -> ProcessError {
    match err.downcast::<ChainError>() {
        Ok(chain) => (*chain).into(),
        Err(source) => ProcessError::Handler {
            handler: "<chain>",
            source,
        },
    }
}

fn handler_name(err: &ProcessError) -> &'static str {
    match err {
        ProcessError::Handler { handler, .. } | ProcessError::Panicked { handler, .. } => handler,
        _ => "<none>",
    }
}

/// Build the request from its wire form. Header and query keys are sorted so
/// iteration order does not depend on map hashing.
pub fn http_request_from_wire(
    wire: HttpTriggerContext,
    mime_type: String,
    body: Bytes,
) -> HttpRequest {
    let mut header_entries: Vec<_> = wire.headers.into_iter().collect();
    header_entries.sort_by(|a, b| a.0.cmp(&b.0));
    let mut headers = Headers::new();
    for (name, values) in header_entries {
        for value in values.value {
            headers.add(name.as_str(), value);
        }
    }

    let mut query_entries: Vec<_> = wire.query_params.into_iter().collect();
    query_entries.sort_by(|a, b| a.0.cmp(&b.0));
    let mut query = QueryParams::new();
    for (name, value) in query_entries {
        query.add(name, value);
    }

    HttpRequest::builder()
        .method(wire.method)
        .path(wire.path)
        .headers(headers)
        .query(query)
        .mime_type(mime_type)
        .body(body)
        .build()
}

/// Flatten the response into its wire form, one value list per header name.
pub fn http_response_to_wire(mut response: HttpResponse) -> TriggerResponse {
    let headers = response
        .headers()
        .iter()
        .map(|(name, values)| {
            (
                name.to_string(),
                HeaderValue {
                    value: values.to_vec(),
                },
            )
        })
        .collect();
    let status = i32::from(response.status());
    let data = response.take_body().map(|b| b.to_vec()).unwrap_or_default();

    TriggerResponse {
        data,
        context: Some(trigger_response::Context::Http(HttpResponseContext {
            headers,
            status,
        })),
    }
}

pub fn event_response_to_wire(mut response: EventResponse) -> TriggerResponse {
    let data = response.take_body().map(|b| b.to_vec()).unwrap_or_default();
    TriggerResponse {
        data,
        context: Some(trigger_response::Context::Topic(TopicResponseContext {
            success: response.success(),
        })),
    }
}
