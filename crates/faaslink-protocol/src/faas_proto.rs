// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Trigger stream messages exchanged between a function and the platform.
//!
//! ```text
//! ClientMessage  { id, InitRequest | TriggerResponse }   function -> platform
//! ServerMessage  { id, InitResponse | TriggerRequest }   platform -> function
//! ```
//!
//! Declared directly with the prost derives so no `protoc` is needed at
//! build time. Tags are stable wire identifiers; never renumber them.

use std::collections::HashMap;

/// Message sent from the function to the platform.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientMessage {
    /// Correlation id. Responses reuse the id of the trigger they answer.
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(oneof = "client_message::Content", tags = "2, 3")]
    pub content: Option<client_message::Content>,
}

pub mod client_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Content {
        #[prost(message, tag = "2")]
        InitRequest(super::InitRequest),
        #[prost(message, tag = "3")]
        TriggerResponse(super::TriggerResponse),
    }
}

/// Message sent from the platform to the function.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServerMessage {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(oneof = "server_message::Content", tags = "2, 3")]
    pub content: Option<server_message::Content>,
}

pub mod server_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Content {
        #[prost(message, tag = "2")]
        InitResponse(super::InitResponse),
        #[prost(message, tag = "3")]
        TriggerRequest(super::TriggerRequest),
    }
}

/// First message on every trigger stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InitRequest {}

/// Platform acknowledgement of [`InitRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InitResponse {}

/// A single unit of inbound work.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TriggerRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
    #[prost(string, tag = "2")]
    pub mime_type: String,
    #[prost(oneof = "trigger_request::Context", tags = "3, 4")]
    pub context: Option<trigger_request::Context>,
}

pub mod trigger_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Context {
        #[prost(message, tag = "3")]
        Http(super::HttpTriggerContext),
        #[prost(message, tag = "4")]
        Topic(super::TopicTriggerContext),
    }
}

/// Multi-valued header entry.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HeaderValue {
    #[prost(string, repeated, tag = "1")]
    pub value: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HttpTriggerContext {
    #[prost(string, tag = "1")]
    pub method: String,
    #[prost(string, tag = "2")]
    pub path: String,
    #[prost(map = "string, message", tag = "3")]
    pub headers: HashMap<String, HeaderValue>,
    #[prost(map = "string, string", tag = "4")]
    pub query_params: HashMap<String, String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TopicTriggerContext {
    #[prost(string, tag = "1")]
    pub topic: String,
}

/// Result of processing a [`TriggerRequest`].
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TriggerResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
    #[prost(oneof = "trigger_response::Context", tags = "10, 11")]
    pub context: Option<trigger_response::Context>,
}

pub mod trigger_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Context {
        #[prost(message, tag = "10")]
        Http(super::HttpResponseContext),
        #[prost(message, tag = "11")]
        Topic(super::TopicResponseContext),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HttpResponseContext {
    #[prost(map = "string, message", tag = "1")]
    pub headers: HashMap<String, HeaderValue>,
    #[prost(int32, tag = "2")]
    pub status: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TopicResponseContext {
    /// `false` asks the platform to redeliver the event.
    #[prost(bool, tag = "1")]
    pub success: bool,
}

impl ClientMessage {
    pub fn init(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Some(client_message::Content::InitRequest(InitRequest {})),
        }
    }

    pub fn trigger_response(id: impl Into<String>, response: TriggerResponse) -> Self {
        Self {
            id: id.into(),
            content: Some(client_message::Content::TriggerResponse(response)),
        }
    }
}

impl ServerMessage {
    pub fn init_response(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Some(server_message::Content::InitResponse(InitResponse {})),
        }
    }

    pub fn trigger_request(id: impl Into<String>, request: TriggerRequest) -> Self {
        Self {
            id: id.into(),
            content: Some(server_message::Content::TriggerRequest(request)),
        }
    }
}
