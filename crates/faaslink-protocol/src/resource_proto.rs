// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Resource RPC messages (key-value, topics, queues, secrets, storage, documents).
//!
//! Every call is a single `ResourceRequest` answered by a single
//! `ResourceResponse` on its own bidirectional stream. JSON values (key-value
//! entries, documents) travel as UTF-8 encoded bytes.

/// Status codes carried by [`ErrorResponse`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StatusCode {
    Unknown = 0,
    InvalidArgument = 3,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    Internal = 13,
    Unavailable = 14,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResourceRequest {
    #[prost(
        oneof = "resource_request::Request",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15"
    )]
    pub request: Option<resource_request::Request>,
}

pub mod resource_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Request {
        #[prost(message, tag = "1")]
        KvGet(super::KvGetRequest),
        #[prost(message, tag = "2")]
        KvSet(super::KvSetRequest),
        #[prost(message, tag = "3")]
        KvDelete(super::KvDeleteRequest),
        #[prost(message, tag = "4")]
        TopicPublish(super::TopicPublishRequest),
        #[prost(message, tag = "5")]
        QueueSend(super::QueueSendRequest),
        #[prost(message, tag = "6")]
        QueueReceive(super::QueueReceiveRequest),
        #[prost(message, tag = "7")]
        QueueComplete(super::QueueCompleteRequest),
        #[prost(message, tag = "8")]
        SecretPut(super::SecretPutRequest),
        #[prost(message, tag = "9")]
        SecretAccess(super::SecretAccessRequest),
        #[prost(message, tag = "10")]
        StorageRead(super::StorageRequest),
        #[prost(message, tag = "11")]
        StorageWrite(super::StorageWriteRequest),
        #[prost(message, tag = "12")]
        StorageDelete(super::StorageRequest),
        #[prost(message, tag = "13")]
        DocumentGet(super::DocumentKey),
        #[prost(message, tag = "14")]
        DocumentSet(super::DocumentSetRequest),
        #[prost(message, tag = "15")]
        DocumentDelete(super::DocumentKey),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResourceResponse {
    #[prost(
        oneof = "resource_response::Response",
        tags = "1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16"
    )]
    pub response: Option<resource_response::Response>,
}

pub mod resource_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Response {
        #[prost(message, tag = "1")]
        KvGet(super::KvGetResponse),
        #[prost(message, tag = "2")]
        KvSet(super::Ack),
        #[prost(message, tag = "3")]
        KvDelete(super::Ack),
        #[prost(message, tag = "4")]
        TopicPublish(super::TopicPublishResponse),
        #[prost(message, tag = "5")]
        QueueSend(super::QueueSendResponse),
        #[prost(message, tag = "6")]
        QueueReceive(super::QueueReceiveResponse),
        #[prost(message, tag = "7")]
        QueueComplete(super::Ack),
        #[prost(message, tag = "8")]
        SecretPut(super::SecretPutResponse),
        #[prost(message, tag = "9")]
        SecretAccess(super::SecretAccessResponse),
        #[prost(message, tag = "10")]
        StorageRead(super::StorageReadResponse),
        #[prost(message, tag = "11")]
        StorageWrite(super::Ack),
        #[prost(message, tag = "12")]
        StorageDelete(super::Ack),
        #[prost(message, tag = "13")]
        DocumentGet(super::DocumentGetResponse),
        #[prost(message, tag = "14")]
        DocumentSet(super::Ack),
        #[prost(message, tag = "15")]
        DocumentDelete(super::Ack),
        #[prost(message, tag = "16")]
        Error(super::ErrorResponse),
    }
}

/// Empty success response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ack {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorResponse {
    #[prost(enumeration = "StatusCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Key-value
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KvGetRequest {
    #[prost(string, tag = "1")]
    pub store: String,
    #[prost(string, tag = "2")]
    pub key: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KvGetResponse {
    #[prost(bool, tag = "1")]
    pub found: bool,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KvSetRequest {
    #[prost(string, tag = "1")]
    pub store: String,
    #[prost(string, tag = "2")]
    pub key: String,
    #[prost(bytes = "vec", tag = "3")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KvDeleteRequest {
    #[prost(string, tag = "1")]
    pub store: String,
    #[prost(string, tag = "2")]
    pub key: String,
}

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TopicPublishRequest {
    #[prost(string, tag = "1")]
    pub topic: String,
    #[prost(string, tag = "2")]
    pub payload_type: String,
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
    /// Delivery delay in milliseconds (0 = immediate)
    #[prost(uint64, tag = "4")]
    pub delay_ms: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TopicPublishResponse {
    #[prost(string, tag = "1")]
    pub id: String,
}

// ---------------------------------------------------------------------------
// Queues
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueueTask {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub payload_type: String,
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueueSendRequest {
    #[prost(string, tag = "1")]
    pub queue: String,
    #[prost(message, repeated, tag = "2")]
    pub tasks: Vec<QueueTask>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FailedTask {
    #[prost(message, optional, tag = "1")]
    pub task: Option<QueueTask>,
    #[prost(string, tag = "2")]
    pub message: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueueSendResponse {
    #[prost(message, repeated, tag = "1")]
    pub failed_tasks: Vec<FailedTask>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueueReceiveRequest {
    #[prost(string, tag = "1")]
    pub queue: String,
    #[prost(uint32, tag = "2")]
    pub depth: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeasedTask {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub lease_id: String,
    #[prost(string, tag = "3")]
    pub payload_type: String,
    #[prost(bytes = "vec", tag = "4")]
    pub payload: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueueReceiveResponse {
    #[prost(message, repeated, tag = "1")]
    pub tasks: Vec<LeasedTask>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueueCompleteRequest {
    #[prost(string, tag = "1")]
    pub queue: String,
    #[prost(string, tag = "2")]
    pub lease_id: String,
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SecretPutRequest {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SecretPutResponse {
    #[prost(string, tag = "1")]
    pub version: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SecretAccessRequest {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub version: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SecretAccessResponse {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub version: String,
    #[prost(bytes = "vec", tag = "3")]
    pub value: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StorageRequest {
    #[prost(string, tag = "1")]
    pub bucket: String,
    #[prost(string, tag = "2")]
    pub key: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StorageReadResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub body: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StorageWriteRequest {
    #[prost(string, tag = "1")]
    pub bucket: String,
    #[prost(string, tag = "2")]
    pub key: String,
    #[prost(bytes = "vec", tag = "3")]
    pub body: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DocumentKey {
    #[prost(string, tag = "1")]
    pub collection: String,
    #[prost(string, tag = "2")]
    pub id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DocumentGetResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub content: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DocumentSetRequest {
    #[prost(message, optional, tag = "1")]
    pub key: Option<DocumentKey>,
    #[prost(bytes = "vec", tag = "2")]
    pub content: Vec<u8>,
}

impl ErrorResponse {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Decoded status code; unrecognised values map to [`StatusCode::Unknown`].
    pub fn status(&self) -> StatusCode {
        StatusCode::try_from(self.code).unwrap_or(StatusCode::Unknown)
    }
}

impl From<resource_request::Request> for ResourceRequest {
    fn from(request: resource_request::Request) -> Self {
        Self {
            request: Some(request),
        }
    }
}

impl From<resource_response::Response> for ResourceResponse {
    fn from(response: resource_response::Response) -> Self {
        Self {
            response: Some(response),
        }
    }
}
