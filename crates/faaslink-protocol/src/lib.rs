// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wire layer between a faaslink function and its platform.
//!
//! Two kinds of traffic share one QUIC connection:
//!
//! - the trigger stream ([`faas_proto`]): opened once by the function with a
//!   `StreamStart` frame, then `StreamData` frames in both directions, one
//!   reply per trigger
//! - resource calls ([`resource_proto`]): one `Request` frame and one
//!   `Response` frame on a short-lived stream of their own
//!
//! Messages are protobuf (prost) inside the frames of [`frame`].
//!
//! ```ignore
//! use faaslink_protocol::PlatformClient;
//! use faaslink_protocol::resource_proto::{KvGetRequest, ResourceRequest, ResourceResponse, resource_request};
//!
//! let client = PlatformClient::localhost("127.0.0.1:50051".parse()?)?;
//! let lookup: ResourceRequest = resource_request::Request::KvGet(KvGetRequest {
//!     store: "profiles".to_string(),
//!     key: "alice".to_string(),
//! })
//! .into();
//! let reply: ResourceResponse = client.request(&lookup).await?;
//! ```

pub mod client;
pub mod faas_proto;
pub mod frame;
pub mod resource_proto;
pub mod server;

pub use client::{ClientError, PlatformClient, PlatformClientConfig};
pub use frame::{Frame, FrameError, FrameReader, FrameWriter, MessageType};
pub use server::{
    ConnectionHandler, PlatformServer, PlatformServerConfig, ServerError, StreamHandler,
};
