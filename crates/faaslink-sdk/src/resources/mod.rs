// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Clients for platform-hosted resources.
//!
//! Every client is a thin wrapper: build one [`ResourceRequest`], send it over
//! a [`ResourceTransport`], map the matching response variant. Remote failures
//! arrive as `ErrorResponse` and become typed [`ResourceError`]s.
//!
//! Clients are plain values. Build one [`Resources`] at the entry point and
//! hand clones to whatever needs them.

pub mod documents;
pub mod kv;
pub mod queues;
pub mod secrets;
pub mod storage;
pub mod topics;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use faaslink_protocol::PlatformClient;
use faaslink_protocol::resource_proto::{
    ResourceRequest, ResourceResponse, resource_request, resource_response,
};
use tracing::debug;

use crate::config::FaasConfig;
use crate::error::ResourceError;

pub use documents::DocumentClient;
pub use kv::KeyValueClient;
pub use queues::{FailedTask, LeasedTask, QueueClient, Task};
pub use secrets::{Secret, SecretClient};
pub use storage::StorageClient;
pub use topics::TopicClient;

/// Sends one resource request and returns its response.
#[async_trait]
pub trait ResourceTransport: Send + Sync {
    async fn call(&self, request: ResourceRequest) -> Result<ResourceResponse, ResourceError>;
}

#[async_trait]
impl ResourceTransport for PlatformClient {
    async fn call(&self, request: ResourceRequest) -> Result<ResourceResponse, ResourceError> {
        Ok(self.request(&request).await?)
    }
}

/// Shared handle to a transport, with an optional per-request timeout.
#[derive(Clone)]
pub struct ResourceChannel {
    transport: Arc<dyn ResourceTransport>,
    timeout_ms: u64,
}

impl ResourceChannel {
    pub fn new(transport: Arc<dyn ResourceTransport>) -> Self {
        Self {
            transport,
            timeout_ms: 0,
        }
    }

    /// Fail requests that take longer than `timeout_ms`; 0 disables.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Send `request`; an `Error` reply becomes the matching [`ResourceError`].
    pub(crate) async fn call(
        &self,
        request: resource_request::Request,
    ) -> Result<resource_response::Response, ResourceError> {
        let pending = self.transport.call(request.into());
        let response = if self.timeout_ms > 0 {
            tokio::time::timeout(Duration::from_millis(self.timeout_ms), pending)
                .await
                .map_err(|_| ResourceError::Timeout(self.timeout_ms))??
        } else {
            pending.await?
        };

        match response.response {
            Some(resource_response::Response::Error(e)) => {
                debug!(code = e.code, message = %e.message, "resource request failed");
                Err(e.into())
            }
            Some(response) => Ok(response),
            None => Err(ResourceError::UnexpectedResponse(
                "empty resource response".to_string(),
            )),
        }
    }
}

pub(crate) fn unexpected(expected: &str) -> ResourceError {
    ResourceError::UnexpectedResponse(format!("expected {}", expected))
}

/// All resource clients over one transport.
#[derive(Clone)]
pub struct Resources {
    kv: KeyValueClient,
    topics: TopicClient,
    queues: QueueClient,
    secrets: SecretClient,
    storage: StorageClient,
    documents: DocumentClient,
}

impl Resources {
    pub fn new(channel: ResourceChannel) -> Self {
        Self {
            kv: KeyValueClient::new(channel.clone()),
            topics: TopicClient::new(channel.clone()),
            queues: QueueClient::new(channel.clone()),
            secrets: SecretClient::new(channel.clone()),
            storage: StorageClient::new(channel.clone()),
            documents: DocumentClient::new(channel),
        }
    }

    /// Clients backed by a QUIC connection to the configured platform.
    ///
    /// The connection is opened lazily on the first request.
    pub fn connect(config: &FaasConfig) -> Result<Self, ResourceError> {
        let client = PlatformClient::new(config.client_config())?;
        Ok(Self::with_client(
            Arc::new(client),
            config.request_timeout_ms,
        ))
    }

    /// Clients sharing an existing platform connection.
    pub fn with_client(client: Arc<PlatformClient>, timeout_ms: u64) -> Self {
        Self::new(ResourceChannel::new(client).with_timeout_ms(timeout_ms))
    }

    pub fn key_value(&self) -> &KeyValueClient {
        &self.kv
    }

    pub fn topics(&self) -> &TopicClient {
        &self.topics
    }

    pub fn queues(&self) -> &QueueClient {
        &self.queues
    }

    pub fn secrets(&self) -> &SecretClient {
        &self.secrets
    }

    pub fn storage(&self) -> &StorageClient {
        &self.storage
    }

    pub fn documents(&self) -> &DocumentClient {
        &self.documents
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::sync::Mutex;

    use super::*;

    type Responder =
        Box<dyn Fn(&resource_request::Request) -> resource_response::Response + Send + Sync>;

    /// In-memory transport that records requests and answers from a closure.
    pub struct MockTransport {
        requests: Mutex<Vec<resource_request::Request>>,
        responder: Responder,
    }

    impl MockTransport {
        pub fn new<F>(responder: F) -> Arc<Self>
        where
            F: Fn(&resource_request::Request) -> resource_response::Response
                + Send
                + Sync
                + 'static,
        {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                responder: Box::new(responder),
            })
        }

        pub fn requests(&self) -> Vec<resource_request::Request> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ResourceTransport for MockTransport {
        async fn call(&self, request: ResourceRequest) -> Result<ResourceResponse, ResourceError> {
            let inner = request.request.expect("request without body");
            let response = (self.responder)(&inner);
            self.requests.lock().unwrap().push(inner);
            Ok(response.into())
        }
    }

    pub fn channel(transport: &Arc<MockTransport>) -> ResourceChannel {
        ResourceChannel::new(transport.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockTransport, channel};
    use super::*;
    use faaslink_protocol::resource_proto::{Ack, ErrorResponse, KvDeleteRequest, StatusCode};

    struct SlowTransport;

    #[async_trait]
    impl ResourceTransport for SlowTransport {
        async fn call(&self, _request: ResourceRequest) -> Result<ResourceResponse, ResourceError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(ResourceResponse::default())
        }
    }

    fn delete_request() -> resource_request::Request {
        resource_request::Request::KvDelete(KvDeleteRequest {
            store: "s".to_string(),
            key: "k".to_string(),
        })
    }

    #[tokio::test]
    async fn test_error_reply_becomes_typed_error() {
        let transport = MockTransport::new(|_| {
            resource_response::Response::Error(ErrorResponse::new(
                StatusCode::PermissionDenied,
                "no access",
            ))
        });
        let err = channel(&transport)
            .call(delete_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::PermissionDenied(ref m) if m == "no access"));
    }

    #[tokio::test]
    async fn test_success_reply_passes_through() {
        let transport = MockTransport::new(|_| resource_response::Response::KvDelete(Ack {}));
        let response = channel(&transport).call(delete_request()).await.unwrap();
        assert!(matches!(response, resource_response::Response::KvDelete(_)));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let channel = ResourceChannel::new(Arc::new(SlowTransport)).with_timeout_ms(50);
        let err = channel.call(delete_request()).await.unwrap_err();
        assert!(matches!(err, ResourceError::Timeout(50)));
    }

    #[tokio::test]
    async fn test_resources_share_one_transport() {
        let transport = MockTransport::new(|request| match request {
            resource_request::Request::KvDelete(_) => resource_response::Response::KvDelete(Ack {}),
            _ => resource_response::Response::StorageDelete(Ack {}),
        });
        let resources = Resources::new(channel(&transport));
        resources.key_value().delete("s", "k").await.unwrap();
        resources.storage().delete("b", "k").await.unwrap();
        assert_eq!(transport.requests().len(), 2);
    }
}
