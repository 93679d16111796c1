// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Object storage.

use bytes::Bytes;
use faaslink_protocol::resource_proto::{
    StorageRequest, StorageWriteRequest, resource_request, resource_response,
};
use tracing::{Span, instrument};

use super::{ResourceChannel, unexpected};
use crate::error::ResourceError;

#[derive(Clone)]
pub struct StorageClient {
    channel: ResourceChannel,
}

impl StorageClient {
    pub fn new(channel: ResourceChannel) -> Self {
        Self { channel }
    }

    #[instrument(skip(self))]
    pub async fn read(&self, bucket: &str, key: &str) -> Result<Bytes, ResourceError> {
        let request = resource_request::Request::StorageRead(StorageRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });

        match self.channel.call(request).await? {
            resource_response::Response::StorageRead(resp) => Ok(Bytes::from(resp.body)),
            _ => Err(unexpected("StorageReadResponse")),
        }
    }

    #[instrument(skip(self, body), fields(len = tracing::field::Empty))]
    pub async fn write(
        &self,
        bucket: &str,
        key: &str,
        body: impl Into<Bytes>,
    ) -> Result<(), ResourceError> {
        let body: Bytes = body.into();
        Span::current().record("len", body.len());
        let request = resource_request::Request::StorageWrite(StorageWriteRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body: body.to_vec(),
        });

        match self.channel.call(request).await? {
            resource_response::Response::StorageWrite(_) => Ok(()),
            _ => Err(unexpected("StorageWrite ack")),
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, bucket: &str, key: &str) -> Result<(), ResourceError> {
        let request = resource_request::Request::StorageDelete(StorageRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });

        match self.channel.call(request).await? {
            resource_response::Response::StorageDelete(_) => Ok(()),
            _ => Err(unexpected("StorageDelete ack")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use crate::resources::mock::{MockTransport, channel};
    use faaslink_protocol::resource_proto::{Ack, ErrorResponse, StatusCode, StorageReadResponse};

    #[tokio::test]
    async fn test_write_read_delete() {
        let objects: Mutex<HashMap<(String, String), Vec<u8>>> = Mutex::new(HashMap::new());
        let transport = MockTransport::new(move |request| {
            let mut objects = objects.lock().unwrap();
            match request {
                resource_request::Request::StorageWrite(w) => {
                    objects.insert((w.bucket.clone(), w.key.clone()), w.body.clone());
                    resource_response::Response::StorageWrite(Ack {})
                }
                resource_request::Request::StorageRead(r) => {
                    match objects.get(&(r.bucket.clone(), r.key.clone())) {
                        Some(body) => resource_response::Response::StorageRead(StorageReadResponse {
                            body: body.clone(),
                        }),
                        None => resource_response::Response::Error(ErrorResponse::new(
                            StatusCode::NotFound,
                            "no such object",
                        )),
                    }
                }
                resource_request::Request::StorageDelete(d) => {
                    objects.remove(&(d.bucket.clone(), d.key.clone()));
                    resource_response::Response::StorageDelete(Ack {})
                }
                _ => resource_response::Response::Error(ErrorResponse::new(
                    StatusCode::InvalidArgument,
                    "unsupported",
                )),
            }
        });
        let storage = StorageClient::new(channel(&transport));

        storage
            .write("reports", "2025/q1.csv", "a,b\n1,2\n")
            .await
            .unwrap();
        let body = storage.read("reports", "2025/q1.csv").await.unwrap();
        assert_eq!(body.as_ref(), b"a,b\n1,2\n");

        storage.delete("reports", "2025/q1.csv").await.unwrap();
        let err = storage.read("reports", "2025/q1.csv").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_write_accepts_owned_and_shared_bodies() {
        let written: Arc<Mutex<Vec<Vec<u8>>>> = Arc::default();
        let sink = written.clone();
        let transport = MockTransport::new(move |request| match request {
            resource_request::Request::StorageWrite(w) => {
                sink.lock().unwrap().push(w.body.clone());
                resource_response::Response::StorageWrite(Ack {})
            }
            _ => resource_response::Response::Error(ErrorResponse::new(
                StatusCode::InvalidArgument,
                "unsupported",
            )),
        });
        let storage = StorageClient::new(channel(&transport));

        storage.write("b", "owned", vec![1u8, 2, 3]).await.unwrap();
        storage
            .write("b", "shared", Bytes::from_static(b"xyz"))
            .await
            .unwrap();
        storage.write("b", "empty", Vec::<u8>::new()).await.unwrap();

        let written = written.lock().unwrap();
        assert_eq!(*written, vec![vec![1, 2, 3], b"xyz".to_vec(), Vec::new()]);
    }
}
