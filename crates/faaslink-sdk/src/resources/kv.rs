// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Key-value stores.

use faaslink_protocol::resource_proto::{
    KvDeleteRequest, KvGetRequest, KvSetRequest, resource_request, resource_response,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::{ResourceChannel, unexpected};
use crate::error::ResourceError;

/// Client for named key-value stores. Values are JSON.
#[derive(Clone)]
pub struct KeyValueClient {
    channel: ResourceChannel,
}

impl KeyValueClient {
    pub fn new(channel: ResourceChannel) -> Self {
        Self { channel }
    }

    /// Fetch and deserialize a value; `None` when the key is absent.
    pub async fn get<T: DeserializeOwned>(
        &self,
        store: &str,
        key: &str,
    ) -> Result<Option<T>, ResourceError> {
        match self.get_raw(store, key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_raw(&self, store: &str, key: &str) -> Result<Option<Vec<u8>>, ResourceError> {
        let request = resource_request::Request::KvGet(KvGetRequest {
            store: store.to_string(),
            key: key.to_string(),
        });

        match self.channel.call(request).await {
            Ok(resource_response::Response::KvGet(resp)) if resp.found => Ok(Some(resp.value)),
            Ok(resource_response::Response::KvGet(_)) => Ok(None),
            Err(ResourceError::NotFound(_)) => Ok(None),
            Ok(_) => Err(unexpected("KvGetResponse")),
            Err(e) => Err(e),
        }
    }

    pub async fn set<T: Serialize + ?Sized>(
        &self,
        store: &str,
        key: &str,
        value: &T,
    ) -> Result<(), ResourceError> {
        self.set_raw(store, key, serde_json::to_vec(value)?).await
    }

    #[instrument(skip(self, value), fields(len = value.len()))]
    pub async fn set_raw(
        &self,
        store: &str,
        key: &str,
        value: Vec<u8>,
    ) -> Result<(), ResourceError> {
        let request = resource_request::Request::KvSet(KvSetRequest {
            store: store.to_string(),
            key: key.to_string(),
            value,
        });

        match self.channel.call(request).await? {
            resource_response::Response::KvSet(_) => Ok(()),
            _ => Err(unexpected("KvSet ack")),
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, store: &str, key: &str) -> Result<(), ResourceError> {
        let request = resource_request::Request::KvDelete(KvDeleteRequest {
            store: store.to_string(),
            key: key.to_string(),
        });

        match self.channel.call(request).await? {
            resource_response::Response::KvDelete(_) => Ok(()),
            _ => Err(unexpected("KvDelete ack")),
        }
    }
}
