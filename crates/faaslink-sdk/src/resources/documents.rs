// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Document collections. Documents are JSON.

use faaslink_protocol::resource_proto::{
    DocumentKey, DocumentSetRequest, resource_request, resource_response,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::{ResourceChannel, unexpected};
use crate::error::ResourceError;

#[derive(Clone)]
pub struct DocumentClient {
    channel: ResourceChannel,
}

fn key(collection: &str, id: &str) -> DocumentKey {
    DocumentKey {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}

impl DocumentClient {
    pub fn new(channel: ResourceChannel) -> Self {
        Self { channel }
    }

    /// Fetch a document. A missing document is [`ResourceError::NotFound`].
    pub async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<T, ResourceError> {
        let content = self.get_raw(collection, id).await?;
        Ok(serde_json::from_slice(&content)?)
    }

    #[instrument(skip(self))]
    pub async fn get_raw(&self, collection: &str, id: &str) -> Result<Vec<u8>, ResourceError> {
        let request = resource_request::Request::DocumentGet(key(collection, id));

        match self.channel.call(request).await? {
            resource_response::Response::DocumentGet(resp) => Ok(resp.content),
            _ => Err(unexpected("DocumentGetResponse")),
        }
    }

    /// Create or replace a document.
    #[instrument(skip(self, document))]
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        document: &T,
    ) -> Result<(), ResourceError> {
        let request = resource_request::Request::DocumentSet(DocumentSetRequest {
            key: Some(key(collection, id)),
            content: serde_json::to_vec(document)?,
        });

        match self.channel.call(request).await? {
            resource_response::Response::DocumentSet(_) => Ok(()),
            _ => Err(unexpected("DocumentSet ack")),
        }
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), ResourceError> {
        let request = resource_request::Request::DocumentDelete(key(collection, id));

        match self.channel.call(request).await? {
            resource_response::Response::DocumentDelete(_) => Ok(()),
            _ => Err(unexpected("DocumentDelete ack")),
        }
    }
}
