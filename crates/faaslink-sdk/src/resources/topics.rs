// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Event publishing.

use std::time::Duration;

use faaslink_protocol::resource_proto::{
    TopicPublishRequest, resource_request, resource_response,
};
use serde::Serialize;
use tracing::instrument;

use super::{ResourceChannel, unexpected};
use crate::error::ResourceError;

#[derive(Clone)]
pub struct TopicClient {
    channel: ResourceChannel,
}

impl TopicClient {
    pub fn new(channel: ResourceChannel) -> Self {
        Self { channel }
    }

    /// Publish `payload` to `topic`, optionally delayed. Returns the event id.
    #[instrument(skip(self, payload), fields(len = payload.len()))]
    pub async fn publish(
        &self,
        topic: &str,
        payload_type: &str,
        payload: Vec<u8>,
        delay: Option<Duration>,
    ) -> Result<String, ResourceError> {
        let delay_ms = delay.map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        let request = resource_request::Request::TopicPublish(TopicPublishRequest {
            topic: topic.to_string(),
            payload_type: payload_type.to_string(),
            payload,
            delay_ms,
        });

        match self.channel.call(request).await? {
            resource_response::Response::TopicPublish(resp) => Ok(resp.id),
            _ => Err(unexpected("TopicPublishResponse")),
        }
    }

    /// Publish `value` as `application/json`.
    pub async fn publish_json<T: Serialize + ?Sized>(
        &self,
        topic: &str,
        value: &T,
        delay: Option<Duration>,
    ) -> Result<String, ResourceError> {
        let payload = serde_json::to_vec(value)?;
        self.publish(topic, "application/json", payload, delay)
            .await
    }
}
