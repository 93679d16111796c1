// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Task queues: send, lease, complete.

use faaslink_protocol::resource_proto::{
    self as proto, QueueCompleteRequest, QueueReceiveRequest, QueueSendRequest, resource_request,
    resource_response,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{instrument, warn};

use super::{ResourceChannel, unexpected};
use crate::error::ResourceError;

/// Task to enqueue.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: String,
    pub payload_type: String,
    pub payload: Vec<u8>,
}

impl Task {
    pub fn new(id: impl Into<String>, payload_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            payload_type: payload_type.into(),
            payload,
        }
    }

    pub fn json<T: Serialize + ?Sized>(
        id: impl Into<String>,
        value: &T,
    ) -> Result<Self, ResourceError> {
        let payload = serde_json::to_vec(value)?;
        Ok(Self::new(id, "application/json", payload))
    }
}

impl From<proto::QueueTask> for Task {
    fn from(task: proto::QueueTask) -> Self {
        Self {
            id: task.id,
            payload_type: task.payload_type,
            payload: task.payload,
        }
    }
}

impl From<Task> for proto::QueueTask {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            payload_type: task.payload_type,
            payload: task.payload,
        }
    }
}

/// Task the queue refused, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedTask {
    pub task: Option<Task>,
    pub message: String,
}

/// Task leased from a queue. Call [`QueueClient::complete`] with its
/// `lease_id` once handled.
#[derive(Debug, Clone, PartialEq)]
pub struct LeasedTask {
    pub id: String,
    pub lease_id: String,
    pub payload_type: String,
    pub payload: Vec<u8>,
}

impl LeasedTask {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ResourceError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

#[derive(Clone)]
pub struct QueueClient {
    channel: ResourceChannel,
}

impl QueueClient {
    pub fn new(channel: ResourceChannel) -> Self {
        Self { channel }
    }

    /// Enqueue `tasks`. Returns the ones that were rejected.
    #[instrument(skip(self, tasks), fields(count = tasks.len()))]
    pub async fn send(
        &self,
        queue: &str,
        tasks: Vec<Task>,
    ) -> Result<Vec<FailedTask>, ResourceError> {
        let request = resource_request::Request::QueueSend(QueueSendRequest {
            queue: queue.to_string(),
            tasks: tasks.into_iter().map(Into::into).collect(),
        });

        match self.channel.call(request).await? {
            resource_response::Response::QueueSend(resp) => {
                if !resp.failed_tasks.is_empty() {
                    warn!(failed = resp.failed_tasks.len(), "queue rejected tasks");
                }
                Ok(resp
                    .failed_tasks
                    .into_iter()
                    .map(|f| FailedTask {
                        task: f.task.map(Task::from),
                        message: f.message,
                    })
                    .collect())
            }
            _ => Err(unexpected("QueueSendResponse")),
        }
    }

    /// Lease up to `depth` tasks.
    #[instrument(skip(self))]
    pub async fn receive(&self, queue: &str, depth: u32) -> Result<Vec<LeasedTask>, ResourceError> {
        let request = resource_request::Request::QueueReceive(QueueReceiveRequest {
            queue: queue.to_string(),
            depth,
        });

        match self.channel.call(request).await? {
            resource_response::Response::QueueReceive(resp) => Ok(resp
                .tasks
                .into_iter()
                .map(|t| LeasedTask {
                    id: t.id,
                    lease_id: t.lease_id,
                    payload_type: t.payload_type,
                    payload: t.payload,
                })
                .collect()),
            _ => Err(unexpected("QueueReceiveResponse")),
        }
    }

    /// Acknowledge a leased task so it is not redelivered.
    #[instrument(skip(self))]
    pub async fn complete(&self, queue: &str, lease_id: &str) -> Result<(), ResourceError> {
        let request = resource_request::Request::QueueComplete(QueueCompleteRequest {
            queue: queue.to_string(),
            lease_id: lease_id.to_string(),
        });

        match self.channel.call(request).await? {
            resource_response::Response::QueueComplete(_) => Ok(()),
            _ => Err(unexpected("QueueComplete ack")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::mock::{MockTransport, channel};
    use faaslink_protocol::resource_proto::{Ack, QueueReceiveResponse, QueueSendResponse};

    #[tokio::test]
    async fn test_send_reports_rejected_tasks() {
        let transport = MockTransport::new(|request| match request {
            resource_request::Request::QueueSend(send) => {
                resource_response::Response::QueueSend(QueueSendResponse {
                    failed_tasks: send
                        .tasks
                        .iter()
                        .filter(|t| t.payload.is_empty())
                        .map(|t| proto::FailedTask {
                            task: Some(t.clone()),
                            message: "empty payload".to_string(),
                        })
                        .collect(),
                })
            }
            _ => resource_response::Response::QueueComplete(Ack {}),
        });
        let queues = QueueClient::new(channel(&transport));

        let failed = queues
            .send(
                "emails",
                vec![
                    Task::json("t1", &serde_json::json!({"to": "a@example.com"})).unwrap(),
                    Task::new("t2", "text/plain", Vec::new()),
                ],
            )
            .await
            .unwrap();

        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].task.as_ref().unwrap().id, "t2");
        assert_eq!(failed[0].message, "empty payload");
    }

    #[tokio::test]
    async fn test_receive_then_complete() {
        let transport = MockTransport::new(|request| match request {
            resource_request::Request::QueueReceive(receive) => {
                resource_response::Response::QueueReceive(QueueReceiveResponse {
                    tasks: (0..receive.depth)
                        .map(|i| proto::LeasedTask {
                            id: format!("t{}", i),
                            lease_id: format!("lease-{}", i),
                            payload_type: "application/json".to_string(),
                            payload: format!(r#"{{"n":{}}}"#, i).into_bytes(),
                        })
                        .collect(),
                })
            }
            _ => resource_response::Response::QueueComplete(Ack {}),
        });
        let queues = QueueClient::new(channel(&transport));

        let leased = queues.receive("emails", 2).await.unwrap();
        assert_eq!(leased.len(), 2);
        let body: serde_json::Value = leased[1].json().unwrap();
        assert_eq!(body["n"], 1);

        queues
            .complete("emails", &leased[0].lease_id)
            .await
            .unwrap();
        match &transport.requests()[1] {
            resource_request::Request::QueueComplete(complete) => {
                assert_eq!(complete.lease_id, "lease-0");
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }
}
