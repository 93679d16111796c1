// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Trigger stream driver.
//!
//! One task owns the stream and drives the read loop:
//!
//! ```text
//! Disconnected --send init--> Streaming --StreamEnd / EOF / shutdown / error--> Completed
//! ```
//!
//! Triggers are processed one at a time inside the loop and every reply is
//! tagged with the id of the message it answers. The outbound half is closed
//! with a `StreamEnd` frame on every exit path.

use std::sync::Arc;

use faaslink_protocol::faas_proto::{ClientMessage, ServerMessage, server_message};
use faaslink_protocol::{FrameError, FrameReader, FrameWriter, MessageType};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::processor::{TriggerKind, TriggerProcessor};

/// Lifecycle of a trigger stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Streaming,
    Completed,
}

/// Drives a single trigger stream to completion.
pub struct StreamDriver {
    processor: Arc<TriggerProcessor>,
    state: watch::Sender<StreamState>,
}

impl StreamDriver {
    pub fn new(processor: Arc<TriggerProcessor>) -> Self {
        let (state, _) = watch::channel(StreamState::Disconnected);
        Self { processor, state }
    }

    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    /// Run the stream until the platform ends it, the transport fails or
    /// `shutdown` is cancelled.
    ///
    /// Shutdown and a platform-side close return `Ok(())`; transport failures
    /// return the error. Per-trigger failures never end the stream.
    #[instrument(skip_all)]
    pub async fn run<R, W>(&self, reader: R, writer: W, shutdown: CancellationToken) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let mut reader = FrameReader::new(reader);
        let mut writer = FrameWriter::new(writer);

        let result = self.drive(&mut reader, &mut writer, &shutdown).await;

        if let Err(e) = writer.close().await {
            debug!(error = %e, "trigger stream already closed");
        }
        self.state.send_replace(StreamState::Completed);

        match &result {
            Ok(()) => info!("trigger stream completed"),
            Err(e) => error!(error = %e, "trigger stream failed"),
        }
        result
    }

    async fn drive<R, W>(
        &self,
        reader: &mut FrameReader<R>,
        writer: &mut FrameWriter<W>,
        shutdown: &CancellationToken,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let init_id = Uuid::new_v4().to_string();
        let init = ClientMessage::init(init_id.as_str());
        writer.send(MessageType::StreamStart, &init).await?;
        self.state.send_replace(StreamState::Streaming);
        info!(init_id = %init_id, "trigger stream opened");

        loop {
            let frame = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown requested, closing trigger stream");
                    return Ok(());
                }
                frame = reader.read_frame() => frame,
            };

            let frame = match frame {
                Ok(frame) => frame,
                Err(FrameError::ConnectionClosed) => {
                    info!("platform closed the trigger stream");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            match frame.message_type {
                MessageType::StreamData => match frame.decode::<ServerMessage>() {
                    Ok(message) => self.dispatch(message, writer).await?,
                    Err(e) => warn!(error = %e, "dropping undecodable server message"),
                },
                MessageType::StreamEnd => {
                    info!("platform ended the trigger stream");
                    return Ok(());
                }
                other => warn!(message_type = ?other, "ignoring unexpected frame"),
            }
        }
    }

    async fn dispatch<W>(&self, message: ServerMessage, writer: &mut FrameWriter<W>) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let ServerMessage { id, content } = message;

        match content {
            Some(server_message::Content::InitResponse(_)) => {
                debug!(id = %id, "platform acknowledged init");
            }
            Some(server_message::Content::TriggerRequest(request)) => {
                let kind = TriggerKind::of(&request);
                let response = match self.processor.process(request).await {
                    Ok(response) => response,
                    Err(e) => {
                        warn!(
                            id = %id,
                            error = %e,
                            "trigger failed, replying with failure response"
                        );
                        kind.failure_response()
                    }
                };
                writer
                    .send(
                        MessageType::StreamData,
                        &ClientMessage::trigger_response(id, response),
                    )
                    .await?;
            }
            None => warn!(id = %id, "ignoring server message of unknown kind"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use faaslink_protocol::faas_proto::{
        HttpTriggerContext, TopicTriggerContext, TriggerRequest, client_message, trigger_request,
        trigger_response,
    };
    use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};

    use crate::context::{EventContext, HttpContext};
    use crate::error::{BoxError, FaasError};
    use crate::middleware::Pipeline;

    type PlatformSide = (
        FrameReader<ReadHalf<DuplexStream>>,
        FrameWriter<WriteHalf<DuplexStream>>,
    );

    fn processor() -> Arc<TriggerProcessor> {
        let mut http = Pipeline::new();
        http.set_handler(|mut ctx: HttpContext| async move {
            let path = ctx.request().path().to_string();
            ctx.response_mut().set_status(201).set_body(path);
            Ok::<_, BoxError>(Some(ctx))
        })
        .unwrap();
        Arc::new(TriggerProcessor::new(http, Pipeline::<EventContext>::new()))
    }

    fn start(
        driver: Arc<StreamDriver>,
        shutdown: CancellationToken,
    ) -> (tokio::task::JoinHandle<Result<()>>, PlatformSide) {
        let (function_side, platform_side) = tokio::io::duplex(64 * 1024);
        let (reader, writer) = tokio::io::split(function_side);
        let handle = tokio::spawn(async move { driver.run(reader, writer, shutdown).await });

        let (reader, writer) = tokio::io::split(platform_side);
        (handle, (FrameReader::new(reader), FrameWriter::new(writer)))
    }

    fn http_trigger(id: &str, path: &str) -> ServerMessage {
        ServerMessage::trigger_request(
            id,
            TriggerRequest {
                data: Vec::new(),
                mime_type: String::new(),
                context: Some(trigger_request::Context::Http(HttpTriggerContext {
                    method: "GET".to_string(),
                    path: path.to_string(),
                    headers: HashMap::new(),
                    query_params: HashMap::new(),
                })),
            },
        )
    }

    async fn expect_init(reader: &mut FrameReader<ReadHalf<DuplexStream>>) {
        let frame = reader.read_frame().await.unwrap();
        let init: ClientMessage = frame.decode_as(MessageType::StreamStart).unwrap();
        assert!(matches!(
            init.content,
            Some(client_message::Content::InitRequest(_))
        ));
        assert!(!init.id.is_empty());
    }

    async fn read_reply(
        reader: &mut FrameReader<ReadHalf<DuplexStream>>,
    ) -> (String, faaslink_protocol::faas_proto::TriggerResponse) {
        let frame = reader.read_frame().await.unwrap();
        let reply: ClientMessage = frame.decode_as(MessageType::StreamData).unwrap();
        match reply.content {
            Some(client_message::Content::TriggerResponse(response)) => (reply.id, response),
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_replies_are_tagged_with_trigger_id() {
        let driver = Arc::new(StreamDriver::new(processor()));
        assert_eq!(driver.state(), StreamState::Disconnected);
        let (handle, (mut reader, mut writer)) = start(driver.clone(), CancellationToken::new());

        expect_init(&mut reader).await;
        let ack = ServerMessage::init_response("init");
        writer.send(MessageType::StreamData, &ack).await.unwrap();
        driver
            .subscribe()
            .wait_for(|state| *state == StreamState::Streaming)
            .await
            .unwrap();

        for (id, path) in [("t-1", "/first"), ("t-2", "/second")] {
            writer
                .send(MessageType::StreamData, &http_trigger(id, path))
                .await
                .unwrap();
            let (reply_id, response) = read_reply(&mut reader).await;
            assert_eq!(reply_id, id);
            assert_eq!(response.data, path.as_bytes().to_vec());
            match response.context {
                Some(trigger_response::Context::Http(http)) => assert_eq!(http.status, 201),
                other => panic!("unexpected context: {:?}", other),
            }
        }

        writer.close().await.unwrap();
        handle.await.unwrap().unwrap();

        let end = reader.read_frame().await.unwrap();
        assert_eq!(end.message_type, MessageType::StreamEnd);
        assert_eq!(driver.state(), StreamState::Completed);
    }

    #[tokio::test]
    async fn test_failed_trigger_is_still_acknowledged() {
        let driver = Arc::new(StreamDriver::new(processor()));
        let (handle, (mut reader, mut writer)) = start(driver, CancellationToken::new());
        expect_init(&mut reader).await;

        // No event pipeline registered.
        let event = ServerMessage::trigger_request(
            "evt-1",
            TriggerRequest {
                data: b"{}".to_vec(),
                mime_type: "application/json".to_string(),
                context: Some(trigger_request::Context::Topic(TopicTriggerContext {
                    topic: "orders".to_string(),
                })),
            },
        );
        writer.send(MessageType::StreamData, &event).await.unwrap();

        let (reply_id, response) = read_reply(&mut reader).await;
        assert_eq!(reply_id, "evt-1");
        match response.context {
            Some(trigger_response::Context::Topic(topic)) => assert!(!topic.success),
            other => panic!("unexpected context: {:?}", other),
        }

        // The stream keeps serving.
        writer
            .send(MessageType::StreamData, &http_trigger("t-3", "/after"))
            .await
            .unwrap();
        let (reply_id, _) = read_reply(&mut reader).await;
        assert_eq!(reply_id, "t-3");

        writer.close().await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_unknown_message_is_ignored() {
        let driver = Arc::new(StreamDriver::new(processor()));
        let (handle, (mut reader, mut writer)) = start(driver, CancellationToken::new());
        expect_init(&mut reader).await;

        let unknown = ServerMessage {
            id: "odd".to_string(),
            content: None,
        };
        writer
            .send(MessageType::StreamData, &unknown)
            .await
            .unwrap();
        writer
            .send(MessageType::StreamData, &http_trigger("t-4", "/x"))
            .await
            .unwrap();

        let (reply_id, _) = read_reply(&mut reader).await;
        assert_eq!(reply_id, "t-4");

        writer.close().await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_closes_outbound_stream() {
        let driver = Arc::new(StreamDriver::new(processor()));
        let shutdown = CancellationToken::new();
        let (handle, (mut reader, _writer)) = start(driver.clone(), shutdown.clone());
        expect_init(&mut reader).await;

        shutdown.cancel();
        handle.await.unwrap().unwrap();

        let end = reader.read_frame().await.unwrap();
        assert_eq!(end.message_type, MessageType::StreamEnd);
        assert!(matches!(
            reader.read_frame().await,
            Err(FrameError::ConnectionClosed)
        ));
        assert_eq!(driver.state(), StreamState::Completed);
    }

    #[tokio::test]
    async fn test_platform_disconnect_completes_stream() {
        let driver = Arc::new(StreamDriver::new(processor()));
        let (handle, (mut reader, writer)) = start(driver.clone(), CancellationToken::new());
        expect_init(&mut reader).await;

        let mut raw = writer.into_inner();
        raw.shutdown().await.unwrap();

        handle.await.unwrap().unwrap();
        assert_eq!(driver.state(), StreamState::Completed);
    }

    #[tokio::test]
    async fn test_corrupt_frame_is_a_transport_error() {
        let driver = Arc::new(StreamDriver::new(processor()));
        let (handle, (mut reader, writer)) = start(driver.clone(), CancellationToken::new());
        expect_init(&mut reader).await;

        let mut raw = writer.into_inner();
        // Zero-length payload with message type 0xFFFF.
        raw.write_all(&[0, 0, 0, 0, 0xFF, 0xFF]).await.unwrap();
        raw.flush().await.unwrap();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(FaasError::Transport(_))));
        assert_eq!(driver.state(), StreamState::Completed);

        let end = reader.read_frame().await.unwrap();
        assert_eq!(end.message_type, MessageType::StreamEnd);
    }
}
