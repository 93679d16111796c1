// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! End-to-end tests against a loopback QUIC platform.
//!
//! A `PlatformServer` plays the platform: it accepts the function's trigger
//! stream and answers resource RPCs from an in-memory store.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use faaslink_protocol::faas_proto::{
    ClientMessage, HttpTriggerContext, ServerMessage, TopicTriggerContext, TriggerRequest,
    TriggerResponse, client_message, trigger_request, trigger_response,
};
use faaslink_protocol::resource_proto::{
    Ack, ErrorResponse, KvGetResponse, ResourceRequest, ResourceResponse, StatusCode,
    resource_request, resource_response,
};
use faaslink_protocol::{
    ConnectionHandler, FrameReader, FrameWriter, MessageType, PlatformClient, PlatformServer,
    StreamHandler,
};
use faaslink_sdk::{
    BoxError, CancellationToken, EventContext, Faas, FaasConfig, HttpContext, Resources,
};
use tokio::sync::mpsc;

fn spawn_server<H, Fut>(handler: H) -> (Arc<PlatformServer>, SocketAddr)
where
    H: Fn(ConnectionHandler) -> Fut + Send + Sync + Clone + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let bind = "127.0.0.1:0".parse().unwrap();
    let server = Arc::new(PlatformServer::localhost(bind).unwrap());
    let addr = server.local_addr().unwrap();
    let runner = server.clone();
    tokio::spawn(async move { runner.run(handler).await.unwrap() });
    (server, addr)
}

fn http_trigger(path: &str) -> TriggerRequest {
    TriggerRequest {
        data: Vec::new(),
        mime_type: String::new(),
        context: Some(trigger_request::Context::Http(HttpTriggerContext {
            method: "GET".to_string(),
            path: path.to_string(),
            headers: HashMap::new(),
            query_params: HashMap::new(),
        })),
    }
}

fn topic_trigger(topic: &str) -> TriggerRequest {
    TriggerRequest {
        data: b"{}".to_vec(),
        mime_type: "application/json".to_string(),
        context: Some(trigger_request::Context::Topic(TopicTriggerContext {
            topic: topic.to_string(),
        })),
    }
}

/// Platform side of one trigger stream: handshake, send `triggers`, collect
/// the replies, then end the stream.
async fn drive_trigger_stream(
    conn: ConnectionHandler,
    triggers: Vec<(String, TriggerRequest)>,
    replies: mpsc::Sender<Vec<(String, TriggerResponse)>>,
) {
    let Ok((send, recv)) = conn.accept_bi().await else {
        return;
    };
    let mut reader = FrameReader::new(recv);
    let mut writer = FrameWriter::new(send);

    let init: ClientMessage = reader
        .read_frame()
        .await
        .unwrap()
        .decode_as(MessageType::StreamStart)
        .unwrap();
    let ack = ServerMessage::init_response(init.id);
    writer.send(MessageType::StreamData, &ack).await.unwrap();

    let mut collected = Vec::new();
    for (id, trigger) in triggers {
        let message = ServerMessage::trigger_request(id, trigger);
        writer
            .send(MessageType::StreamData, &message)
            .await
            .unwrap();
        let reply: ClientMessage = reader
            .read_frame()
            .await
            .unwrap()
            .decode_as(MessageType::StreamData)
            .unwrap();
        match reply.content {
            Some(client_message::Content::TriggerResponse(response)) => {
                collected.push((reply.id, response))
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }
    replies.send(collected).await.unwrap();

    writer.close().await.unwrap();
    // Hold the connection until the function hangs up.
    while reader.read_frame().await.is_ok() {}
}

#[tokio::test]
async fn test_function_serves_triggers_over_quic() {
    let (tx, mut rx) = mpsc::channel(1);
    let (server, addr) = spawn_server(move |conn: ConnectionHandler| {
        let tx = tx.clone();
        async move {
            let triggers = vec![
                ("http-1".to_string(), http_trigger("/hello/ada")),
                ("topic-1".to_string(), topic_trigger("orders")),
            ];
            drive_trigger_stream(conn, triggers, tx).await;
        }
    });

    let mut router = faaslink_sdk::Router::new();
    router
        .get("/hello/{name}", |mut ctx: HttpContext| async move {
            let name = ctx.request().path_param("name").unwrap_or("?");
            let greeting = format!("Hello, {}!", name);
            ctx.response_mut().set_text(greeting);
            Ok::<_, BoxError>(Some(ctx))
        })
        .unwrap();

    let mut faas = Faas::new(FaasConfig::localhost().with_service_addr(addr));
    faas.http_middleware(router);
    faas.event_handler(|ctx: EventContext| async move { Ok::<_, BoxError>(Some(ctx)) })
        .unwrap();

    tokio::time::timeout(
        Duration::from_secs(10),
        faas.start_with_shutdown(CancellationToken::new()),
    )
    .await
    .expect("function did not finish")
    .unwrap();

    let replies = rx.recv().await.unwrap();
    assert_eq!(replies.len(), 2);

    let (id, response) = &replies[0];
    assert_eq!(id, "http-1");
    assert_eq!(response.data, b"Hello, ada!".to_vec());
    match &response.context {
        Some(trigger_response::Context::Http(http)) => {
            assert_eq!(http.status, 200);
            assert_eq!(
                http.headers["Content-Type"].value,
                vec!["text/plain".to_string()]
            );
        }
        other => panic!("unexpected context: {:?}", other),
    }

    let (id, response) = &replies[1];
    assert_eq!(id, "topic-1");
    assert!(matches!(
        response.context,
        Some(trigger_response::Context::Topic(ref t)) if t.success
    ));

    server.close();
}

#[tokio::test]
async fn test_shutdown_token_stops_the_function() {
    let (server, addr) = spawn_server(|conn: ConnectionHandler| async move {
        let Ok((send, recv)) = conn.accept_bi().await else {
            return;
        };
        let mut reader = FrameReader::new(recv);
        let _writer = FrameWriter::new(send);
        // Read the init frame and wait for the function to hang up.
        while reader.read_frame().await.is_ok() {}
    });

    let mut faas = Faas::new(FaasConfig::localhost().with_service_addr(addr));
    faas.http_handler(|ctx: HttpContext| async move { Ok::<_, BoxError>(Some(ctx)) })
        .unwrap();

    let shutdown = CancellationToken::new();
    let running = tokio::spawn(faas.start_with_shutdown(shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(10), running)
        .await
        .expect("function ignored shutdown")
        .unwrap()
        .unwrap();

    server.close();
}

fn kv_reply(store: &Mutex<HashMap<String, Vec<u8>>>, request: ResourceRequest) -> ResourceResponse {
    let mut store = store.lock().unwrap();
    let response = match request.request {
        Some(resource_request::Request::KvSet(set)) => {
            store.insert(format!("{}/{}", set.store, set.key), set.value);
            resource_response::Response::KvSet(Ack {})
        }
        Some(resource_request::Request::KvGet(get)) => {
            match store.get(&format!("{}/{}", get.store, get.key)) {
                Some(value) => resource_response::Response::KvGet(KvGetResponse {
                    found: true,
                    value: value.clone(),
                }),
                None => resource_response::Response::KvGet(KvGetResponse::default()),
            }
        }
        _ => resource_response::Response::Error(ErrorResponse::new(
            StatusCode::InvalidArgument,
            "unsupported resource",
        )),
    };
    response.into()
}

#[tokio::test]
async fn test_resources_over_quic() {
    let store: Arc<Mutex<HashMap<String, Vec<u8>>>> = Arc::default();
    let (server, addr) = spawn_server(move |conn: ConnectionHandler| {
        let store = store.clone();
        async move {
            conn.run(move |mut stream: StreamHandler| {
                let store = store.clone();
                async move {
                    let Ok(frame) = stream.read_frame().await else {
                        return;
                    };
                    let _ = stream
                        .respond(frame, |req: ResourceRequest| async move {
                            Ok::<_, faaslink_protocol::ServerError>(kv_reply(&store, req))
                        })
                        .await;
                }
            })
            .await;
        }
    });

    let client = Arc::new(PlatformClient::localhost(addr).unwrap());
    let resources = Resources::with_client(client.clone(), 5_000);

    let kv = resources.key_value();
    kv.set("profiles", "ada", &serde_json::json!({"lang": "en"}))
        .await
        .unwrap();
    let profile: Option<serde_json::Value> = kv.get("profiles", "ada").await.unwrap();
    assert_eq!(profile, Some(serde_json::json!({"lang": "en"})));
    let missing: Option<serde_json::Value> = kv.get("profiles", "bob").await.unwrap();
    assert!(missing.is_none());

    let err = resources.storage().read("b", "k").await.unwrap_err();
    assert!(matches!(
        err,
        faaslink_sdk::ResourceError::InvalidArgument(_)
    ));

    client.close().await;
    server.close();
}
