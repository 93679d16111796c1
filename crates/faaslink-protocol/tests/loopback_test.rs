// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Client/server tests over a loopback QUIC connection.

use std::net::SocketAddr;
use std::sync::Arc;

use faaslink_protocol::resource_proto::{
    KvGetRequest, KvGetResponse, ResourceRequest, ResourceResponse, resource_request,
    resource_response,
};
use faaslink_protocol::{
    ClientError, ConnectionHandler, PlatformClient, PlatformServer, ServerError, StreamHandler,
};

async fn answer_kv(req: ResourceRequest) -> Result<ResourceResponse, ServerError> {
    match req.request {
        Some(resource_request::Request::KvGet(get)) if get.key == "alice" => {
            let entry = KvGetResponse {
                found: true,
                value: br#"{"name":"Alice"}"#.to_vec(),
            };
            let reply = resource_response::Response::KvGet(entry);
            Ok(ResourceResponse::from(reply))
        }
        _ => Err(ServerError::Handler("unsupported".to_string())),
    }
}

async fn spawn_kv_server() -> (Arc<PlatformServer>, SocketAddr) {
    let bind = "127.0.0.1:0".parse().unwrap();
    let server = Arc::new(PlatformServer::localhost(bind).unwrap());
    let addr = server.local_addr().unwrap();

    let runner = server.clone();
    tokio::spawn(async move {
        runner
            .run(|conn: ConnectionHandler| async move {
                conn.run(|mut stream: StreamHandler| async move {
                    let Ok(frame) = stream.read_frame().await else {
                        return;
                    };
                    let _ = stream.respond(frame, answer_kv).await;
                })
                .await;
            })
            .await
            .unwrap();
    });

    (server, addr)
}

fn kv_get(key: &str) -> ResourceRequest {
    resource_request::Request::KvGet(KvGetRequest {
        store: "profiles".to_string(),
        key: key.to_string(),
    })
    .into()
}

#[tokio::test]
async fn test_request_response_round_trip() {
    let (server, addr) = spawn_kv_server().await;
    let client = PlatformClient::localhost(addr).unwrap();

    let response: ResourceResponse = client.request(&kv_get("alice")).await.unwrap();
    match response.response {
        Some(resource_response::Response::KvGet(get)) => {
            assert!(get.found);
            assert_eq!(get.value, br#"{"name":"Alice"}"#.to_vec());
        }
        other => panic!("unexpected response: {:?}", other),
    }
    assert!(client.is_connected().await);

    client.close().await;
    server.close();
}

#[tokio::test]
async fn test_handler_failure_surfaces_as_rejected() {
    let (server, addr) = spawn_kv_server().await;
    let client = PlatformClient::localhost(addr).unwrap();

    let result: Result<ResourceResponse, ClientError> = client.request(&kv_get("bob")).await;
    assert!(matches!(result, Err(ClientError::Rejected)));

    client.close().await;
    server.close();
}
