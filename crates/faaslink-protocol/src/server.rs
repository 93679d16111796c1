// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Platform end of the QUIC connection.
//!
//! Functions dial in and open streams; the server hands each connection and
//! each stream to a caller-supplied closure. Local platform tooling and the
//! end-to-end tests use it to drive trigger streams and answer resource calls.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quinn::{Endpoint, Incoming, RecvStream, SendStream, ServerConfig, TransportConfig};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::frame::{Frame, FrameError, MessageType, read_frame, write_frame};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot bind UDP socket: {0}")]
    Bind(#[from] std::io::Error),

    #[error("function connection lost: {0}")]
    Connection(#[from] quinn::ConnectionError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("stream already finished: {0}")]
    ClosedStream(#[from] quinn::ClosedStream),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("resource handler failed: {0}")]
    Handler(String),
}

/// Certificate chain and private key served to functions.
type Identity = (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>);

#[derive(Debug, Clone)]
pub struct PlatformServerConfig {
    pub bind_addr: SocketAddr,
    /// PEM certificate chain.
    pub cert_pem: Vec<u8>,
    /// PEM private key.
    pub key_pem: Vec<u8>,
    /// Streams a single function may have open at once.
    pub max_bi_streams: u32,
    pub idle_timeout_ms: u64,
    /// 0 disables keep-alives.
    pub keep_alive_interval_ms: u64,
    /// 0 keeps the OS default.
    pub udp_receive_buffer_size: usize,
}

impl Default for PlatformServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 50051)),
            cert_pem: Vec::new(),
            key_pem: Vec::new(),
            max_bi_streams: 1_000,
            idle_timeout_ms: 600_000,
            keep_alive_interval_ms: 15_000,
            udp_receive_buffer_size: 2 * 1024 * 1024,
        }
    }
}

impl PlatformServerConfig {
    /// Transport tuning from the environment. Unset or unparsable variables
    /// keep their defaults.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `FAASLINK_QUIC_MAX_BI_STREAMS` | `max_bi_streams` |
    /// | `FAASLINK_QUIC_IDLE_TIMEOUT_MS` | `idle_timeout_ms` |
    /// | `FAASLINK_QUIC_KEEP_ALIVE_MS` | `keep_alive_interval_ms` |
    /// | `FAASLINK_QUIC_UDP_RECV_BUFFER` | `udp_receive_buffer_size` |
    pub fn from_env() -> Self {
        let mut config = Self::default();
        override_from_env("FAASLINK_QUIC_MAX_BI_STREAMS", &mut config.max_bi_streams);
        override_from_env("FAASLINK_QUIC_IDLE_TIMEOUT_MS", &mut config.idle_timeout_ms);
        override_from_env(
            "FAASLINK_QUIC_KEEP_ALIVE_MS",
            &mut config.keep_alive_interval_ms,
        );
        override_from_env(
            "FAASLINK_QUIC_UDP_RECV_BUFFER",
            &mut config.udp_receive_buffer_size,
        );
        config
    }

    fn identity(&self) -> Result<Identity, ServerError> {
        let chain = rustls_pemfile::certs(&mut self.cert_pem.as_slice())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ServerError::Tls(format!("unreadable certificate PEM: {}", e)))?;
        if chain.is_empty() {
            return Err(ServerError::Tls(
                "certificate PEM holds no certificate".to_string(),
            ));
        }
        let key = rustls_pemfile::private_key(&mut self.key_pem.as_slice())
            .map_err(|e| ServerError::Tls(format!("unreadable key PEM: {}", e)))?
            .ok_or_else(|| ServerError::Tls("key PEM holds no private key".to_string()))?;
        Ok((chain, key))
    }

    fn transport(&self) -> Result<TransportConfig, ServerError> {
        let mut transport = TransportConfig::default();
        let idle = Duration::from_millis(self.idle_timeout_ms)
            .try_into()
            .map_err(|e| ServerError::Tls(format!("idle timeout out of range: {}", e)))?;
        transport.max_idle_timeout(Some(idle));
        transport.max_concurrent_bidi_streams(self.max_bi_streams.into());
        let keep_alive = Duration::from_millis(self.keep_alive_interval_ms);
        transport.keep_alive_interval((!keep_alive.is_zero()).then_some(keep_alive));
        Ok(transport)
    }

    fn quic(&self) -> Result<ServerConfig, ServerError> {
        let (chain, key) = self.identity()?;
        let tls = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(chain, key)
            .map_err(|e| ServerError::Tls(e.to_string()))?;
        let crypto = quinn::crypto::rustls::QuicServerConfig::try_from(tls)
            .map_err(|e| ServerError::Tls(e.to_string()))?;

        let mut quic = ServerConfig::with_crypto(Arc::new(crypto));
        quic.transport_config(Arc::new(self.transport()?));
        Ok(quic)
    }

    fn udp_socket(&self) -> Result<std::net::UdpSocket, ServerError> {
        let domain = if self.bind_addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        if self.udp_receive_buffer_size > 0
            && let Err(e) = socket.set_recv_buffer_size(self.udp_receive_buffer_size)
        {
            warn!(
                size = self.udp_receive_buffer_size,
                error = %e,
                "UDP receive buffer not resized"
            );
        }
        socket.bind(&self.bind_addr.into())?;
        Ok(socket.into())
    }
}

fn override_from_env<T: std::str::FromStr>(var: &str, field: &mut T) {
    if let Some(value) = std::env::var(var).ok().and_then(|raw| raw.parse().ok()) {
        *field = value;
    }
}

pub struct PlatformServer {
    endpoint: Endpoint,
}

impl PlatformServer {
    pub fn new(config: PlatformServerConfig) -> Result<Self, ServerError> {
        let quic = config.quic()?;
        let runtime = quinn::default_runtime()
            .ok_or_else(|| ServerError::Bind(std::io::Error::other("no async runtime found")))?;
        let socket = runtime.wrap_udp_socket(config.udp_socket()?)?;
        let endpoint = Endpoint::new_with_abstract_socket(
            quinn::EndpointConfig::default(),
            Some(quic),
            socket,
            runtime,
        )?;

        info!(
            addr = %config.bind_addr,
            max_bi_streams = config.max_bi_streams,
            "platform listening"
        );
        Ok(Self { endpoint })
    }

    /// Listens on `bind_addr` with a fresh self-signed `localhost` certificate.
    pub fn localhost(bind_addr: SocketAddr) -> Result<Self, ServerError> {
        let issued = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
            .map_err(|e| ServerError::Tls(e.to_string()))?;
        Self::new(PlatformServerConfig {
            bind_addr,
            cert_pem: issued.cert.pem().into_bytes(),
            key_pem: issued.key_pair.serialize_pem().into_bytes(),
            ..PlatformServerConfig::from_env()
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.endpoint.local_addr()?)
    }

    pub async fn accept(&self) -> Option<Incoming> {
        self.endpoint.accept().await
    }

    /// Stops accepting and closes every open connection.
    pub fn close(&self) {
        self.endpoint.close(0u32.into(), b"platform closing");
    }

    /// Runs `on_connection` for every function that connects, until
    /// [`PlatformServer::close`].
    #[instrument(skip_all)]
    pub async fn run<H, Fut>(&self, on_connection: H) -> Result<(), ServerError>
    where
        H: Fn(ConnectionHandler) -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        while let Some(incoming) = self.accept().await {
            let on_connection = on_connection.clone();
            tokio::spawn(async move {
                let connection = match incoming.await {
                    Ok(connection) => connection,
                    Err(e) => {
                        warn!(error = %e, "function handshake failed");
                        return;
                    }
                };
                debug!(remote = %connection.remote_address(), "function connected");
                on_connection(ConnectionHandler::new(connection)).await;
            });
        }
        debug!("endpoint closed");
        Ok(())
    }
}

/// One connected function.
pub struct ConnectionHandler {
    connection: quinn::Connection,
}

impl ConnectionHandler {
    pub fn new(connection: quinn::Connection) -> Self {
        Self { connection }
    }

    pub fn remote_address(&self) -> SocketAddr {
        self.connection.remote_address()
    }

    /// Waits for the function to open its next stream.
    pub async fn accept_bi(&self) -> Result<(SendStream, RecvStream), ServerError> {
        Ok(self.connection.accept_bi().await?)
    }

    /// Runs `on_stream` for every stream the function opens, until the
    /// connection goes away.
    #[instrument(skip_all, fields(remote = %self.remote_address()))]
    pub async fn run<H, Fut>(&self, on_stream: H)
    where
        H: Fn(StreamHandler) -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        loop {
            let (send, recv) = match self.connection.accept_bi().await {
                Ok(halves) => halves,
                Err(
                    quinn::ConnectionError::ApplicationClosed(_)
                    | quinn::ConnectionError::LocallyClosed,
                ) => {
                    debug!("function disconnected");
                    return;
                }
                Err(e) => {
                    error!(error = %e, "stream accept failed");
                    return;
                }
            };
            tokio::spawn(on_stream.clone()(StreamHandler::new(send, recv)));
        }
    }

    pub fn close(&self, code: u32, reason: &[u8]) {
        self.connection.close(code.into(), reason);
    }
}

/// One stream opened by a function.
pub struct StreamHandler {
    send: SendStream,
    recv: RecvStream,
}

impl StreamHandler {
    pub fn new(send: SendStream, recv: RecvStream) -> Self {
        Self { send, recv }
    }

    pub async fn read_frame(&mut self) -> Result<Frame, ServerError> {
        Ok(read_frame(&mut self.recv).await?)
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), ServerError> {
        Ok(write_frame(&mut self.send, frame).await?)
    }

    /// Answers a resource call whose `Request` frame was already read, then
    /// finishes the stream. A handler error is sent as an `Error` frame.
    pub async fn respond<Req, Resp, H, Fut>(
        &mut self,
        request_frame: Frame,
        handler: H,
    ) -> Result<(), ServerError>
    where
        Req: prost::Message + Default,
        Resp: prost::Message,
        H: FnOnce(Req) -> Fut,
        Fut: std::future::Future<Output = Result<Resp, ServerError>>,
    {
        let request: Req = request_frame.decode_as(MessageType::Request)?;
        let reply = match handler(request).await {
            Ok(response) => Frame::response(&response)?,
            Err(e) => {
                error!(error = %e, "resource call failed");
                Frame::error()
            }
        };
        self.write_frame(&reply).await?;
        self.finish()
    }

    pub fn finish(&mut self) -> Result<(), ServerError> {
        Ok(self.send.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn self_signed() -> PlatformServerConfig {
        let issued = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        PlatformServerConfig {
            cert_pem: issued.cert.pem().into_bytes(),
            key_pem: issued.key_pair.serialize_pem().into_bytes(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = PlatformServerConfig::default();
        assert_eq!(config.bind_addr.port(), 50051);
        assert!(config.cert_pem.is_empty());
        assert_eq!(config.max_bi_streams, 1_000);
    }

    #[test]
    fn test_env_override_keeps_default_when_unset() {
        let mut field = 7u32;
        override_from_env("FAASLINK_TEST_UNSET_VARIABLE", &mut field);
        assert_eq!(field, 7);
    }

    #[tokio::test]
    async fn test_localhost_binds_ephemeral_port() {
        let server = PlatformServer::localhost("127.0.0.1:0".parse().unwrap()).unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
        server.close();
        assert!(server.accept().await.is_none());
    }

    #[test]
    fn test_identity_requires_a_certificate() {
        match PlatformServerConfig::default().identity() {
            Err(ServerError::Tls(msg)) => assert!(msg.contains("no certificate")),
            other => panic!("expected Tls error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_identity_requires_a_key() {
        let config = PlatformServerConfig {
            key_pem: Vec::new(),
            ..self_signed()
        };
        match config.identity() {
            Err(ServerError::Tls(msg)) => assert!(msg.contains("no private key")),
            other => panic!("expected Tls error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_self_signed_identity_builds_quic_config() {
        assert!(self_signed().quic().is_ok());
    }
}
