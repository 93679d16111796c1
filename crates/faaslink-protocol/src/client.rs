// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Function side of the QUIC connection.
//!
//! A function holds a single connection to the platform. The trigger stream
//! lives for the whole life of the function; every resource call opens its
//! own short stream next to it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use quinn::{ClientConfig, Connection, Endpoint, TransportConfig};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::frame::{Frame, FrameError, MessageType, read_frame, write_frame};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("platform connection lost: {0}")]
    Connection(#[from] quinn::ConnectionError),

    #[error("cannot dial platform: {0}")]
    Connect(#[from] quinn::ConnectError),

    #[error("stream write failed: {0}")]
    Write(#[from] quinn::WriteError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stream already finished: {0}")]
    ClosedStream(#[from] quinn::ClosedStream),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("platform answered with an error frame")]
    Rejected,

    #[error("not connected to the platform")]
    NotConnected,

    #[error("no connection after {0}ms")]
    Timeout(u64),
}

#[derive(Debug, Clone)]
pub struct PlatformClientConfig {
    pub server_addr: SocketAddr,
    /// Name presented for TLS (SNI and certificate check).
    pub server_name: String,
    /// Accept any server certificate. Local platforms only.
    pub dangerous_skip_cert_verification: bool,
    /// 0 disables keep-alives.
    pub keep_alive_interval_ms: u64,
    pub idle_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for PlatformClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 50051)),
            server_name: "localhost".to_string(),
            dangerous_skip_cert_verification: false,
            keep_alive_interval_ms: 10_000,
            // Long enough that a quiet trigger stream is kept by keep-alives.
            idle_timeout_ms: 600_000,
            connect_timeout_ms: 10_000,
        }
    }
}

impl PlatformClientConfig {
    fn transport(&self) -> Result<TransportConfig, ClientError> {
        let mut transport = TransportConfig::default();
        let keep_alive = Duration::from_millis(self.keep_alive_interval_ms);
        transport.keep_alive_interval((!keep_alive.is_zero()).then_some(keep_alive));

        let idle = Duration::from_millis(self.idle_timeout_ms)
            .try_into()
            .map_err(|e| ClientError::Tls(format!("idle timeout out of range: {}", e)))?;
        transport.max_idle_timeout(Some(idle));
        Ok(transport)
    }

    fn quic(&self) -> Result<ClientConfig, ClientError> {
        let builder = rustls::ClientConfig::builder();
        let tls = if self.dangerous_skip_cert_verification {
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCert::new()))
                .with_no_client_auth()
        } else {
            let roots = rustls::RootCertStore {
                roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
            };
            builder.with_root_certificates(roots).with_no_client_auth()
        };

        let crypto = quinn::crypto::rustls::QuicClientConfig::try_from(tls)
            .map_err(|e| ClientError::Tls(e.to_string()))?;
        let mut quic = ClientConfig::new(Arc::new(crypto));
        quic.transport_config(Arc::new(self.transport()?));
        Ok(quic)
    }
}

/// Lazily connected handle to the platform. Cheap to share behind an `Arc`.
pub struct PlatformClient {
    endpoint: Endpoint,
    connection: Mutex<Option<Connection>>,
    config: PlatformClientConfig,
}

impl PlatformClient {
    pub fn new(config: PlatformClientConfig) -> Result<Self, ClientError> {
        let mut endpoint = Endpoint::client(SocketAddr::from(([0, 0, 0, 0], 0)))?;
        endpoint.set_default_client_config(config.quic()?);
        Ok(Self {
            endpoint,
            connection: Mutex::new(None),
            config,
        })
    }

    /// Client for a platform on this machine serving a self-signed certificate.
    pub fn localhost(server_addr: SocketAddr) -> Result<Self, ClientError> {
        Self::new(PlatformClientConfig {
            server_addr,
            dangerous_skip_cert_verification: true,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &PlatformClientConfig {
        &self.config
    }

    /// Establishes the connection unless a live one already exists.
    #[instrument(skip(self), fields(addr = %self.config.server_addr))]
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.live_connection().await.map(|_| ())
    }

    async fn live_connection(&self) -> Result<Connection, ClientError> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref().filter(|c| c.close_reason().is_none()) {
            debug!("reusing platform connection");
            return Ok(conn.clone());
        }

        info!(addr = %self.config.server_addr, "dialing platform");
        let connecting = self
            .endpoint
            .connect(self.config.server_addr, &self.config.server_name)?;
        let limit = Duration::from_millis(self.config.connect_timeout_ms);
        let conn = tokio::time::timeout(limit, connecting)
            .await
            .map_err(|_| ClientError::Timeout(self.config.connect_timeout_ms))??;

        info!(remote = %conn.remote_address(), "platform connection established");
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Opens the bidirectional stream that carries triggers.
    pub async fn open_trigger_stream(
        &self,
    ) -> Result<(quinn::SendStream, quinn::RecvStream), ClientError> {
        let conn = self.live_connection().await?;
        Ok(conn.open_bi().await?)
    }

    /// One resource call: a `Request` frame out, a `Response` frame back, on
    /// a stream of its own.
    #[instrument(skip_all)]
    pub async fn request<Req: prost::Message, Resp: prost::Message + Default>(
        &self,
        request: &Req,
    ) -> Result<Resp, ClientError> {
        let conn = self.live_connection().await?;
        let (mut send, mut recv) = conn.open_bi().await?;

        write_frame(&mut send, &Frame::request(request)?).await?;
        send.finish()?;

        let reply = read_frame(&mut recv).await?;
        if reply.message_type == MessageType::Error {
            return Err(ClientError::Rejected);
        }
        Ok(reply.decode_as(MessageType::Response)?)
    }

    /// Closes the connection. Streams still open on it are reset.
    pub async fn close(&self) {
        if let Some(conn) = self.connection.lock().await.take() {
            conn.close(0u32.into(), b"function closing");
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .await
            .as_ref()
            .is_some_and(|conn| conn.close_reason().is_none())
    }
}

impl Drop for PlatformClient {
    fn drop(&mut self) {
        if let Some(conn) = self.connection.get_mut().take() {
            conn.close(0u32.into(), b"function dropped");
        }
    }
}

/// Verifier that trusts every certificate. Used against local platforms
/// serving a self-signed certificate.
#[derive(Debug)]
struct AcceptAnyCert {
    schemes: Vec<rustls::SignatureScheme>,
}

impl AcceptAnyCert {
    fn new() -> Self {
        Self {
            schemes: rustls::crypto::ring::default_provider()
                .signature_verification_algorithms
                .supported_schemes(),
        }
    }
}

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.schemes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_target_local_platform() {
        let config = PlatformClientConfig::default();
        assert_eq!(config.server_addr, "127.0.0.1:50051".parse().unwrap());
        assert_eq!(config.server_name, "localhost");
        assert!(!config.dangerous_skip_cert_verification);
        assert!(config.idle_timeout_ms > config.keep_alive_interval_ms);
    }

    #[tokio::test]
    async fn test_client_is_lazy() {
        let client = PlatformClient::localhost("127.0.0.1:50051".parse().unwrap()).unwrap();
        assert!(client.config().dangerous_skip_cert_verification);
        assert!(!client.is_connected().await);
        client.close().await;
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_trigger_stream_needs_a_platform() {
        let client = PlatformClient::new(PlatformClientConfig {
            server_addr: "127.0.0.1:59991".parse().unwrap(),
            dangerous_skip_cert_verification: true,
            connect_timeout_ms: 100,
            ..Default::default()
        })
        .unwrap();
        assert!(client.open_trigger_stream().await.is_err());
        assert!(!client.is_connected().await);
    }

    #[test]
    fn test_keep_alive_can_be_disabled() {
        let config = PlatformClientConfig {
            keep_alive_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.quic().is_ok());
    }

    #[test]
    fn test_accept_any_cert_advertises_schemes() {
        let verifier = AcceptAnyCert::new();
        assert!(
            verifier
                .supported_verify_schemes()
                .contains(&rustls::SignatureScheme::ED25519)
        );
    }

    #[test]
    fn test_timeout_message_names_the_limit() {
        assert_eq!(
            ClientError::Timeout(250).to_string(),
            "no connection after 250ms"
        );
    }
}
