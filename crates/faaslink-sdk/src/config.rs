// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runtime configuration for connecting to the platform.

use std::env;
use std::net::SocketAddr;

use faaslink_protocol::PlatformClientConfig;

use crate::error::{FaasError, Result};

const DEFAULT_SERVICE_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 50051);

/// Function runtime configuration.
#[derive(Debug, Clone)]
pub struct FaasConfig {
    /// Platform address (default: "127.0.0.1:50051")
    pub service_addr: SocketAddr,
    /// Server name for TLS verification (default: "localhost")
    pub server_name: String,
    /// Skip TLS certificate verification (default: false, use true for dev)
    pub skip_cert_verification: bool,
    /// Connection timeout in milliseconds (default: 10_000)
    pub connect_timeout_ms: u64,
    /// Resource request timeout in milliseconds (default: 30_000).
    /// Set to 0 to wait indefinitely.
    pub request_timeout_ms: u64,
}

impl Default for FaasConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FaasConfig {
    /// Load configuration from environment variables.
    ///
    /// # Optional Environment Variables
    /// - `FAASLINK_SERVICE_ADDR` - Platform address (default: "127.0.0.1:50051")
    /// - `FAASLINK_SERVER_NAME` - Server name for TLS (default: "localhost")
    /// - `FAASLINK_SKIP_CERT_VERIFICATION` - Skip TLS verification (default: false)
    /// - `FAASLINK_CONNECT_TIMEOUT_MS` - Connection timeout (default: 10000)
    /// - `FAASLINK_REQUEST_TIMEOUT_MS` - Resource request timeout (default: 30000)
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();

        if let Ok(addr) = env::var("FAASLINK_SERVICE_ADDR") {
            config.service_addr = addr.parse().map_err(|e| {
                FaasError::Config(format!("invalid FAASLINK_SERVICE_ADDR '{}': {}", addr, e))
            })?;
        }

        if let Ok(name) = env::var("FAASLINK_SERVER_NAME") {
            config.server_name = name;
        }

        config.skip_cert_verification = env::var("FAASLINK_SKIP_CERT_VERIFICATION")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        config.connect_timeout_ms = parse_ms("FAASLINK_CONNECT_TIMEOUT_MS", 10_000)?;
        config.request_timeout_ms = parse_ms("FAASLINK_REQUEST_TIMEOUT_MS", 30_000)?;

        Ok(config)
    }

    /// Configuration for a platform on this machine with a self-signed cert.
    pub fn localhost() -> Self {
        Self::new().with_skip_cert_verification(true)
    }

    pub fn new() -> Self {
        Self {
            service_addr: SocketAddr::from(DEFAULT_SERVICE_ADDR),
            server_name: "localhost".to_string(),
            skip_cert_verification: false,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
        }
    }

    /// Set the platform address.
    pub fn with_service_addr(mut self, addr: SocketAddr) -> Self {
        self.service_addr = addr;
        self
    }

    /// Set the server name for TLS verification.
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Skip TLS certificate verification (for development only!).
    pub fn with_skip_cert_verification(mut self, skip: bool) -> Self {
        self.skip_cert_verification = skip;
        self
    }

    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    /// QUIC client settings derived from this configuration.
    pub fn client_config(&self) -> PlatformClientConfig {
        PlatformClientConfig {
            server_addr: self.service_addr,
            server_name: self.server_name.clone(),
            dangerous_skip_cert_verification: self.skip_cert_verification,
            connect_timeout_ms: self.connect_timeout_ms,
            ..Default::default()
        }
    }
}

fn parse_ms(var: &str, default: u64) -> Result<u64> {
    match env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| FaasError::Config(format!("invalid {} '{}': {}", var, raw, e))),
        Err(_) => Ok(default),
    }
}
