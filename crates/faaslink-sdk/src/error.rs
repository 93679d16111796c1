// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SDK-specific error types.

use faaslink_protocol::resource_proto::{ErrorResponse, StatusCode};
use faaslink_protocol::{ClientError, FrameError};
use thiserror::Error;

/// Error type user middleware and handlers may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the function runtime.
#[derive(Debug, Error)]
pub enum FaasError {
    /// Setup problem detected before any network activity
    #[error("configuration error: {0}")]
    Config(String),

    /// Could not reach the platform
    #[error("connection error: {0}")]
    Connection(#[from] ClientError),

    /// The trigger stream failed mid-flight
    #[error("transport error: {0}")]
    Transport(#[from] FrameError),
}

/// Failure while processing a single trigger.
///
/// These never end the stream; the driver logs them and answers the
/// platform with a failure response.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("no http handler or middleware registered")]
    NoHttpHandlers,

    #[error("no event handler or middleware registered")]
    NoEventHandlers,

    #[error("unsupported trigger type")]
    UnsupportedTrigger,

    #[error("handler {handler} failed: {source}")]
    Handler {
        handler: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("handler {handler} panicked: {message}")]
    Panicked {
        handler: &'static str,
        message: String,
    },
}

/// Failure raised by one stage of a middleware chain.
///
/// The innermost failing stage labels the error; outer stages pass it through
/// unchanged so the name always points at the code that failed.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("{stage} failed: {source}")]
    Failed {
        stage: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("{stage} panicked: {message}")]
    Panicked {
        stage: &'static str,
        message: String,
    },
}

impl ChainError {
    pub fn stage(&self) -> &'static str {
        match self {
            ChainError::Failed { stage, .. } | ChainError::Panicked { stage, .. } => stage,
        }
    }
}

impl From<ChainError> for ProcessError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Failed { stage, source } => ProcessError::Handler {
                handler: stage,
                source,
            },
            ChainError::Panicked { stage, message } => ProcessError::Panicked {
                handler: stage,
                message,
            },
        }
    }
}

/// Errors returned by the resource clients.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("unknown error: {0}")]
    Unknown(String),

    #[error("connection error: {0}")]
    Connection(#[from] ClientError),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl From<ErrorResponse> for ResourceError {
    fn from(err: ErrorResponse) -> Self {
        match err.status() {
            StatusCode::NotFound => ResourceError::NotFound(err.message),
            StatusCode::AlreadyExists => ResourceError::AlreadyExists(err.message),
            StatusCode::InvalidArgument => ResourceError::InvalidArgument(err.message),
            StatusCode::PermissionDenied => ResourceError::PermissionDenied(err.message),
            StatusCode::Unavailable => ResourceError::Unavailable(err.message),
            StatusCode::Internal => ResourceError::Internal(err.message),
            StatusCode::Unknown => ResourceError::Unknown(err.message),
        }
    }
}

impl ResourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResourceError::NotFound(_))
    }
}

/// Type alias for runtime results.
pub type Result<T> = std::result::Result<T, FaasError>;
