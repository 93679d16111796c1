// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! faaslink SDK - function runtime and resource clients.
//!
//! A function registers one HTTP handler and/or one event handler, wraps them
//! in middleware, and calls [`Faas::start`]. The runtime opens a trigger
//! stream to the platform over QUIC and answers every trigger it receives
//! with exactly one response.
//!
//! # Features
//!
//! - **Middleware chains**: ordered stages around a terminal handler, any stage
//!   may short-circuit by returning `None`
//! - **Routing**: [`Router`] dispatches HTTP triggers by method and path
//!   pattern (`/customers/{id}`)
//! - **Resources**: key-value, topics, queues, secrets, storage and documents
//!   via [`Resources`]
//!
//! # Quick Start
//!
//! ```ignore
//! use faaslink_sdk::{BoxError, Faas, FaasConfig, HttpContext, Router};
//!
//! #[tokio::main]
//! async fn main() -> faaslink_sdk::Result<()> {
//!     let mut router = Router::new();
//!     router.get("/hello/{name}", |mut ctx: HttpContext| async move {
//!         let name = ctx.request().path_param("name").unwrap_or("world").to_string();
//!         ctx.response_mut().set_text(format!("Hello, {}!", name));
//!         Ok::<_, BoxError>(Some(ctx))
//!     })?;
//!
//!     let mut faas = Faas::new(FaasConfig::from_env()?);
//!     faas.http_middleware(router);
//!     faas.start().await
//! }
//! ```
//!
//! # Failure handling
//!
//! A failing or panicking stage never takes the function down. The trigger is
//! answered with HTTP 500 (or `success = false` for events) and the error is
//! logged with the name of the stage that produced it.

pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod faas;
pub mod middleware;
pub mod processor;
pub mod resources;
pub mod router;
pub mod telemetry;

pub use config::FaasConfig;
pub use context::{
    EventContext, EventRequest, EventRequestBuilder, EventResponse, Headers, HttpContext,
    HttpRequest, HttpRequestBuilder, HttpResponse, QueryParams,
};
pub use driver::{StreamDriver, StreamState};
pub use error::{BoxError, ChainError, FaasError, ProcessError, ResourceError, Result};
pub use faas::Faas;
pub use middleware::{Handler, HandlerMiddleware, Middleware, Next, Outcome, Pipeline};
pub use processor::{TriggerKind, TriggerProcessor};
pub use resources::{
    DocumentClient, FailedTask, KeyValueClient, LeasedTask, QueueClient, ResourceChannel,
    ResourceTransport, Resources, Secret, SecretClient, StorageClient, Task, TopicClient,
};
pub use router::{NotFound, Route, Router};

pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;

// Re-export protocol types for advanced usage
pub use faaslink_protocol::{ClientError, FrameError, PlatformClient, PlatformClientConfig};
