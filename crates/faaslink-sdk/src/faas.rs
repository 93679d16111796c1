// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Registration API and run loop entry points.

use std::sync::Arc;

use faaslink_protocol::PlatformClient;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::config::FaasConfig;
use crate::context::{EventContext, HttpContext};
use crate::driver::StreamDriver;
use crate::error::{FaasError, Result};
use crate::middleware::{Handler, Middleware, Pipeline};
use crate::processor::TriggerProcessor;

/// A function: registered handlers and middleware plus the platform it
/// connects to.
///
/// # Example
///
/// ```ignore
/// use faaslink_sdk::{Faas, FaasConfig, HttpContext, Outcome};
///
/// async fn hello(mut ctx: HttpContext) -> Outcome<HttpContext> {
///     ctx.response_mut().set_text("hello");
///     Ok(Some(ctx))
/// }
///
/// let mut faas = Faas::new(FaasConfig::from_env()?);
/// faas.http_handler(hello)?;
/// faas.start().await?;
/// ```
pub struct Faas {
    config: FaasConfig,
    http: Pipeline<HttpContext>,
    events: Pipeline<EventContext>,
}

impl Faas {
    pub fn new(config: FaasConfig) -> Self {
        Self {
            config,
            http: Pipeline::new(),
            events: Pipeline::new(),
        }
    }

    pub fn config(&self) -> &FaasConfig {
        &self.config
    }

    /// Register the HTTP handler. It runs after every HTTP middleware.
    pub fn http_handler<H>(&mut self, handler: H) -> Result<&mut Self>
    where
        H: Handler<HttpContext> + 'static,
    {
        self.http.set_handler(handler)?;
        Ok(self)
    }

    /// Register the event handler. It runs after every event middleware.
    pub fn event_handler<H>(&mut self, handler: H) -> Result<&mut Self>
    where
        H: Handler<EventContext> + 'static,
    {
        self.events.set_handler(handler)?;
        Ok(self)
    }

    /// Append an HTTP middleware; middlewares run in registration order.
    pub fn http_middleware<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware<HttpContext> + 'static,
    {
        self.http.push(Arc::new(middleware));
        self
    }

    pub fn event_middleware<M>(&mut self, middleware: M) -> &mut Self
    where
        M: Middleware<EventContext> + 'static,
    {
        self.events.push(Arc::new(middleware));
        self
    }

    fn validate(&self) -> Result<()> {
        if self.http.is_empty() && self.events.is_empty() {
            return Err(FaasError::Config(
                "no http or event handler or middleware registered".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate registrations and build the processor.
    pub fn into_processor(self) -> Result<TriggerProcessor> {
        self.validate()?;
        info!(
            http = ?self.http.stage_names(),
            events = ?self.events.stage_names(),
            "function pipelines ready"
        );
        Ok(TriggerProcessor::new(self.http, self.events))
    }

    /// Drive an already open trigger stream until it completes.
    pub async fn serve<R, W>(self, reader: R, writer: W, shutdown: CancellationToken) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let driver = StreamDriver::new(Arc::new(self.into_processor()?));
        driver.run(reader, writer, shutdown).await
    }

    /// Open a trigger stream on `client` and serve it.
    #[instrument(skip_all, fields(addr = %client.config().server_addr))]
    pub async fn serve_on(
        self,
        client: &PlatformClient,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let processor = Arc::new(self.into_processor()?);
        let (send, recv) = client.open_trigger_stream().await?;
        StreamDriver::new(processor).run(recv, send, shutdown).await
    }

    /// Connect to the platform and serve triggers until the stream ends or
    /// `shutdown` is cancelled.
    ///
    /// Registrations are validated before any network activity.
    pub async fn start_with_shutdown(self, shutdown: CancellationToken) -> Result<()> {
        self.validate()?;

        let client = PlatformClient::new(self.config.client_config())?;
        let result = self.serve_on(&client, shutdown).await;
        client.close().await;
        result
    }

    /// Like [`Faas::start_with_shutdown`], with Ctrl-C as the shutdown signal.
    pub async fn start(self) -> Result<()> {
        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                trigger.cancel();
            }
        });

        let result = self.start_with_shutdown(shutdown).await;
        watcher.abort();
        result
    }
}
