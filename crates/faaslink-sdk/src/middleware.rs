// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Middleware chain.
//!
//! A chain is a plain ordered list of stages. [`Next`] holds the remaining
//! slice; calling [`Next::run`] hands the context to the head and gives it a
//! `Next` over the tail. The empty slice is the terminal stage and returns the
//! context unchanged.
//!
//! ```text
//! M1 -> M2 -> ... -> Mn -> [handler] -> (terminal)
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use crate::error::{BoxError, ChainError, FaasError};

/// Result of a chain stage. `Ok(None)` means the stage produced no context.
pub type Outcome<C> = Result<Option<C>, BoxError>;

/// One step of a middleware chain.
///
/// Either return without calling `next` to end the chain early, or do some
/// work and return `next.run(ctx).await`.
#[async_trait]
pub trait Middleware<C>: Send + Sync {
    async fn handle(&self, ctx: C, next: Next<'_, C>) -> Outcome<C>;

    /// Name used in logs and error reports.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Terminal function from context to context.
///
/// Any `Fn(C) -> impl Future<Output = Outcome<C>>` is a handler.
#[async_trait]
pub trait Handler<C>: Send + Sync {
    async fn call(&self, ctx: C) -> Outcome<C>;

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

#[async_trait]
impl<C, F, Fut> Handler<C> for F
where
    C: Send + 'static,
    F: Fn(C) -> Fut + Send + Sync,
    Fut: Future<Output = Outcome<C>> + Send + 'static,
{
    async fn call(&self, ctx: C) -> Outcome<C> {
        (self)(ctx).await
    }
}

/// Rest of the chain after the current stage.
pub struct Next<'a, C> {
    chain: &'a [Arc<dyn Middleware<C>>],
}

impl<C> Clone for Next<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Next<'_, C> {}

impl<'a, C: Send + 'static> Next<'a, C> {
    pub fn new(chain: &'a [Arc<dyn Middleware<C>>]) -> Self {
        Self { chain }
    }

    /// A `Next` that returns the context unchanged.
    pub fn terminal() -> Self {
        Self { chain: &[] }
    }

    /// Number of stages left, not counting the terminal.
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }

    pub async fn run(self, ctx: C) -> Outcome<C> {
        match self.chain.split_first() {
            Some((head, rest)) => invoke(head.as_ref(), ctx, Next { chain: rest }).await,
            None => Ok(Some(ctx)),
        }
    }
}

/// Run a single stage, labelling failures and panics with its type name.
pub(crate) async fn invoke<C: Send + 'static>(
    stage: &dyn Middleware<C>,
    ctx: C,
    next: Next<'_, C>,
) -> Outcome<C> {
    match AssertUnwindSafe(stage.handle(ctx, next))
        .catch_unwind()
        .await
    {
        Ok(Ok(ctx)) => Ok(ctx),
        Ok(Err(err)) if err.is::<ChainError>() => Err(err),
        Ok(Err(source)) => Err(Box::new(ChainError::Failed {
            stage: stage.type_name(),
            source,
        })),
        Err(payload) => Err(Box::new(ChainError::Panicked {
            stage: stage.type_name(),
            message: panic_message(payload.as_ref()),
        })),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Adapts a [`Handler`] into a [`Middleware`]: runs the handler, then
/// continues with `next` whenever the handler produced a context.
pub struct HandlerMiddleware<H> {
    handler: H,
}

impl<H> HandlerMiddleware<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<C, H> Middleware<C> for HandlerMiddleware<H>
where
    C: Send + 'static,
    H: Handler<C>,
{
    async fn handle(&self, ctx: C, next: Next<'_, C>) -> Outcome<C> {
        match self.handler.call(ctx).await? {
            Some(ctx) => next.run(ctx).await,
            None => Ok(None),
        }
    }

    fn type_name(&self) -> &'static str {
        self.handler.type_name()
    }
}

/// Registered stages for one trigger kind.
///
/// User middlewares run in registration order; the handler, if any, always
/// runs last.
pub struct Pipeline<C> {
    stages: Vec<Arc<dyn Middleware<C>>>,
    has_handler: bool,
}

impl<C> Default for Pipeline<C> {
    fn default() -> Self {
        Self {
            stages: Vec::new(),
            has_handler: false,
        }
    }
}

impl<C: Send + 'static> Pipeline<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware<C>>) {
        if self.has_handler {
            let at = self.stages.len() - 1;
            self.stages.insert(at, middleware);
        } else {
            self.stages.push(middleware);
        }
    }

    /// Install the terminal handler. Only one handler per trigger kind.
    pub fn set_handler<H: Handler<C> + 'static>(&mut self, handler: H) -> Result<(), FaasError> {
        if self.has_handler {
            let existing = self.stages.last().map_or("<unknown>", |m| m.type_name());
            return Err(FaasError::Config(format!(
                "a handler is already registered ({}); register {} as middleware instead",
                existing,
                handler.type_name()
            )));
        }
        self.stages.push(Arc::new(HandlerMiddleware::new(handler)));
        self.has_handler = true;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn has_handler(&self) -> bool {
        self.has_handler
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|m| m.type_name()).collect()
    }

    pub async fn run(&self, ctx: C) -> Outcome<C> {
        Next::new(&self.stages).run(ctx).await
    }
}
