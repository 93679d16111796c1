// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Profiles function - a small faaslink function backed by the key-value store.
//!
//! This example shows:
//! - Logging bootstrap
//! - Configuration from the environment
//! - A router with path parameters
//! - A request-logging middleware
//! - An event handler reacting to a topic
//!
//! Run with: cargo run -p faaslink-example --bin profiles_function
//!
//! Point it at a platform with `FAASLINK_SERVICE_ADDR` (and
//! `FAASLINK_SKIP_CERT_VERIFICATION=true` for a self-signed local platform).

use std::time::Instant;

use faaslink_sdk::{
    BoxError, EventContext, Faas, FaasConfig, HttpContext, KeyValueClient, Middleware, Next,
    Outcome, Resources, Router, async_trait, telemetry,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const STORE: &str = "profiles";

#[derive(Debug, Serialize, Deserialize)]
struct Profile {
    name: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileDeleted {
    name: String,
}

/// Logs every HTTP trigger with its final status and latency.
struct RequestLog;

#[async_trait]
impl Middleware<HttpContext> for RequestLog {
    async fn handle(&self, ctx: HttpContext, next: Next<'_, HttpContext>) -> Outcome<HttpContext> {
        let started = Instant::now();
        let method = ctx.request().method().to_string();
        let path = ctx.request().path().to_string();

        let result = next.run(ctx).await;
        match &result {
            Ok(Some(ctx)) => info!(
                %method,
                %path,
                status = ctx.response().status(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "request handled"
            ),
            Ok(None) => warn!(%method, %path, "request dropped"),
            Err(e) => warn!(%method, %path, error = %e, "request failed"),
        }
        result
    }
}

fn routes(kv: &KeyValueClient) -> Result<Router, faaslink_sdk::FaasError> {
    let mut router = Router::new();

    router.get("/health", |mut ctx: HttpContext| async move {
        ctx.response_mut().set_text("ok");
        Ok::<_, BoxError>(Some(ctx))
    })?;

    let store = kv.clone();
    router.get("/profiles/{name}", move |mut ctx: HttpContext| {
        let store = store.clone();
        async move {
            let name = ctx
                .request()
                .path_param("name")
                .unwrap_or_default()
                .to_string();
            match store.get::<Profile>(STORE, &name).await? {
                Some(profile) => {
                    ctx.response_mut().set_json(&profile)?;
                }
                None => {
                    ctx.response_mut()
                        .set_status(404)
                        .set_text("no such profile");
                }
            }
            Ok::<_, BoxError>(Some(ctx))
        }
    })?;

    let store = kv.clone();
    router.put("/profiles/{name}", move |mut ctx: HttpContext| {
        let store = store.clone();
        async move {
            let name = ctx
                .request()
                .path_param("name")
                .unwrap_or_default()
                .to_string();
            let profile = match ctx.request().json::<Profile>() {
                Ok(profile) if profile.name == name => profile,
                Ok(_) => {
                    ctx.response_mut()
                        .set_status(400)
                        .set_text("name does not match path");
                    return Ok(Some(ctx));
                }
                Err(e) => {
                    ctx.response_mut().set_status(400).set_text(e.to_string());
                    return Ok(Some(ctx));
                }
            };
            store.set(STORE, &name, &profile).await?;
            ctx.response_mut().set_status(204);
            Ok::<_, BoxError>(Some(ctx))
        }
    })?;

    Ok(router)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_subscriber()?;

    let config = FaasConfig::from_env()?;
    info!(addr = %config.service_addr, "starting profiles function");

    let resources = Resources::connect(&config)?;
    let kv = resources.key_value().clone();

    let mut faas = Faas::new(config);
    faas.http_middleware(RequestLog)
        .http_middleware(routes(&kv)?);

    faas.event_handler(move |mut ctx: EventContext| {
        let kv = kv.clone();
        async move {
            if ctx.request().topic() == "profiles.deleted" {
                let event: ProfileDeleted = ctx.request().json()?;
                kv.delete(STORE, &event.name).await?;
                info!(name = %event.name, "profile removed");
            } else {
                warn!(topic = %ctx.request().topic(), "unexpected topic");
                ctx.response_mut().set_success(false);
            }
            Ok::<_, BoxError>(Some(ctx))
        }
    })?;

    faas.start().await?;
    info!("profiles function stopped");
    Ok(())
}
