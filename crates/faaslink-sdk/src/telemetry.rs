// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tracing subscriber bootstrap for function binaries.
//!
//! # Usage
//!
//! ```rust,ignore
//! faaslink_sdk::telemetry::init_subscriber()?;
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (default: `info`)

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a global subscriber: a fmt layer on stderr filtered by `RUST_LOG`.
///
/// Stdout is left alone for the function's own output. Fails if a global
/// subscriber is already set.
pub fn init_subscriber() -> Result<(), TryInitError> {
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(fmt)
        .with(env_filter())
        .try_init()
}
