//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Orasi Registrar - lease-backed service self-registration
//!
//! Publishes a service instance's address and weight into etcd under a
//! leased key, keeps the lease alive, and re-registers after lease loss so
//! that discovery clients only ever see live instances.

pub mod config;
pub mod error;
pub mod http;
pub mod registrar;
pub mod store;
pub mod types;

/// Registrar version
pub const REGISTRAR_VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export main types for convenience
pub use config::RegistrarConfig;
pub use error::RegistrarError;
pub use registrar::{Registrar, StopHandle};
pub use types::*;

/// Result type for registrar operations
pub type RegistrarResult<T> = Result<T, RegistrarError>;

/// Registrar name
pub const REGISTRAR_NAME: &str = "orasi-registrar";

/// Default HTTP endpoint
pub const DEFAULT_HTTP_ENDPOINT: &str = "0.0.0.0:8085";

/// Default lease TTL and recovery interval in seconds
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

/// Largest lease TTL etcd accepts, in seconds
pub const MAX_LEASE_TTL_SECS: u64 = 9_000_000_000;

/// Default store dial timeout in seconds
pub const DEFAULT_DIAL_TIMEOUT_SECS: u64 = 3;

/// Default bound on unregister + revoke at shutdown, in seconds
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Initialize a registrar from configuration
pub fn init_registrar(config: &RegistrarConfig) -> RegistrarResult<Registrar> {
    config.validate()?;
    tracing::info!("Initializing {} v{}", REGISTRAR_NAME, REGISTRAR_VERSION);

    Ok(Registrar::from_config(config))
}
