//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Configuration for Orasi Registrar

use crate::error::RegistrarError;
use crate::types::ServiceDescriptor;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Configuration for the registrar binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrarConfig {
    /// Coordination store backend
    pub backend: StoreBackend,

    /// etcd endpoints
    pub etcd_endpoints: Vec<String>,

    /// Endpoint for the weight update and read-back API
    pub http_endpoint: String,

    /// Descriptor published for this instance
    pub service: ServiceDescriptor,

    /// Lease TTL and recovery poll period, in seconds
    pub interval_secs: u64,

    /// Store call deadlines
    pub timeouts: TimeoutConfig,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Etcd,
            etcd_endpoints: vec!["http://localhost:2379".to_string()],
            http_endpoint: crate::DEFAULT_HTTP_ENDPOINT.to_string(),
            service: ServiceDescriptor::new(crate::REGISTRAR_NAME, "127.0.0.1:8085"),
            interval_secs: crate::DEFAULT_INTERVAL_SECS,
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl RegistrarConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistrarError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check the configuration before anything is dialed
    pub fn validate(&self) -> Result<(), RegistrarError> {
        if matches!(self.backend, StoreBackend::Etcd) && self.etcd_endpoints.is_empty() {
            return Err(RegistrarError::Configuration(
                "at least one etcd endpoint is required".to_string(),
            ));
        }

        if self.interval_secs == 0 || self.interval_secs > crate::MAX_LEASE_TTL_SECS {
            return Err(RegistrarError::Configuration(format!(
                "interval_secs must be between 1 and {}",
                crate::MAX_LEASE_TTL_SECS
            )));
        }

        self.timeouts.validate()?;

        self.service
            .validate()
            .map_err(|e| RegistrarError::Configuration(e.to_string()))
    }
}

/// Coordination store backend types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Etcd,
    Memory,
}

/// Deadlines applied around store calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on establishing the store connection
    pub dial_timeout: Duration,

    /// Bound on granting a lease
    pub request_timeout: Duration,

    /// Bound on the delete + revoke sequence at shutdown
    pub shutdown_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(crate::DEFAULT_DIAL_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(crate::DEFAULT_DIAL_TIMEOUT_SECS),
            shutdown_timeout: Duration::from_secs(crate::DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    fn validate(&self) -> Result<(), RegistrarError> {
        for (name, value) in [
            ("dial_timeout", self.dial_timeout),
            ("request_timeout", self.request_timeout),
            ("shutdown_timeout", self.shutdown_timeout),
        ] {
            if value.is_zero() {
                return Err(RegistrarError::Configuration(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }
}
