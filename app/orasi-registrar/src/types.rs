//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Common types for Orasi Registrar

use crate::error::RegistrarError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Record published to the coordination store for one service instance.
///
/// The JSON field names are read by discovery clients outside this crate and
/// must stay stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Service name
    pub name: String,

    /// Instance address as `host:port`
    pub addr: String,

    /// Service version, may be empty
    #[serde(default)]
    pub version: String,

    /// Load-balancing weight
    #[serde(default)]
    pub weight: i64,

    /// Extension fields for consumers
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl ServiceDescriptor {
    /// Create a descriptor with zero weight and no version
    pub fn new(name: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Host part of the address (everything before the first `:`)
    pub fn host(&self) -> &str {
        self.addr.split(':').next().unwrap_or_default()
    }

    /// Key prefix shared by every instance of this service and version
    pub fn prefix(&self) -> String {
        if self.version.is_empty() {
            format!("/{}/", self.name)
        } else {
            format!("/{}/{}/", self.name, self.version)
        }
    }

    /// Store key this instance is published under
    pub fn register_path(&self) -> String {
        format!("{}{}", self.prefix(), self.addr)
    }

    /// Reject descriptors that cannot be published
    pub fn validate(&self) -> Result<(), RegistrarError> {
        if self.host().is_empty() {
            return Err(RegistrarError::InvalidArgument(format!(
                "invalid ip address: {:?}",
                self.addr
            )));
        }
        Ok(())
    }

    /// Serialize to the published JSON form
    pub fn to_bytes(&self) -> Result<Vec<u8>, RegistrarError> {
        serde_json::to_vec(self).map_err(|e| {
            RegistrarError::Encoding(format!("Failed to serialize service descriptor: {}", e))
        })
    }

    /// Parse a published JSON value
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RegistrarError> {
        serde_json::from_slice(bytes).map_err(|e| {
            RegistrarError::Decoding(format!("Failed to deserialize service descriptor: {}", e))
        })
    }
}

/// Lease identifier handed out by the coordination store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseId(pub i64);

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Acknowledgement that the store renewed a lease
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseKeepAlive {
    /// Renewed lease
    pub id: LeaseId,

    /// Remaining TTL in seconds after the renewal
    pub ttl: i64,
}
