//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Error types for Orasi Registrar

use thiserror::Error;

/// Error type for registrar operations
#[derive(Error, Debug)]
pub enum RegistrarError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Service is not registered")]
    NotRegistered,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RegistrarError {
    /// Whether the error was raised by the caller's input rather than the store
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, RegistrarError::InvalidArgument(_))
    }

    /// Whether the error came from the coordination store
    pub fn is_store(&self) -> bool {
        matches!(self, RegistrarError::Store(_))
    }
}

impl From<std::io::Error> for RegistrarError {
    fn from(err: std::io::Error) -> Self {
        RegistrarError::Internal(err.to_string())
    }
}

impl From<etcd_client::Error> for RegistrarError {
    fn from(err: etcd_client::Error) -> Self {
        RegistrarError::Store(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for RegistrarError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        RegistrarError::Timeout(err.to_string())
    }
}

impl From<toml::de::Error> for RegistrarError {
    fn from(err: toml::de::Error) -> Self {
        RegistrarError::Configuration(err.to_string())
    }
}
