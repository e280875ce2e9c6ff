//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Coordination store trait definitions

use crate::{
    error::RegistrarError,
    types::{LeaseId, LeaseKeepAlive},
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Operations the registrar needs from a lease-capable key-value store.
///
/// Implementations are shared between the caller-facing API and the
/// heartbeat task, so every method takes `&self`.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Grant a lease with the given TTL in seconds
    async fn grant(&self, ttl_secs: i64) -> Result<LeaseId, RegistrarError>;

    /// Start renewing a lease; the stream ends when the lease is lost
    async fn keep_alive(&self, lease: LeaseId) -> Result<KeepAliveStream, RegistrarError>;

    /// Write a value, optionally attached to a lease
    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        lease: Option<LeaseId>,
    ) -> Result<(), RegistrarError>;

    /// Read a value
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RegistrarError>;

    /// Delete a key
    async fn delete(&self, key: &str) -> Result<(), RegistrarError>;

    /// Revoke a lease, deleting every key attached to it
    async fn revoke(&self, lease: LeaseId) -> Result<(), RegistrarError>;
}

/// Dials a coordination store
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(
        &self,
        dial_timeout: Duration,
    ) -> Result<Arc<dyn CoordinationStore>, RegistrarError>;
}

/// Stream of renewal acknowledgements for one lease.
///
/// `next` returns `None` once the store stops renewing the lease, either
/// because it expired or because the connection broke.
#[derive(Debug)]
pub struct KeepAliveStream {
    lease: LeaseId,
    acks: mpsc::Receiver<LeaseKeepAlive>,
}

impl KeepAliveStream {
    /// Create a stream together with the sender that feeds it
    pub fn channel(lease: LeaseId, buffer: usize) -> (mpsc::Sender<LeaseKeepAlive>, Self) {
        let (tx, acks) = mpsc::channel(buffer);
        (tx, Self { lease, acks })
    }

    /// Lease this stream renews
    pub fn lease(&self) -> LeaseId {
        self.lease
    }

    /// Wait for the next acknowledgement
    pub async fn next(&mut self) -> Option<LeaseKeepAlive> {
        self.acks.recv().await
    }
}
