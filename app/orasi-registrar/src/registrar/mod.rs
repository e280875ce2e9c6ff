//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Service self-registration
//!
//! A [`Registrar`] publishes one [`ServiceDescriptor`] under a leased key
//! and keeps it there until stopped:
//!
//! 1. `register` dials the store, grants a lease, starts the keep-alive
//!    stream and writes the descriptor under the lease.
//! 2. A background heartbeat task watches the keep-alive stream. When the
//!    stream ends it registers again, then keeps retrying on every interval
//!    tick until it succeeds.
//! 3. Stopping deletes the key and revokes the lease.
//!
//! Errors inside the heartbeat task are logged and never reach the caller;
//! `get_server_info` is the way to check what is actually published.

mod handle;
mod heartbeat;
mod session;

pub use handle::StopHandle;

use crate::config::{RegistrarConfig, TimeoutConfig};
use crate::error::RegistrarError;
use crate::store::{StoreConnector, StoreFactory};
use crate::types::{LeaseId, ServiceDescriptor};
use session::Session;
use std::sync::Arc;
use tokio::sync::{oneshot, RwLock};
use tracing::{info, warn};

/// Publishes a service instance into the coordination store
pub struct Registrar {
    connector: Arc<dyn StoreConnector>,
    timeouts: TimeoutConfig,
    session: RwLock<Option<Arc<Session>>>,
}

impl Registrar {
    /// Create a registrar with default timeouts
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self::with_timeouts(connector, TimeoutConfig::default())
    }

    pub fn with_timeouts(connector: Arc<dyn StoreConnector>, timeouts: TimeoutConfig) -> Self {
        Self {
            connector,
            timeouts,
            session: RwLock::new(None),
        }
    }

    /// Create a registrar for the configured backend
    pub fn from_config(config: &RegistrarConfig) -> Self {
        Self::with_timeouts(
            StoreFactory::create_connector(config),
            config.timeouts.clone(),
        )
    }

    /// Register `descriptor` with a lease of `interval_secs` and keep it alive.
    ///
    /// Nothing runs in the background unless this returns `Ok`. Call it once
    /// per registrar: a second call replaces the session and leaves the first
    /// heartbeat running until its handle is stopped.
    pub async fn register(
        &self,
        descriptor: ServiceDescriptor,
        interval_secs: u64,
    ) -> Result<StopHandle, RegistrarError> {
        descriptor.validate()?;
        if interval_secs == 0 || interval_secs > crate::MAX_LEASE_TTL_SECS {
            return Err(RegistrarError::InvalidArgument(format!(
                "registration interval must be between 1 and {} seconds, got {}",
                crate::MAX_LEASE_TTL_SECS,
                interval_secs
            )));
        }

        let store = self.connector.connect(self.timeouts.dial_timeout).await?;

        let session = Arc::new(Session::new(
            store,
            descriptor,
            interval_secs,
            self.timeouts.request_timeout,
        ));
        let keep_alive = session.register().await?;

        {
            let mut current = self.session.write().await;
            if current.as_ref().is_some_and(|s| !s.is_stopped()) {
                warn!("Replacing a live registration session");
            }
            *current = Some(session.clone());
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(heartbeat::run(
            session,
            keep_alive,
            stop_rx,
            self.timeouts.shutdown_timeout,
        ));

        Ok(StopHandle::new(stop_tx, task))
    }

    /// Parse `raw` as the new weight and publish it.
    ///
    /// Returns the weight that was written.
    pub async fn update_weight(&self, raw: &str) -> Result<i64, RegistrarError> {
        let weight = raw.parse::<i64>().map_err(|e| {
            RegistrarError::InvalidArgument(format!("invalid weight {:?}: {}", raw, e))
        })?;

        self.set_weight(weight).await?;
        Ok(weight)
    }

    /// Publish a new weight under the current lease
    pub async fn set_weight(&self, weight: i64) -> Result<(), RegistrarError> {
        let session = self.current_session().await?;
        session.publish_weight(weight).await?;

        info!("Updated weight of {} to {}", session.key(), weight);
        Ok(())
    }

    /// Read back the published descriptor.
    ///
    /// While registered, an absent key yields the last descriptor this
    /// registrar published. After the session has stopped it yields `None`.
    pub async fn get_server_info(&self) -> Result<Option<ServiceDescriptor>, RegistrarError> {
        self.current_session().await?.read_back().await
    }

    /// Lease currently held, if any
    pub async fn lease_id(&self) -> Option<LeaseId> {
        self.session.read().await.as_ref().and_then(|s| s.lease())
    }

    /// In-memory copy of the descriptor being published
    pub async fn descriptor(&self) -> Option<ServiceDescriptor> {
        let session = self.session.read().await.clone()?;
        Some(session.descriptor().await)
    }

    async fn current_session(&self) -> Result<Arc<Session>, RegistrarError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(RegistrarError::NotRegistered)
    }
}
