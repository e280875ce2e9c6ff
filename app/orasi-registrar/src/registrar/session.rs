//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Registration session state and the lease controller

use crate::error::RegistrarError;
use crate::store::{CoordinationStore, KeepAliveStream};
use crate::types::{LeaseId, ServiceDescriptor};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Lease ids are never zero in etcd, so zero marks "no lease yet"
const NO_LEASE: i64 = 0;

/// State for one successful `register` call.
///
/// The descriptor's name, version and address are fixed for the session, so
/// the key is computed once. Only the weight changes afterwards.
pub(crate) struct Session {
    store: Arc<dyn CoordinationStore>,
    descriptor: RwLock<ServiceDescriptor>,
    key: String,
    interval: Duration,
    ttl_secs: i64,
    request_timeout: Duration,
    lease: AtomicI64,
    stopped: AtomicBool,
}

impl Session {
    pub(crate) fn new(
        store: Arc<dyn CoordinationStore>,
        descriptor: ServiceDescriptor,
        interval_secs: u64,
        request_timeout: Duration,
    ) -> Self {
        debug_assert!(interval_secs > 0 && interval_secs <= crate::MAX_LEASE_TTL_SECS);

        Self {
            store,
            key: descriptor.register_path(),
            descriptor: RwLock::new(descriptor),
            interval: Duration::from_secs(interval_secs),
            ttl_secs: interval_secs as i64,
            request_timeout,
            lease: AtomicI64::new(NO_LEASE),
            stopped: AtomicBool::new(false),
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn interval(&self) -> Duration {
        self.interval
    }

    pub(crate) fn lease(&self) -> Option<LeaseId> {
        match self.lease.load(Ordering::SeqCst) {
            NO_LEASE => None,
            id => Some(LeaseId(id)),
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub(crate) async fn descriptor(&self) -> ServiceDescriptor {
        self.descriptor.read().await.clone()
    }

    /// Grant a lease, start renewing it and publish the descriptor under it.
    ///
    /// Each store call is bounded by the request timeout. The lease id is
    /// recorded as soon as it is granted. If a later step fails the lease is
    /// left to expire and the caller retries.
    pub(crate) async fn register(&self) -> Result<KeepAliveStream, RegistrarError> {
        let lease = self
            .bounded("lease grant", self.store.grant(self.ttl_secs))
            .await?;
        self.lease.store(lease.0, Ordering::SeqCst);

        let keep_alive = self
            .bounded("lease keep-alive", self.store.keep_alive(lease))
            .await?;

        let value = self.descriptor.read().await.to_bytes()?;
        self.bounded("descriptor put", self.store.put(&self.key, value, Some(lease)))
            .await?;

        info!("Registered {} with lease {}", self.key, lease);
        Ok(keep_alive)
    }

    async fn bounded<T>(
        &self,
        step: &str,
        call: impl Future<Output = Result<T, RegistrarError>>,
    ) -> Result<T, RegistrarError> {
        tokio::time::timeout(self.request_timeout, call)
            .await
            .map_err(|_| {
                RegistrarError::Store(format!(
                    "{} timed out after {:?}",
                    step, self.request_timeout
                ))
            })?
    }

    /// Set the weight and republish under the current lease
    pub(crate) async fn publish_weight(&self, weight: i64) -> Result<(), RegistrarError> {
        let value = {
            let mut descriptor = self.descriptor.write().await;
            descriptor.weight = weight;
            descriptor.to_bytes()?
        };

        self.bounded("weight put", self.store.put(&self.key, value, self.lease()))
            .await
    }

    /// Read the published descriptor back from the store
    pub(crate) async fn read_back(&self) -> Result<Option<ServiceDescriptor>, RegistrarError> {
        match self.store.get(&self.key).await? {
            Some(bytes) => ServiceDescriptor::from_bytes(&bytes).map(Some),
            None if self.is_stopped() => Ok(None),
            None => Ok(Some(self.descriptor().await)),
        }
    }

    /// Delete the key and revoke the lease, logging failures.
    ///
    /// The whole sequence is bounded by `deadline`; the session counts as
    /// stopped afterwards whether or not cleanup finished.
    pub(crate) async fn shutdown(&self, deadline: Duration) {
        let cleanup = async {
            if let Err(e) = self.store.delete(&self.key).await {
                error!("unregister failed, error: {}", e);
            }

            if let Some(lease) = self.lease() {
                if let Err(e) = self.store.revoke(lease).await {
                    error!("revoke failed, error: {}", e);
                }
            }
        };

        if let Err(e) = tokio::time::timeout(deadline, cleanup)
            .await
            .map_err(RegistrarError::from)
        {
            error!("Cleanup of {} abandoned after {:?}: {}", self.key, deadline, e);
        }

        self.stopped.store(true, Ordering::SeqCst);
        debug!("Registration session for {} stopped", self.key);
    }
}
