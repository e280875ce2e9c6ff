//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! etcd coordination store

use super::renewal_period;
use super::trait_def::{CoordinationStore, KeepAliveStream, StoreConnector};
use crate::error::RegistrarError;
use crate::types::{LeaseId, LeaseKeepAlive};
use async_trait::async_trait;
use etcd_client::{
    Client, ConnectOptions, DeleteOptions, LeaseKeepAliveStream, LeaseKeeper, PutOptions,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

const KEEP_ALIVE_BUFFER: usize = 16;

/// Dials etcd clusters
pub struct EtcdConnector {
    endpoints: Vec<String>,
}

impl EtcdConnector {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl StoreConnector for EtcdConnector {
    async fn connect(
        &self,
        dial_timeout: Duration,
    ) -> Result<Arc<dyn CoordinationStore>, RegistrarError> {
        let connect_options = ConnectOptions::new()
            .with_connect_timeout(dial_timeout)
            .with_keep_alive(Duration::from_secs(30), Duration::from_secs(10));

        let client = tokio::time::timeout(
            dial_timeout,
            Client::connect(self.endpoints.clone(), Some(connect_options)),
        )
        .await
        .map_err(|_| {
            RegistrarError::Store(format!(
                "Timed out connecting to etcd after {:?}",
                dial_timeout
            ))
        })?
        .map_err(|e| RegistrarError::Store(format!("Failed to connect to etcd: {}", e)))?;

        info!("Connected to etcd at {:?}", self.endpoints);
        Ok(Arc::new(EtcdStore::new(client)))
    }
}

/// etcd client wrapper
///
/// `Client` is a cheap handle over shared channels, so every call works on a
/// clone and the store can be used from many tasks at once.
#[derive(Clone)]
pub struct EtcdStore {
    client: Client,
}

impl EtcdStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CoordinationStore for EtcdStore {
    async fn grant(&self, ttl_secs: i64) -> Result<LeaseId, RegistrarError> {
        let mut client = self.client.clone();
        let lease = client.lease_grant(ttl_secs, None).await.map_err(|e| {
            RegistrarError::Store(format!("Failed to create etcd lease: {}", e))
        })?;

        Ok(LeaseId(lease.id()))
    }

    async fn keep_alive(&self, lease: LeaseId) -> Result<KeepAliveStream, RegistrarError> {
        let mut client = self.client.clone();
        let (keeper, responses) = client.lease_keep_alive(lease.0).await.map_err(|e| {
            RegistrarError::Store(format!("Failed to keep etcd lease alive: {}", e))
        })?;

        let (acks, stream) = KeepAliveStream::channel(lease, KEEP_ALIVE_BUFFER);
        tokio::spawn(pump_keep_alive(lease, keeper, responses, acks));

        Ok(stream)
    }

    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        lease: Option<LeaseId>,
    ) -> Result<(), RegistrarError> {
        let mut client = self.client.clone();
        let put_options = match lease {
            Some(lease) => PutOptions::new().with_lease(lease.0),
            None => PutOptions::new(),
        };

        client
            .put(key, value, Some(put_options))
            .await
            .map_err(|e| RegistrarError::Store(format!("Failed to put {} in etcd: {}", key, e)))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RegistrarError> {
        let mut client = self.client.clone();
        let response = client
            .get(key, None)
            .await
            .map_err(|e| RegistrarError::Store(format!("Failed to get {} from etcd: {}", key, e)))?;

        Ok(response.kvs().first().map(|kv| kv.value().to_vec()))
    }

    async fn delete(&self, key: &str) -> Result<(), RegistrarError> {
        let mut client = self.client.clone();
        client
            .delete(key, Some(DeleteOptions::new()))
            .await
            .map_err(|e| {
                RegistrarError::Store(format!("Failed to delete {} from etcd: {}", key, e))
            })?;
        Ok(())
    }

    async fn revoke(&self, lease: LeaseId) -> Result<(), RegistrarError> {
        let mut client = self.client.clone();
        client.lease_revoke(lease.0).await.map_err(|e| {
            RegistrarError::Store(format!("Failed to revoke etcd lease {}: {}", lease, e))
        })?;
        Ok(())
    }
}

/// Drive renewals for one lease and forward the acknowledgements.
///
/// Returns, closing the stream, when etcd reports the lease gone, when the
/// gRPC stream fails, or when the receiving side is dropped.
async fn pump_keep_alive(
    lease: LeaseId,
    mut keeper: LeaseKeeper,
    mut responses: LeaseKeepAliveStream,
    acks: mpsc::Sender<LeaseKeepAlive>,
) {
    loop {
        if let Err(e) = keeper.keep_alive().await {
            warn!("Failed to send keep-alive for lease {}: {}", lease, e);
            return;
        }

        let response = match responses.message().await {
            Ok(Some(response)) => response,
            Ok(None) => {
                debug!("etcd closed keep-alive stream for lease {}", lease);
                return;
            }
            Err(e) => {
                warn!("Keep-alive stream for lease {} failed: {}", lease, e);
                return;
            }
        };

        if response.ttl() <= 0 {
            warn!("Lease {} expired in etcd", lease);
            return;
        }

        let ack = LeaseKeepAlive {
            id: lease,
            ttl: response.ttl(),
        };
        match acks.try_send(ack) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Closed(_)) => return,
        }

        tokio::select! {
            _ = acks.closed() => return,
            _ = tokio::time::sleep(renewal_period(response.ttl())) => {}
        }
    }
}
