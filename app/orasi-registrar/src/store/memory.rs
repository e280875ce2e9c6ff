//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! In-process coordination store
//!
//! Implements leases with TTL expiry on the tokio clock, so tests running
//! with paused time see leases expire and renew deterministically. Faults
//! can be injected to simulate an unreachable store, lost leases and failed
//! writes.

use super::renewal_period;
use super::trait_def::{CoordinationStore, KeepAliveStream, StoreConnector};
use crate::error::RegistrarError;
use crate::types::{LeaseId, LeaseKeepAlive};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::debug;

const KEEP_ALIVE_BUFFER: usize = 16;

/// Number of calls made against a [`MemoryStore`], per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub connects: usize,
    pub grants: usize,
    pub keep_alives: usize,
    pub puts: usize,
    pub gets: usize,
    pub deletes: usize,
    pub revokes: usize,
}

impl StoreCalls {
    /// Total number of calls of any kind
    pub fn total(&self) -> usize {
        self.connects
            + self.grants
            + self.keep_alives
            + self.puts
            + self.gets
            + self.deletes
            + self.revokes
    }
}

#[derive(Debug)]
struct Entry {
    value: Vec<u8>,
    lease: Option<LeaseId>,
}

#[derive(Debug)]
struct LeaseRecord {
    ttl_secs: i64,
    expires_at: Instant,
    keepers: Vec<mpsc::Sender<LeaseKeepAlive>>,
}

#[derive(Debug, Default)]
struct Faults {
    unavailable: bool,
    stalled: bool,
    failing_grants: usize,
    failing_puts: usize,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_lease: i64,
    entries: HashMap<String, Entry>,
    leases: HashMap<LeaseId, LeaseRecord>,
    faults: Faults,
    calls: StoreCalls,
}

impl MemoryState {
    fn check_available(&self) -> Result<(), RegistrarError> {
        if self.faults.unavailable {
            return Err(RegistrarError::Store("store unavailable".to_string()));
        }
        Ok(())
    }

    /// Drop leases whose TTL ran out, together with their keys
    fn purge_expired(&mut self, now: Instant) {
        let expired: Vec<LeaseId> = self
            .leases
            .iter()
            .filter(|(_, record)| record.expires_at <= now)
            .map(|(id, _)| *id)
            .collect();

        for lease in expired {
            debug!("Lease {} expired", lease);
            self.remove_lease(lease);
        }
    }

    fn remove_lease(&mut self, lease: LeaseId) -> bool {
        let removed = self.leases.remove(&lease).is_some();
        self.entries.retain(|_, entry| entry.lease != Some(lease));
        removed
    }
}

/// In-memory store with leases and fault injection
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call, including dialing, fail until cleared.
    ///
    /// Open keep-alive streams are closed, as a dropped connection would.
    pub async fn set_unavailable(&self, unavailable: bool) {
        let mut state = self.state.lock().await;
        state.faults.unavailable = unavailable;
        if unavailable {
            for record in state.leases.values_mut() {
                record.keepers.clear();
            }
        }
    }

    /// Make every call hang until the future is dropped
    pub async fn set_stalled(&self, stalled: bool) {
        self.state.lock().await.faults.stalled = stalled;
    }

    /// Fail the next `count` lease grants
    pub async fn fail_next_grants(&self, count: usize) {
        self.state.lock().await.faults.failing_grants = count;
    }

    /// Fail the next `count` puts
    pub async fn fail_next_puts(&self, count: usize) {
        self.state.lock().await.faults.failing_puts = count;
    }

    /// Drop a lease as if it had expired server-side
    pub async fn expire_lease(&self, lease: LeaseId) -> bool {
        self.state.lock().await.remove_lease(lease)
    }

    /// Leases currently held
    pub async fn active_leases(&self) -> Vec<LeaseId> {
        let mut state = self.state.lock().await;
        state.purge_expired(Instant::now());
        state.leases.keys().copied().collect()
    }

    /// Lease a key is attached to
    pub async fn lease_of(&self, key: &str) -> Option<LeaseId> {
        let mut state = self.state.lock().await;
        state.purge_expired(Instant::now());
        state.entries.get(key).and_then(|entry| entry.lease)
    }

    /// Read a value without counting the call
    pub async fn peek(&self, key: &str) -> Option<Vec<u8>> {
        let mut state = self.state.lock().await;
        state.purge_expired(Instant::now());
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Snapshot of the call counters
    pub async fn calls(&self) -> StoreCalls {
        self.state.lock().await.calls
    }

    /// Count a call and apply connection-level faults
    async fn enter(
        &self,
        record: impl FnOnce(&mut StoreCalls),
    ) -> Result<MutexGuard<'_, MemoryState>, RegistrarError> {
        let mut state = self.state.lock().await;
        record(&mut state.calls);

        if state.faults.stalled {
            drop(state);
            return std::future::pending().await;
        }

        state.check_available()?;
        Ok(state)
    }

    async fn renew_loop(state: Arc<Mutex<MemoryState>>, lease: LeaseId, ttl_secs: i64) {
        let period = renewal_period(ttl_secs);
        loop {
            tokio::time::sleep(period).await;

            let mut state = state.lock().await;
            if state.faults.unavailable {
                return;
            }

            let now = Instant::now();
            state.purge_expired(now);
            let Some(record) = state.leases.get_mut(&lease) else {
                return;
            };

            record.keepers.retain(|keeper| !keeper.is_closed());
            if record.keepers.is_empty() {
                return;
            }

            record.expires_at = now + Duration::from_secs(record.ttl_secs as u64);
            let ack = LeaseKeepAlive {
                id: lease,
                ttl: record.ttl_secs,
            };
            for keeper in &record.keepers {
                let _ = keeper.try_send(ack);
            }
        }
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    async fn connect(
        &self,
        _dial_timeout: Duration,
    ) -> Result<Arc<dyn CoordinationStore>, RegistrarError> {
        drop(self.enter(|calls| calls.connects += 1).await?);
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl CoordinationStore for MemoryStore {
    async fn grant(&self, ttl_secs: i64) -> Result<LeaseId, RegistrarError> {
        let mut state = self.enter(|calls| calls.grants += 1).await?;

        if state.faults.failing_grants > 0 {
            state.faults.failing_grants -= 1;
            return Err(RegistrarError::Store("lease grant rejected".to_string()));
        }

        if ttl_secs <= 0 {
            return Err(RegistrarError::Store(format!(
                "invalid lease TTL: {}",
                ttl_secs
            )));
        }

        let now = Instant::now();
        state.purge_expired(now);
        state.next_lease += 1;
        let lease = LeaseId(state.next_lease);
        state.leases.insert(
            lease,
            LeaseRecord {
                ttl_secs,
                expires_at: now + Duration::from_secs(ttl_secs as u64),
                keepers: Vec::new(),
            },
        );

        Ok(lease)
    }

    async fn keep_alive(&self, lease: LeaseId) -> Result<KeepAliveStream, RegistrarError> {
        let mut state = self.enter(|calls| calls.keep_alives += 1).await?;
        state.purge_expired(Instant::now());

        let record = state
            .leases
            .get_mut(&lease)
            .ok_or_else(|| RegistrarError::Store(format!("lease {} not found", lease)))?;

        let (tx, stream) = KeepAliveStream::channel(lease, KEEP_ALIVE_BUFFER);
        record.keepers.push(tx);
        let ttl_secs = record.ttl_secs;

        tokio::spawn(Self::renew_loop(self.state.clone(), lease, ttl_secs));
        Ok(stream)
    }

    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        lease: Option<LeaseId>,
    ) -> Result<(), RegistrarError> {
        let mut state = self.enter(|calls| calls.puts += 1).await?;

        if state.faults.failing_puts > 0 {
            state.faults.failing_puts -= 1;
            return Err(RegistrarError::Store(format!("put {} rejected", key)));
        }

        state.purge_expired(Instant::now());
        if let Some(lease) = lease {
            if !state.leases.contains_key(&lease) {
                return Err(RegistrarError::Store(format!(
                    "lease {} not found",
                    lease
                )));
            }
        }

        state
            .entries
            .insert(key.to_string(), Entry { value, lease });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, RegistrarError> {
        let mut state = self.enter(|calls| calls.gets += 1).await?;
        state.purge_expired(Instant::now());

        Ok(state.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<(), RegistrarError> {
        let mut state = self.enter(|calls| calls.deletes += 1).await?;

        state.entries.remove(key);
        Ok(())
    }

    async fn revoke(&self, lease: LeaseId) -> Result<(), RegistrarError> {
        let mut state = self.enter(|calls| calls.revokes += 1).await?;
        state.purge_expired(Instant::now());

        if !state.remove_lease(lease) {
            return Err(RegistrarError::Store(format!("lease {} not found", lease)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_key_disappears_when_lease_expires() {
        let store = MemoryStore::new();
        let lease = store.grant(5).await.unwrap();
        store.put("/svc/a", b"a".to_vec(), Some(lease)).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(store.get("/svc/a").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("/svc/a").await.unwrap().is_none());
        assert!(store.active_leases().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_alive_renews_lease() {
        let store = MemoryStore::new();
        let lease = store.grant(3).await.unwrap();
        store.put("/svc/a", b"a".to_vec(), Some(lease)).await.unwrap();
        let mut stream = store.keep_alive(lease).await.unwrap();

        for _ in 0..5 {
            let ack = stream.next().await.unwrap();
            assert_eq!(ack.id, lease);
            assert_eq!(ack.ttl, 3);
        }

        assert!(store.peek("/svc/a").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_lease_closes_stream() {
        let store = MemoryStore::new();
        let lease = store.grant(10).await.unwrap();
        store.put("/svc/a", b"a".to_vec(), Some(lease)).await.unwrap();
        let mut stream = store.keep_alive(lease).await.unwrap();

        assert!(store.expire_lease(lease).await);
        assert!(stream.next().await.is_none());
        assert!(store.peek("/svc/a").await.is_none());
    }

    #[tokio::test]
    async fn test_revoke_deletes_attached_keys() {
        let store = MemoryStore::new();
        let lease = store.grant(10).await.unwrap();
        store.put("/svc/a", b"a".to_vec(), Some(lease)).await.unwrap();
        store.put("/svc/b", b"b".to_vec(), None).await.unwrap();

        store.revoke(lease).await.unwrap();

        assert!(store.get("/svc/a").await.unwrap().is_none());
        assert!(store.get("/svc/b").await.unwrap().is_some());
        assert!(store.revoke(lease).await.is_err());
    }

    #[tokio::test]
    async fn test_put_with_unknown_lease_fails() {
        let store = MemoryStore::new();
        let err = store
            .put("/svc/a", b"a".to_vec(), Some(LeaseId(42)))
            .await
            .unwrap_err();
        assert!(err.is_store());
    }

    #[tokio::test]
    async fn test_unavailable_store_rejects_calls() {
        let store = MemoryStore::new();
        store.set_unavailable(true).await;

        assert!(store.connect(Duration::from_secs(3)).await.is_err());
        assert!(store.grant(5).await.is_err());

        store.set_unavailable(false).await;
        assert!(store.grant(5).await.is_ok());

        let calls = store.calls().await;
        assert_eq!(calls.connects, 1);
        assert_eq!(calls.grants, 2);
    }
}
