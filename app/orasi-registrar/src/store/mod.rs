//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Coordination store backends

pub mod etcd;
pub mod factory;
pub mod memory;
pub mod trait_def;

pub use etcd::{EtcdConnector, EtcdStore};
pub use factory::StoreFactory;
pub use memory::{MemoryStore, StoreCalls};
pub use trait_def::{CoordinationStore, KeepAliveStream, StoreConnector};

/// Renewal period for a lease with the given TTL.
///
/// A third of the TTL, so a renewal always lands before the lease expires,
/// even for one-second leases.
pub(crate) fn renewal_period(ttl_secs: i64) -> std::time::Duration {
    let ttl_millis = (ttl_secs.max(0) as u64).saturating_mul(1000);
    std::time::Duration::from_millis((ttl_millis / 3).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_renewal_period_is_shorter_than_ttl() {
        assert_eq!(renewal_period(1), Duration::from_millis(333));
        assert_eq!(renewal_period(3), Duration::from_secs(1));
        assert_eq!(renewal_period(10), Duration::from_millis(3333));

        for ttl in 1..=30 {
            assert!(renewal_period(ttl) < Duration::from_secs(ttl as u64));
        }
    }

    #[test]
    fn test_renewal_period_never_zero() {
        assert_eq!(renewal_period(0), Duration::from_millis(1));
        assert_eq!(renewal_period(-5), Duration::from_millis(1));
    }
}
