//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Store connector factory

use super::etcd::EtcdConnector;
use super::memory::MemoryStore;
use super::trait_def::StoreConnector;
use crate::config::{RegistrarConfig, StoreBackend};
use std::sync::Arc;
use tracing::info;

/// Factory for creating store connectors
pub struct StoreFactory;

impl StoreFactory {
    pub fn create_connector(config: &RegistrarConfig) -> Arc<dyn StoreConnector> {
        match config.backend {
            StoreBackend::Etcd => {
                info!("Using etcd store at {:?}", config.etcd_endpoints);
                Arc::new(EtcdConnector::new(config.etcd_endpoints.clone()))
            }
            StoreBackend::Memory => {
                info!("Using in-memory store; registrations are local to this process");
                Arc::new(MemoryStore::new())
            }
        }
    }
}
