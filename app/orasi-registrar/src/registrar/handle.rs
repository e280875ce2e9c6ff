//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Caller handle for a running registration

use crate::error::RegistrarError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Stops a registration started by [`crate::Registrar::register`].
///
/// Stopping deletes the published key and revokes the lease. Dropping the
/// handle has the same effect as calling [`StopHandle::stop`].
#[derive(Debug)]
pub struct StopHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl StopHandle {
    pub(crate) fn new(stop_tx: oneshot::Sender<()>, task: JoinHandle<()>) -> Self {
        Self {
            stop_tx: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Request shutdown. Returns `false` if it was already requested.
    pub fn stop(&mut self) -> bool {
        match self.stop_tx.take() {
            Some(stop_tx) => {
                // The loop only exits after receiving a stop, so a send
                // failure means it has already gone.
                let _ = stop_tx.send(());
                true
            }
            None => false,
        }
    }

    /// Whether shutdown has been requested through this handle
    pub fn is_stop_requested(&self) -> bool {
        self.stop_tx.is_none()
    }

    /// Wait for the heartbeat task to finish its cleanup
    pub async fn stopped(&mut self) -> Result<(), RegistrarError> {
        if let Some(task) = self.task.take() {
            task.await.map_err(|e| {
                RegistrarError::Internal(format!("heartbeat task failed: {}", e))
            })?;
        }
        Ok(())
    }

    /// Request shutdown and wait for it to complete
    pub async fn shutdown(mut self) -> Result<(), RegistrarError> {
        self.stop();
        self.stopped().await
    }
}
