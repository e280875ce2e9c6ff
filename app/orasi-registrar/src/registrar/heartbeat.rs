//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Heartbeat loop
//!
//! The loop is ACTIVE while it holds a keep-alive stream and DEGRADED once
//! the stream has ended. Renewal itself happens through the stream; the
//! timer only retries registration while DEGRADED.

use super::session::Session;
use crate::store::KeepAliveStream;
use crate::types::LeaseKeepAlive;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, trace, warn};

/// Run until the stop signal fires or its sender is dropped
pub(crate) async fn run(
    session: Arc<Session>,
    keep_alive: KeepAliveStream,
    mut stop_rx: oneshot::Receiver<()>,
    shutdown_timeout: Duration,
) {
    let period = session.interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut keep_alive = Some(keep_alive);

    loop {
        tokio::select! {
            biased;

            _ = &mut stop_rx => break,

            ack = next_ack(&mut keep_alive) => match ack {
                Some(ack) => trace!("Lease {} renewed, ttl {}s", ack.id, ack.ttl),
                None => {
                    warn!("Keep-alive stream for {} closed, registering again", session.key());
                    match reregister(&session, &mut stop_rx).await {
                        Attempt::Done(next) => keep_alive = next,
                        Attempt::Stopped => break,
                    }
                }
            },

            _ = ticker.tick() => {
                if keep_alive.is_none() {
                    match reregister(&session, &mut stop_rx).await {
                        Attempt::Done(next) => keep_alive = next,
                        Attempt::Stopped => break,
                    }
                }
            }
        }
    }

    info!("Stopping registration of {}", session.key());
    session.shutdown(shutdown_timeout).await;
}

enum Attempt {
    Done(Option<KeepAliveStream>),
    Stopped,
}

/// Next acknowledgement, or pending forever while there is no stream
async fn next_ack(keep_alive: &mut Option<KeepAliveStream>) -> Option<LeaseKeepAlive> {
    match keep_alive {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

/// Register again, abandoning the attempt if a stop arrives first
async fn reregister(session: &Session, stop_rx: &mut oneshot::Receiver<()>) -> Attempt {
    tokio::select! {
        biased;

        _ = stop_rx => Attempt::Stopped,

        result = session.register() => match result {
            Ok(stream) => Attempt::Done(Some(stream)),
            Err(e) => {
                error!("register failed, error: {}", e);
                Attempt::Done(None)
            }
        },
    }
}
