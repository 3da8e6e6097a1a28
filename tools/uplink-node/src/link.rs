// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Link monitor.
//!
//! Background thread that probes the route to the collector and drives the
//! [`ReadinessSignal`] the dispatcher waits on. While the link is down,
//! probes back off linearly (2 s + 1 s per failed attempt, capped).

use coap_uplink::ReadinessSignal;
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// First retry delay after the link drops.
const RETRY_BASE: Duration = Duration::from_millis(2000);
/// Added per consecutive failure.
const RETRY_STEP: Duration = Duration::from_millis(1000);
/// Failures after which the delay stops growing.
const MAX_BACKOFF_STEPS: u32 = 5;

/// One reachability check.
pub trait LinkProbe: Send {
    fn probe(&mut self) -> bool;
}

/// Checks that the OS has a route to `target`.
///
/// Connects an unbound UDP socket; no datagram is sent.
#[derive(Debug, Clone)]
pub struct RouteProbe {
    target: SocketAddr,
}

impl RouteProbe {
    pub fn new(target: SocketAddr) -> Self {
        Self { target }
    }
}

impl LinkProbe for RouteProbe {
    fn probe(&mut self) -> bool {
        let bind: SocketAddr = if self.target.is_ipv4() {
            (std::net::Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        match UdpSocket::bind(bind).and_then(|s| s.connect(self.target)) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(target_addr = %self.target, error = %e, "Route probe failed");
                false
            }
        }
    }
}

/// Delay before the next probe.
pub fn next_probe_delay(interval: Duration, failures: u32) -> Duration {
    if failures == 0 {
        return interval;
    }
    let steps = failures.min(MAX_BACKOFF_STEPS) - 1;
    interval.max(RETRY_BASE + RETRY_STEP * steps)
}

/// Handle to the running monitor thread. Stops the thread on drop.
#[derive(Debug)]
pub struct LinkMonitor {
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl LinkMonitor {
    /// Probe once synchronously, then keep probing on a named thread.
    pub fn spawn<P>(
        mut probe: P,
        signal: Arc<ReadinessSignal>,
        interval: Duration,
    ) -> std::io::Result<Self>
    where
        P: LinkProbe + 'static,
    {
        // Stop channel: dropping the sender also ends the loop
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);

        let initial = probe.probe();
        signal.set(initial);
        tracing::info!(ready = initial, "Link monitor started");

        let thread = std::thread::Builder::new()
            .name("uplink-link".into())
            .spawn(move || {
                let mut failures: u32 = if initial { 0 } else { 1 };

                loop {
                    match stop_rx.recv_timeout(next_probe_delay(interval, failures)) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }

                    let up = probe.probe();
                    let was_up = signal.set(up);
                    if up {
                        if !was_up {
                            tracing::info!(retries = failures, "Link up");
                        }
                        failures = 0;
                    } else {
                        failures = failures.saturating_add(1);
                        if was_up {
                            tracing::warn!("Link down, retrying");
                        } else {
                            tracing::debug!(
                                retry = failures,
                                delay_ms = next_probe_delay(interval, failures).as_millis() as u64,
                                "Link still down"
                            );
                        }
                    }
                }
                tracing::debug!("Link monitor stopped");
            })?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// Signal the thread to exit and wait for it.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for LinkMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
