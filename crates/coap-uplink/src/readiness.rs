// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Network-readiness signal consumed by the dispatcher.
//!
//! The dispatcher only reads readiness. Association management (connect,
//! reconnect, backoff) lives outside this crate and drives a
//! [`ReadinessSignal`] through `set_ready` / `set_unavailable`.
//!
//! # Architecture
//! - Atomic flag for lock-free `is_ready` queries
//! - Condvar for the bounded blocking wait

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Read-only view of the network association state.
pub trait NetworkReadiness: Send + Sync {
    /// Current state, without blocking.
    fn is_ready(&self) -> bool;

    /// Block up to `timeout` for the network to become ready.
    ///
    /// Returns `true` as soon as it is ready, `false` once the bound elapses.
    fn wait_ready(&self, timeout: Duration) -> bool;
}

/// Binary readiness flag with a bounded wait.
///
/// # Example
/// ```
/// use coap_uplink::readiness::{NetworkReadiness, ReadinessSignal};
/// use std::time::Duration;
///
/// let signal = ReadinessSignal::shared();
/// assert!(!signal.wait_ready(Duration::from_millis(5)));
///
/// signal.set_ready();
/// assert!(signal.wait_ready(Duration::from_millis(5)));
/// ```
#[derive(Debug, Default)]
pub struct ReadinessSignal {
    /// Lock-free copy of the state for `is_ready`
    ready: AtomicBool,
    /// Authoritative state, guarded for the condvar
    state: Mutex<bool>,
    condvar: Condvar,
}

impl ReadinessSignal {
    /// New signal in the "not ready" state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Mark the network ready and wake every waiter.
    pub fn set_ready(&self) {
        self.set(true);
    }

    pub fn set_unavailable(&self) {
        self.set(false);
    }

    /// Update the state. Returns the previous value.
    pub fn set(&self, ready: bool) -> bool {
        let mut state = self.state.lock();
        let previous = *state;
        *state = ready;
        self.ready.store(ready, Ordering::Release);
        if ready && !previous {
            self.condvar.notify_all();
        }
        previous
    }
}

impl NetworkReadiness for ReadinessSignal {
    #[inline]
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn wait_ready(&self, timeout: Duration) -> bool {
        // Fast-path: no lock when already up
        if self.is_ready() {
            return true;
        }

        let mut state = self.state.lock();
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            // Unrepresentable deadline: wait without bound
            while !*state {
                self.condvar.wait(&mut state);
            }
            return true;
        };

        // Loop guards against spurious wakeups and a ready/unavailable flap
        while !*state {
            if self.condvar.wait_until(&mut state, deadline).timed_out() {
                return *state;
            }
        }
        true
    }
}

/// Readiness that never blocks. For wired hosts and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

impl NetworkReadiness for AlwaysReady {
    fn is_ready(&self) -> bool {
        true
    }

    fn wait_ready(&self, _timeout: Duration) -> bool {
        true
    }
}

impl<T: NetworkReadiness + ?Sized> NetworkReadiness for Arc<T> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn wait_ready(&self, timeout: Duration) -> bool {
        (**self).wait_ready(timeout)
    }
}
