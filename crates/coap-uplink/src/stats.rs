// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dispatch statistics

// Use AtomicU64 on 64-bit, AtomicU32 on 32-bit (ESP32, etc.)
#[cfg(not(target_pointer_width = "64"))]
use std::sync::atomic::AtomicU32 as AtomicCounter;
#[cfg(target_pointer_width = "64")]
use std::sync::atomic::AtomicU64 as AtomicCounter;

#[cfg(target_pointer_width = "64")]
pub type CounterValue = u64;
#[cfg(not(target_pointer_width = "64"))]
pub type CounterValue = u32;

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crate::error::SendError;

/// Counters shared by every dispatch issued from one [`Dispatcher`](crate::Dispatcher).
#[derive(Debug)]
pub struct DispatchStats {
    /// Send attempts started
    pub attempts: AtomicCounter,
    /// Datagrams fully handed to the network
    pub sent: AtomicCounter,
    pub bytes_sent: AtomicCounter,
    pub parse_errors: AtomicCounter,
    pub encode_errors: AtomicCounter,
    pub address_errors: AtomicCounter,
    pub transmit_errors: AtomicCounter,
    /// Readiness waits that hit their bound
    pub network_unavailable: AtomicCounter,
    pub scheduler_errors: AtomicCounter,
    start_time: Instant,
}

impl Default for DispatchStats {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchStats {
    pub fn new() -> Self {
        Self {
            attempts: AtomicCounter::new(0),
            sent: AtomicCounter::new(0),
            bytes_sent: AtomicCounter::new(0),
            parse_errors: AtomicCounter::new(0),
            encode_errors: AtomicCounter::new(0),
            address_errors: AtomicCounter::new(0),
            transmit_errors: AtomicCounter::new(0),
            network_unavailable: AtomicCounter::new(0),
            scheduler_errors: AtomicCounter::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a new attempt. Returns its sequence number, starting at 1.
    pub fn record_attempt(&self) -> CounterValue {
        self.attempts.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_sent(&self, bytes: usize) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent
            .fetch_add(bytes as CounterValue, Ordering::Relaxed);
    }

    /// Bump the counter matching the failure kind.
    pub fn record_failure(&self, error: &SendError) {
        let counter = match error {
            SendError::Parse(_) => &self.parse_errors,
            SendError::Encode(_) => &self.encode_errors,
            SendError::Address(_) => &self.address_errors,
            SendError::Transmit(_) => &self.transmit_errors,
            SendError::NetworkUnavailable(_) => &self.network_unavailable,
            SendError::Scheduler(_) => &self.scheduler_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            encode_errors: self.encode_errors.load(Ordering::Relaxed),
            address_errors: self.address_errors.load(Ordering::Relaxed),
            transmit_errors: self.transmit_errors.load(Ordering::Relaxed),
            network_unavailable: self.network_unavailable.load(Ordering::Relaxed),
            scheduler_errors: self.scheduler_errors.load(Ordering::Relaxed),
            uptime: self.uptime(),
        }
    }
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStatsSnapshot {
    pub attempts: CounterValue,
    pub sent: CounterValue,
    pub bytes_sent: CounterValue,
    pub parse_errors: CounterValue,
    pub encode_errors: CounterValue,
    pub address_errors: CounterValue,
    pub transmit_errors: CounterValue,
    pub network_unavailable: CounterValue,
    pub scheduler_errors: CounterValue,
    pub uptime: Duration,
}

impl DispatchStatsSnapshot {
    /// Attempts that ended in any error.
    pub fn failures(&self) -> CounterValue {
        self.parse_errors
            + self.encode_errors
            + self.address_errors
            + self.transmit_errors
            + self.network_unavailable
            + self.scheduler_errors
    }

    /// Attempts started but not yet finished.
    pub fn in_flight(&self) -> CounterValue {
        self.attempts
            .saturating_sub(self.sent)
            .saturating_sub(self.failures())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EncodeError, TransmitError};

    #[test]
    fn test_attempt_numbering() {
        let stats = DispatchStats::new();
        assert_eq!(stats.record_attempt(), 1);
        assert_eq!(stats.record_attempt(), 2);
        assert_eq!(stats.snapshot().attempts, 2);
    }

    #[test]
    fn test_failures_by_kind() {
        let stats = DispatchStats::new();
        for _ in 0..3 {
            stats.record_attempt();
        }
        stats.record_failure(&SendError::Encode(EncodeError::PayloadAlreadySet));
        stats.record_failure(&SendError::Transmit(TransmitError::Send("x".into())));
        stats.record_failure(&SendError::NetworkUnavailable(Duration::from_secs(1)));

        let snap = stats.snapshot();
        assert_eq!(snap.encode_errors, 1);
        assert_eq!(snap.transmit_errors, 1);
        assert_eq!(snap.network_unavailable, 1);
        assert_eq!(snap.failures(), 3);
        assert_eq!(snap.in_flight(), 0);
    }

    #[test]
    fn test_sent_bytes() {
        let stats = DispatchStats::new();
        stats.record_attempt();
        stats.record_attempt();
        stats.record_sent(40);
        let snap = stats.snapshot();
        assert_eq!(snap.sent, 1);
        assert_eq!(snap.bytes_sent, 40);
        assert_eq!(snap.in_flight(), 1);
    }
}
