// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Send orchestration.
//!
//! One dispatch runs `Idle -> AwaitingNetwork -> Encoding -> Transmitting -> Done`
//! on its own thread. Every attempt owns a private buffer and socket; the
//! only state shared between attempts is the read-only readiness signal and
//! the statistics counters.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, TryRecvError};

use crate::codec::encode_request;
use crate::config::{ConfigError, UplinkConfig};
use crate::error::SendError;
use crate::readiness::NetworkReadiness;
use crate::stats::{CounterValue, DispatchStats};
use crate::transport::{DatagramTransport, SendReport, UdpTransport};
use crate::uri::EndpointUri;

/// Name given to every dispatch thread.
pub const DISPATCH_THREAD_NAME: &str = "coap-dispatch";

/// Final result of one dispatch.
pub type SendOutcome = Result<SendReport, SendError>;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DispatchState {
    Idle = 0,
    /// Blocked on the readiness signal, bounded by `network_timeout_ms`.
    AwaitingNetwork = 1,
    /// Parsing the endpoint and building the message.
    Encoding = 2,
    /// Single transport call in progress.
    Transmitting = 3,
    Done = 4,
}

impl DispatchState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::AwaitingNetwork,
            2 => Self::Encoding,
            3 => Self::Transmitting,
            _ => Self::Done,
        }
    }

    /// Whether `next` is a legal successor. Any non-terminal state may
    /// short-circuit to `Done`.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::AwaitingNetwork)
                | (Self::AwaitingNetwork, Self::Encoding)
                | (Self::Encoding, Self::Transmitting)
                | (Self::Idle, Self::Done)
                | (Self::AwaitingNetwork, Self::Done)
                | (Self::Encoding, Self::Done)
                | (Self::Transmitting, Self::Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingNetwork => "awaiting-network",
            Self::Encoding => "encoding",
            Self::Transmitting => "transmitting",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// State shared between a dispatch thread and its handle.
#[derive(Debug)]
struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(DispatchState::Idle as u8))
    }

    fn get(&self) -> DispatchState {
        DispatchState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn advance(&self, next: DispatchState, attempt: CounterValue) {
        let current = self.get();
        debug_assert!(
            current.can_transition_to(next),
            "illegal dispatch transition {} -> {}",
            current,
            next
        );
        self.0.store(next as u8, Ordering::Release);
        log::debug!("dispatch #{}: {} -> {}", attempt, current, next);
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Issues telemetry sends without blocking the caller.
///
/// Cloning is cheap; clones share configuration, collaborators and stats.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<UplinkConfig>,
    readiness: Arc<dyn NetworkReadiness>,
    transport: Arc<dyn DatagramTransport>,
    stats: Arc<DispatchStats>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Dispatcher sending over UDP.
    pub fn new<R>(config: UplinkConfig, readiness: R) -> Result<Self, ConfigError>
    where
        R: NetworkReadiness + 'static,
    {
        let transport = UdpTransport::from_config(&config);
        Self::with_transport(config, readiness, transport)
    }

    /// Dispatcher with a caller-supplied transport.
    pub fn with_transport<R, T>(
        config: UplinkConfig,
        readiness: R,
        transport: T,
    ) -> Result<Self, ConfigError>
    where
        R: NetworkReadiness + 'static,
        T: DatagramTransport + 'static,
    {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            readiness: Arc::new(readiness),
            transport: Arc::new(transport),
            stats: Arc::new(DispatchStats::new()),
        })
    }

    pub fn config(&self) -> &UplinkConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    /// Start one send on a background thread and return immediately.
    ///
    /// The returned handle may be dropped for fire-and-forget use; the send
    /// still runs to completion and is counted in [`stats`](Self::stats).
    pub fn dispatch(
        &self,
        endpoint: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> DispatchHandle {
        let (tx, rx) = channel::bounded(1);
        let state = Arc::new(StateCell::new());

        let endpoint = endpoint.into();
        let payload = payload.into();
        let worker = self.clone();
        let cell = Arc::clone(&state);
        let fail_tx = tx.clone();

        let spawned = std::thread::Builder::new()
            .name(DISPATCH_THREAD_NAME.into())
            .spawn(move || {
                let outcome = worker.run(&endpoint, &payload, &cell);
                // Receiver may be gone (fire-and-forget)
                let _ = tx.send(outcome);
            });

        match spawned {
            Ok(_) => drop(fail_tx),
            Err(e) => {
                let attempt = self.stats.record_attempt();
                let error = SendError::Scheduler(e.to_string());
                log::error!("dispatch #{}: failed to spawn sender: {}", attempt, e);
                self.stats.record_failure(&error);
                state.advance(DispatchState::Done, attempt);
                let _ = fail_tx.send(Err(error));
            }
        }

        DispatchHandle {
            rx,
            state,
            outcome: None,
        }
    }

    /// Run the full state machine on the calling thread.
    pub fn send_blocking(&self, endpoint: &str, payload: &[u8]) -> SendOutcome {
        self.run(endpoint, payload, &StateCell::new())
    }

    fn run(&self, endpoint: &str, payload: &[u8], state: &StateCell) -> SendOutcome {
        let attempt = self.stats.record_attempt();
        let outcome = self.drive(attempt, endpoint, payload, state);
        state.advance(DispatchState::Done, attempt);

        match &outcome {
            Ok(report) => {
                self.stats.record_sent(report.bytes_sent);
                log::info!(
                    "dispatch #{}: CoAP message sent ({} bytes) to {}",
                    attempt,
                    report.bytes_sent,
                    report.destination
                );
            }
            Err(e) => {
                self.stats.record_failure(e);
                log::warn!("dispatch #{}: send abandoned: {}", attempt, e);
            }
        }
        outcome
    }

    fn drive(
        &self,
        attempt: CounterValue,
        endpoint: &str,
        payload: &[u8],
        state: &StateCell,
    ) -> SendOutcome {
        state.advance(DispatchState::AwaitingNetwork, attempt);
        let timeout = self.config.network_timeout();
        if !self.readiness.wait_ready(timeout) {
            log::error!(
                "dispatch #{}: network not ready after {:?}, skipping send",
                attempt,
                timeout
            );
            return Err(SendError::NetworkUnavailable(timeout));
        }

        state.advance(DispatchState::Encoding, attempt);
        let uri = EndpointUri::parse(endpoint)?;
        log::debug!(
            "dispatch #{}: target {}:{} path '{}'",
            attempt,
            uri.host(),
            uri.port(),
            uri.path()
        );

        // Private buffer, dropped when this attempt ends
        let mut buf = vec![0u8; self.config.buffer_capacity];
        let len = encode_request(&uri, payload, &mut buf, &self.config.request_options())?;

        state.advance(DispatchState::Transmitting, attempt);
        let report = self.transport.send(uri.host(), uri.port(), &buf[..len])?;
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Observer for one in-flight dispatch.
#[derive(Debug)]
pub struct DispatchHandle {
    rx: Receiver<SendOutcome>,
    state: Arc<StateCell>,
    outcome: Option<SendOutcome>,
}

impl DispatchHandle {
    /// Current state of the dispatch.
    pub fn state(&self) -> DispatchState {
        self.state.get()
    }

    pub fn is_done(&self) -> bool {
        self.outcome.is_some() || self.state().is_terminal()
    }

    /// Outcome if the dispatch has finished, without blocking.
    pub fn try_outcome(&mut self) -> Option<SendOutcome> {
        if self.outcome.is_none() {
            match self.rx.try_recv() {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => self.outcome = Some(Err(lost())),
            }
        }
        self.outcome.clone()
    }

    /// Wait up to `timeout` for the outcome.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<SendOutcome> {
        if self.outcome.is_none() {
            match self.rx.recv_timeout(timeout) {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => self.outcome = Some(Err(lost())),
            }
        }
        self.outcome.clone()
    }

    /// Block until the dispatch finishes.
    ///
    /// Always returns: the readiness wait is bounded and the transport
    /// performs a single send.
    pub fn join(mut self) -> SendOutcome {
        match self.outcome.take() {
            Some(outcome) => outcome,
            None => self.rx.recv().unwrap_or_else(|_| Err(lost())),
        }
    }
}

fn lost() -> SendError {
    SendError::Scheduler("dispatch thread exited without reporting".into())
}
