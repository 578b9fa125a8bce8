/*
[INPUT]:  Waiter registrations and resolved stream values
[OUTPUT]: One-shot delivery of values to callers waiting on a message hash
[POS]:    WebSocket layer - request/response correlation
[UPDATE]: When resolved value types change
*/

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::http::{EgeraError, Result};
use crate::types::{Balances, Ticker};

/// Value handed to a caller whose message hash was resolved
#[derive(Debug, Clone, PartialEq)]
pub enum StreamValue {
    Ticker(Ticker),
    Balance(Balances),
    /// Raw acknowledgement frame
    Ack(Value),
}

type Waiter = oneshot::Sender<Result<StreamValue>>;

/// Pending waiters keyed by message hash
#[derive(Debug, Default)]
pub struct ResolverHub {
    waiters: HashMap<String, Vec<Waiter>>,
}

impl ResolverHub {
    /// Register a waiter for the next value resolved under `message_hash`.
    pub fn register(&mut self, message_hash: &str) -> oneshot::Receiver<Result<StreamValue>> {
        let (tx, rx) = oneshot::channel();
        let waiters = self.waiters.entry(message_hash.to_string()).or_default();
        // callers that timed out leave closed senders behind
        waiters.retain(|waiter| !waiter.is_closed());
        waiters.push(tx);
        rx
    }

    /// Number of live waiters on `message_hash`
    pub fn pending(&self, message_hash: &str) -> usize {
        self.waiters
            .get(message_hash)
            .map(|waiters| waiters.iter().filter(|waiter| !waiter.is_closed()).count())
            .unwrap_or(0)
    }

    /// Deliver `value` to every waiter on `message_hash`; returns how many received it.
    pub fn resolve(&mut self, message_hash: &str, value: &StreamValue) -> usize {
        let Some(waiters) = self.waiters.remove(message_hash) else {
            return 0;
        };
        waiters
            .into_iter()
            .map(|waiter| waiter.send(Ok(value.clone())).is_ok())
            .filter(|delivered| *delivered)
            .count()
    }

    /// Fail every waiter on `message_hash` with an error built by `error`.
    pub fn reject(&mut self, message_hash: &str, error: impl Fn() -> EgeraError) -> usize {
        let Some(waiters) = self.waiters.remove(message_hash) else {
            return 0;
        };
        waiters
            .into_iter()
            .map(|waiter| waiter.send(Err(error())).is_ok())
            .filter(|delivered| *delivered)
            .count()
    }

    /// Fail every waiter on every hash.
    pub fn reject_all(&mut self, error: impl Fn() -> EgeraError) -> usize {
        let hashes: Vec<String> = self.waiters.keys().cloned().collect();
        hashes
            .iter()
            .map(|hash| self.reject(hash, &error))
            .sum()
    }

    /// Drop the waiters on `message_hash` without notifying them.
    pub fn forget(&mut self, message_hash: &str) {
        self.waiters.remove(message_hash);
    }
}
