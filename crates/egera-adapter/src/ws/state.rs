/*
[INPUT]:  Adapter configuration
[OUTPUT]: State shared between the adapter handle and its connection task
[POS]:    WebSocket layer - shared session state
[UPDATE]: When adding caches or per-connection bookkeeping
*/

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use tokio::sync::{OnceCell, mpsc};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::http::EgeraError;
use crate::markets::MarketIndex;
use crate::types::{Balances, Ticker};

use super::hub::ResolverHub;
use super::request_id::RequestIdCounter;
use super::subscription::SubscriptionRegistry;

/// Everything the router and the connection task touch.
///
/// std locks are only held for short critical sections, never across `.await`;
/// the registry lock is always taken before the hub lock.
#[derive(Debug)]
pub(crate) struct StreamState {
    pub(crate) url: String,
    pub(crate) request_ids: RequestIdCounter,
    pub(crate) subscriptions: Mutex<SubscriptionRegistry>,
    pub(crate) hub: Mutex<ResolverHub>,
    pub(crate) tickers: RwLock<HashMap<String, Ticker>>,
    pub(crate) balances: RwLock<Balances>,
    pub(crate) markets: OnceCell<MarketIndex>,
    pub(crate) last_pong: Mutex<Instant>,
    pub(crate) outbound: tokio::sync::Mutex<Option<mpsc::Sender<WsMessage>>>,
    /// Bumped under the `outbound` lock whenever a session starts or ends
    generation: AtomicU64,
}

impl StreamState {
    pub(crate) fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_ids: RequestIdCounter::new(),
            subscriptions: Mutex::new(SubscriptionRegistry::default()),
            hub: Mutex::new(ResolverHub::default()),
            tickers: RwLock::new(HashMap::new()),
            balances: RwLock::new(Balances::default()),
            markets: OnceCell::new(),
            last_pong: Mutex::new(Instant::now()),
            outbound: tokio::sync::Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub(crate) fn next_request_id(&self) -> u64 {
        self.request_ids.next(&self.url)
    }

    pub(crate) fn touch_pong(&self) {
        *lock(&self.last_pong) = Instant::now();
    }

    pub(crate) fn since_last_pong(&self) -> std::time::Duration {
        lock(&self.last_pong).elapsed()
    }

    /// Install the sender of a new session; returns its generation.
    ///
    /// `outbound` is the guard of `self.outbound`.
    pub(crate) fn begin_session(
        &self,
        outbound: &mut Option<mpsc::Sender<WsMessage>>,
        sender: mpsc::Sender<WsMessage>,
    ) -> u64 {
        *outbound = Some(sender);
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// End the session `generation` if it is still the current one.
    ///
    /// Returns the number of rejected waiters, or `None` when a newer
    /// session (or an explicit disconnect) already took over.
    pub(crate) fn end_session(
        &self,
        outbound: &mut Option<mpsc::Sender<WsMessage>>,
        generation: u64,
    ) -> Option<usize> {
        if self.generation.load(Ordering::SeqCst) != generation {
            return None;
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        *outbound = None;
        Some(self.on_disconnect())
    }

    pub(crate) fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Subscriptions do not survive the socket: drop them and fail their waiters.
    pub(crate) fn on_disconnect(&self) -> usize {
        lock(&self.subscriptions).clear();
        lock(&self.hub).reject_all(|| EgeraError::WebSocket("connection closed".to_string()))
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::message::Args;
    use crate::ws::subscription::{SubscriptionKind, SubscriptionRecord, SubscriptionState};

    fn record(request_id: &str) -> SubscriptionRecord {
        SubscriptionRecord {
            request_id: request_id.to_string(),
            symbol: Some("all".to_string()),
            topic: Args::One("balances:all".to_string()),
            message_hash: "balances:all".to_string(),
            kind: SubscriptionKind::Subscribe,
            state: SubscriptionState::Pending,
        }
    }

    #[tokio::test]
    async fn test_stale_session_does_not_clear_newer_one() {
        let state = StreamState::new("wss://n1.ws.egera.com");
        let mut outbound = state.outbound.lock().await;

        let (old_tx, _old_rx) = mpsc::channel(1);
        let old = state.begin_session(&mut outbound, old_tx);
        outbound.take();
        let (new_tx, _new_rx) = mpsc::channel(1);
        let new = state.begin_session(&mut outbound, new_tx);
        assert_ne!(old, new);

        lock(&state.subscriptions).insert("balances:all", record("2"));
        let waiter = lock(&state.hub).register("balances:all");

        assert_eq!(state.end_session(&mut outbound, old), None);
        assert!(outbound.is_some());
        assert!(lock(&state.subscriptions).contains("balances:all"));
        assert_eq!(lock(&state.hub).pending("balances:all"), 1);

        assert_eq!(state.end_session(&mut outbound, new), Some(1));
        assert!(outbound.is_none());
        assert!(lock(&state.subscriptions).is_empty());
        assert!(matches!(waiter.await, Ok(Err(EgeraError::WebSocket(_)))));
    }

    #[tokio::test]
    async fn test_end_session_runs_once() {
        let state = StreamState::new("wss://n1.ws.egera.com");
        let mut outbound = state.outbound.lock().await;
        let (tx, _rx) = mpsc::channel(1);
        let generation = state.begin_session(&mut outbound, tx);

        assert_eq!(state.end_session(&mut outbound, generation), Some(0));
        assert_eq!(state.end_session(&mut outbound, generation), None);
        assert_ne!(state.current_generation(), generation);
    }
}
