/*
[INPUT]:  WsConfig, credentials and a market source
[OUTPUT]: watch_ticker / watch_balance results and subscription control
[POS]:    WebSocket layer - Egera stream adapter (subscription manager)
[UPDATE]: When adding channels or changing subscription logic
*/

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Map, Value};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info};

use crate::http::{Credentials, EgeraError, Result};
use crate::markets::{MarketIndex, MarketSource};
use crate::types::{Balances, Channel, Op, Ticker};

use super::config::WsConfig;
use super::connection;
use super::hub::StreamValue;
use super::message::{Args, RequestHeaders, StreamRequest};
use super::state::{StreamState, lock, read};
use super::subscription::{SubscriptionKind, SubscriptionRecord, SubscriptionState};
use super::topic::Topic;

const SUBSCRIPTION_LOG_LIMIT: usize = 10;
const DISABLE_ALL_HASH: &str = "disableAll";

static SUBSCRIBE_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Streaming client for the Egera WebSocket API.
///
/// Cheap to share behind an `Arc`; every `watch_*` call waits for the next
/// update on its topic, subscribing on first use.
pub struct EgeraWebSocket {
    config: WsConfig,
    credentials: Option<Credentials>,
    market_source: Arc<dyn MarketSource>,
    state: Arc<StreamState>,
}

impl std::fmt::Debug for EgeraWebSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EgeraWebSocket")
            .field("url", &self.config.url)
            .field("has_credentials", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}

impl EgeraWebSocket {
    /// Create a new WebSocket client
    pub fn new(config: WsConfig, market_source: Arc<dyn MarketSource>) -> Self {
        let state = Arc::new(StreamState::new(config.url.clone()));
        Self {
            config,
            credentials: None,
            market_source,
            state,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect to the stream endpoint
    pub async fn connect(&self) -> Result<()> {
        connection::open(Arc::clone(&self.state), &self.config).await
    }

    pub async fn is_connected(&self) -> bool {
        self.state.outbound.lock().await.is_some()
    }

    /// Close the connection; pending watchers fail with a WebSocket error.
    ///
    /// The session ends here, so the closing task cannot touch a later one.
    pub async fn disconnect(&self) {
        let mut outbound = self.state.outbound.lock().await;
        if outbound.is_none() {
            return;
        }
        let generation = self.state.current_generation();
        // dropping the sender ends the connection task
        if let Some(rejected) = self.state.end_session(&mut outbound, generation) {
            info!(generation, rejected, "ws disconnected");
        }
    }

    /// Next request id for this adapter's endpoint
    pub fn request_id(&self) -> u64 {
        self.state.next_request_id()
    }

    /// Load markets once; later calls return the cached index.
    pub async fn load_markets(&self) -> Result<&MarketIndex> {
        self.state
            .markets
            .get_or_try_init(|| async {
                let markets = self.market_source.load_markets().await?;
                info!(count = markets.len(), "markets loaded");
                Ok::<_, EgeraError>(MarketIndex::new(markets))
            })
            .await
    }

    /// Wait for the next ticker of a unified symbol (`BTC/USD`).
    pub async fn watch_ticker(&self, symbol: &str) -> Result<Ticker> {
        let markets = self.load_markets().await?;
        let topic = Topic::tickers(&markets.market(symbol)?.id);
        match self.subscribe(&topic, None).await? {
            StreamValue::Ticker(ticker) => Ok(ticker),
            other => Err(unexpected(&topic, &other)),
        }
    }

    /// Wait for the next balance update; returns the merged snapshot.
    pub async fn watch_balance(&self) -> Result<Balances> {
        self.load_markets().await?;
        let topic = Topic::all(Channel::Balances);
        match self.subscribe(&topic, None).await? {
            StreamValue::Balance(balances) => Ok(balances),
            other => Err(unexpected(&topic, &other)),
        }
    }

    /// Subscribe to `topic` (once) and wait for the next value routed to it.
    pub async fn subscribe(
        &self,
        topic: &Topic,
        params: Option<Map<String, Value>>,
    ) -> Result<StreamValue> {
        let topic_hash = topic.to_string();
        let request_id = self.request_id().to_string();
        let request = self.build_request(Op::Subscribe, &request_id, Args::One(topic_hash.clone()), params)?;
        let record = SubscriptionRecord {
            request_id,
            symbol: Some(topic.scope.clone()),
            topic: Args::One(topic_hash.clone()),
            message_hash: topic_hash.clone(),
            kind: SubscriptionKind::Subscribe,
            state: SubscriptionState::Pending,
        };
        self.watch(&topic_hash, request, &topic_hash, record).await
    }

    /// Unsubscribe from `topic`; resolves once the server acknowledges.
    ///
    /// Callers still waiting on the topic fail with `EgeraError::Unsubscribed`.
    pub async fn unsubscribe(
        &self,
        topic: &Topic,
        params: Option<Map<String, Value>>,
    ) -> Result<StreamValue> {
        let topic_hash = topic.to_string();
        let message_hash = format!("unsubscribe:{topic_hash}");
        let request_id = self.request_id().to_string();
        let request = self.build_request(Op::Unsubscribe, &request_id, Args::One(topic_hash.clone()), params)?;
        let record = SubscriptionRecord {
            request_id,
            symbol: Some(topic.scope.clone()),
            topic: Args::One(topic_hash),
            message_hash: message_hash.clone(),
            kind: SubscriptionKind::Unsubscribe,
            state: SubscriptionState::Pending,
        };
        self.watch(&message_hash, request, &message_hash, record).await
    }

    /// Unsubscribe from every channel's `all` scope in a single request.
    pub async fn disable_all(&self) -> Result<StreamValue> {
        let topics: Vec<String> = Channel::ALL
            .into_iter()
            .map(|channel| Topic::all(channel).to_string())
            .collect();
        let request_id = self.request_id().to_string();
        let request = self.build_request(Op::Unsubscribe, &request_id, Args::Many(topics.clone()), None)?;
        let record = SubscriptionRecord {
            request_id,
            symbol: None,
            topic: Args::Many(topics),
            message_hash: DISABLE_ALL_HASH.to_string(),
            kind: SubscriptionKind::Unsubscribe,
            state: SubscriptionState::Pending,
        };
        self.watch(DISABLE_ALL_HASH, request, DISABLE_ALL_HASH, record).await
    }

    /// Route one decoded inbound frame, as the connection task does.
    pub fn handle_message(&self, message: &Value) -> Option<StreamValue> {
        self.state.handle_message(message)
    }

    /// Last ticker seen for a unified symbol
    pub fn ticker(&self, symbol: &str) -> Option<Ticker> {
        read(&self.state.tickers).get(symbol).cloned()
    }

    pub fn tickers(&self) -> HashMap<String, Ticker> {
        read(&self.state.tickers).clone()
    }

    /// Balances merged from every update received so far
    pub fn balances(&self) -> Balances {
        read(&self.state.balances).clone()
    }

    pub fn subscription(&self, subscription_hash: &str) -> Option<SubscriptionRecord> {
        lock(&self.state.subscriptions).get(subscription_hash).cloned()
    }

    fn build_request(
        &self,
        op: Op,
        request_id: &str,
        args: Args,
        params: Option<Map<String, Value>>,
    ) -> Result<Value> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(EgeraError::MissingCredentials("secret"))?;
        StreamRequest {
            op,
            id: request_id.to_string(),
            headers: RequestHeaders::from(credentials),
            args,
        }
        .into_value(params)
    }

    /// Register a waiter on `message_hash`, send `request` unless
    /// `subscription_hash` is already registered, and wait for resolution.
    async fn watch(
        &self,
        message_hash: &str,
        request: Value,
        subscription_hash: &str,
        record: SubscriptionRecord,
    ) -> Result<StreamValue> {
        let request_id = record.request_id.clone();
        let kind = record.kind;
        let (receiver, is_new) = {
            let mut registry = lock(&self.state.subscriptions);
            let is_new = registry.insert(subscription_hash, record);
            (lock(&self.state.hub).register(message_hash), is_new)
        };

        if is_new {
            if let Err(err) = self.send(&request).await {
                lock(&self.state.subscriptions).remove(subscription_hash);
                lock(&self.state.hub).forget(message_hash);
                return Err(err);
            }
        } else {
            debug!(subscription = subscription_hash, "ws subscription reused");
        }

        let timeout = self.config.watch_timeout;
        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(resolved)) => resolved,
            Ok(Err(_)) => Err(EgeraError::WebSocket("resolver dropped".to_string())),
            Err(_) => {
                // an unacknowledged unsubscribe must not block the next attempt
                if kind == SubscriptionKind::Unsubscribe {
                    let mut registry = lock(&self.state.subscriptions);
                    let matches = registry
                        .get(subscription_hash)
                        .is_some_and(|pending| pending.request_id == request_id);
                    if matches {
                        registry.remove(subscription_hash);
                        debug!(subscription = subscription_hash, "ws unsubscribe expired");
                    }
                }
                Err(EgeraError::Timeout {
                    message_hash: message_hash.to_string(),
                    duration: timeout.as_millis() as u64,
                })
            }
        }
    }

    async fn send(&self, message: &Value) -> Result<()> {
        let sender = {
            let guard = self.state.outbound.lock().await;
            guard.clone().ok_or(EgeraError::NotConnected)?
        };

        sender
            .send(WsMessage::Text(message.to_string().into()))
            .await
            .map_err(|_| EgeraError::WebSocket("send channel closed".to_string()))?;

        log_subscription_sent(message);
        Ok(())
    }
}

fn unexpected(topic: &Topic, value: &StreamValue) -> EgeraError {
    EgeraError::WebSocket(format!("unexpected value for {topic}: {value:?}"))
}

fn log_subscription_sent(message: &Value) {
    let count = SUBSCRIBE_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count >= SUBSCRIPTION_LOG_LIMIT {
        return;
    }

    let op = message.get("op").and_then(Value::as_str).unwrap_or_default();
    let id = message.get("id").and_then(Value::as_str).unwrap_or_default();
    let args = message.get("args").map(Value::to_string).unwrap_or_default();
    info!(
        sample_index = count + 1,
        sample_limit = SUBSCRIPTION_LOG_LIMIT,
        op,
        id,
        args = %args,
        "ws subscription sent"
    );
}
