/*
[INPUT]:  Decoded inbound JSON frames
[OUTPUT]: Normalized values resolved to waiting callers, cache updates
[POS]:    WebSocket layer - inbound message dispatch
[UPDATE]: When adding channels or acknowledgement behavior
*/

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use tracing::{debug, trace};

use crate::http::EgeraError;
use crate::normalize::{
    market_from_id, parse_ticker, safe_balance, safe_currency_code, safe_decimal, safe_string,
};
use crate::types::{BalanceAccount, Balances, Channel};

use super::hub::StreamValue;
use super::message::InboundMessage;
use super::state::{StreamState, lock, read, write};
use super::subscription::SubscriptionKind;
use super::topic::Topic;

/// Separator between base and quote in Egera market ids
const MARKET_ID_DELIMITER: char = '_';
const DROP_LOG_LIMIT: usize = 3;
const RAW_LOG_MAX_BYTES: usize = 512;

static DROP_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

impl StreamState {
    /// Route one inbound frame; returns the value its handler produced.
    pub(crate) fn handle_message(&self, message: &Value) -> Option<StreamValue> {
        match InboundMessage::classify(message) {
            InboundMessage::Ticker(raw) => Some(self.handle_ticker(raw)),
            InboundMessage::Balance(raw) => Some(self.handle_balance(raw)),
            InboundMessage::Ack { id, kind } => self.handle_ack(message, &id, kind),
            InboundMessage::Unknown => {
                log_dropped_once(message);
                None
            }
        }
    }

    fn handle_ticker(&self, raw: &Value) -> StreamValue {
        let market_id = safe_string(raw, "symbol");
        let market = market_id.and_then(|id| match self.markets.get() {
            Some(index) => index.safe_market(id, MARKET_ID_DELIMITER),
            None => market_from_id(id, MARKET_ID_DELIMITER),
        });

        // Egera sends no quotes, only the last trade price
        let mut raw = raw.clone();
        if let Some(object) = raw.as_object_mut() {
            let last = object.get("last").cloned().unwrap_or(Value::Null);
            object.insert("bid".to_string(), last.clone());
            object.insert("ask".to_string(), last);
        }

        let ticker = parse_ticker(&raw, market.as_ref());
        if let Some(symbol) = &ticker.symbol {
            write(&self.tickers).insert(symbol.clone(), ticker.clone());
        }

        let value = StreamValue::Ticker(ticker);
        let mut hub = lock(&self.hub);
        if let Some(market_id) = market_id {
            hub.resolve(&format!("{}:{market_id}", Channel::Tickers), &value);
        }
        hub.resolve(&Topic::all(Channel::Tickers).to_string(), &value);
        value
    }

    fn handle_balance(&self, raw: &Value) -> StreamValue {
        let currency_id = safe_string(raw, "symbol");
        let amounts = raw.get("value").unwrap_or(&Value::Null);
        let free = safe_decimal(amounts, "active");
        let used = safe_decimal(amounts, "inactive");

        let mut accounts = BTreeMap::new();
        if let Some(currency_id) = currency_id {
            accounts.insert(
                safe_currency_code(currency_id),
                BalanceAccount {
                    free,
                    used,
                    total: free.zip(used).map(|(free, used)| free + used),
                },
            );
        }
        let update = safe_balance(Balances {
            info: raw.clone(),
            accounts,
        });

        let snapshot = {
            let mut balances = write(&self.balances);
            balances.merge(update.clone());
            balances.clone()
        };

        let value = StreamValue::Balance(update);
        let mut hub = lock(&self.hub);
        if let Some(currency_id) = currency_id {
            hub.resolve(&Topic::balances(currency_id).to_string(), &value);
        }
        // `watch_balance` listens on the `all` scope and gets the merged view
        hub.resolve(
            &Topic::all(Channel::Balances).to_string(),
            &StreamValue::Balance(snapshot),
        );
        value
    }

    fn handle_ack(&self, message: &Value, id: &str, kind: Option<&str>) -> Option<StreamValue> {
        if kind == Some("pong") {
            trace!(id, "ws pong");
            self.touch_pong();
            return None;
        }

        let mut registry = lock(&self.subscriptions);
        let Some((hash, record)) = registry
            .find_by_request_id(id)
            .map(|(hash, record)| (hash.to_string(), record.clone()))
        else {
            debug!(id, "ws ack for unknown request id");
            return None;
        };

        let value = StreamValue::Ack(message.clone());
        match record.kind {
            SubscriptionKind::Subscribe => {
                registry.mark_active(&hash);
                debug!(id, subscription = %hash, "ws subscription acknowledged");
            }
            SubscriptionKind::Unsubscribe => {
                registry.remove(&hash);
                let removed: Vec<String> = record
                    .topic
                    .topics()
                    .into_iter()
                    .filter_map(|topic| topic.parse::<Topic>().ok())
                    .flat_map(|topic| registry.remove_covered_by(&topic))
                    .map(|removed| removed.message_hash)
                    .collect();
                drop(registry);

                let mut hub = lock(&self.hub);
                for message_hash in &removed {
                    hub.reject(message_hash, || EgeraError::Unsubscribed(message_hash.clone()));
                }
                hub.resolve(&record.message_hash, &value);
                debug!(id, removed = removed.len(), "ws unsubscribe acknowledged");
            }
        }
        Some(value)
    }
}

fn log_dropped_once(message: &Value) {
    let count = DROP_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < DROP_LOG_LIMIT {
        let raw = message.to_string();
        debug!(
            sample_index = count + 1,
            sample_limit = DROP_LOG_LIMIT,
            message = %truncate_for_log(&raw, RAW_LOG_MAX_BYTES),
            "ws message dropped"
        );
    }
}

pub(crate) fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&value[..end]);
    out.push_str("...");
    out
}
