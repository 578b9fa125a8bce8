/*
[INPUT]:  Subscription records created by subscribe/unsubscribe
[OUTPUT]: Registry lookups by subscription hash and by request id
[POS]:    WebSocket layer - subscription bookkeeping
[UPDATE]: When subscription lifecycle states change
*/

use std::collections::HashMap;

use super::message::Args;
use super::topic::Topic;

/// What an acknowledgement of this record should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionKind {
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Sent, not yet acknowledged
    Pending,
    /// Acknowledged by the server
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRecord {
    pub request_id: String,
    /// Scope half of a single topic (`BTC_USD`, `all`)
    pub symbol: Option<String>,
    pub topic: Args,
    pub message_hash: String,
    pub kind: SubscriptionKind,
    pub state: SubscriptionState,
}

/// Records keyed by subscription hash
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    by_hash: HashMap<String, SubscriptionRecord>,
}

impl SubscriptionRegistry {
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub fn contains(&self, subscription_hash: &str) -> bool {
        self.by_hash.contains_key(subscription_hash)
    }

    pub fn get(&self, subscription_hash: &str) -> Option<&SubscriptionRecord> {
        self.by_hash.get(subscription_hash)
    }

    /// Insert unless the hash is already taken; returns whether it was inserted.
    pub fn insert(&mut self, subscription_hash: &str, record: SubscriptionRecord) -> bool {
        if self.by_hash.contains_key(subscription_hash) {
            return false;
        }
        self.by_hash.insert(subscription_hash.to_string(), record);
        true
    }

    pub fn remove(&mut self, subscription_hash: &str) -> Option<SubscriptionRecord> {
        self.by_hash.remove(subscription_hash)
    }

    /// Hash and record carrying `request_id`
    pub fn find_by_request_id(&self, request_id: &str) -> Option<(&str, &SubscriptionRecord)> {
        self.by_hash
            .iter()
            .find(|(_, record)| record.request_id == request_id)
            .map(|(hash, record)| (hash.as_str(), record))
    }

    pub fn mark_active(&mut self, subscription_hash: &str) -> bool {
        match self.by_hash.get_mut(subscription_hash) {
            Some(record) => {
                record.state = SubscriptionState::Active;
                true
            }
            None => false,
        }
    }

    /// Drop every subscribe record whose topic falls under `topic`.
    ///
    /// `tickers:all` removes `tickers:all` and every `tickers:{symbol}` record.
    pub fn remove_covered_by(&mut self, topic: &Topic) -> Vec<SubscriptionRecord> {
        let hashes: Vec<String> = self
            .by_hash
            .iter()
            .filter(|(hash, record)| {
                record.kind == SubscriptionKind::Subscribe
                    && hash
                        .parse::<Topic>()
                        .is_ok_and(|subscribed| topic.covers(&subscribed))
            })
            .map(|(hash, _)| hash.clone())
            .collect();

        hashes
            .into_iter()
            .filter_map(|hash| self.by_hash.remove(&hash))
            .collect()
    }

    pub fn clear(&mut self) {
        self.by_hash.clear();
    }
}
