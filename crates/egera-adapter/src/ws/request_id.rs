/*
[INPUT]:  Endpoint URL of an outbound request
[OUTPUT]: Strictly increasing per-URL request ids
[POS]:    WebSocket layer - request correlation counter
[UPDATE]: When request id format changes
*/

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Last-used request id per endpoint URL, starting from zero.
#[derive(Debug, Default)]
pub struct RequestIdCounter {
    last: Mutex<HashMap<String, u64>>,
}

impl RequestIdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the id for `url`.
    pub fn next(&self, url: &str) -> u64 {
        let mut guard = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let value = guard.entry(url.to_string()).or_insert(0);
        *value += 1;
        *value
    }

    /// Last id handed out for `url`, 0 if none.
    pub fn last(&self, url: &str) -> u64 {
        let guard = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        guard.get(url).copied().unwrap_or(0)
    }
}
