/*
[INPUT]:  Normalized exchange data and serde requirements
[OUTPUT]: Canonical Market, Ticker and Balances structs
[POS]:    Data layer - vendor-independent shapes produced by normalizers
[UPDATE]: When canonical fields are added
*/

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tradable pair as loaded from the REST API.
///
/// `id` is the exchange's own identifier (`btc_usd`), `symbol` the unified
/// `BASE/QUOTE` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub symbol: String,
    pub base: String,
    pub quote: String,
    pub base_id: String,
    pub quote_id: String,
}

/// Canonical ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: Option<String>,
    pub timestamp: i64,
    pub datetime: String,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub last: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub close: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub bid: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub ask: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub base_volume: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub percentage: Option<Decimal>,
    pub info: Value,
}

/// Free/used/total amounts of one currency
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAccount {
    #[serde(with = "rust_decimal::serde::str_option")]
    pub free: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub used: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::str_option")]
    pub total: Option<Decimal>,
}

/// Canonical balance snapshot keyed by unified currency code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    pub info: Value,
    pub accounts: BTreeMap<String, BalanceAccount>,
}

impl Balances {
    pub fn get(&self, code: &str) -> Option<&BalanceAccount> {
        self.accounts.get(code)
    }

    /// Overlay another snapshot on top of this one, currency by currency.
    pub fn merge(&mut self, other: Balances) {
        self.info = other.info;
        self.accounts.extend(other.accounts);
    }
}
