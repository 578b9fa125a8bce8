/*
[INPUT]:  Raw Egera JSON payloads and loaded market metadata
[OUTPUT]: Canonical Ticker, Balances, currency codes and markets
[POS]:    Normalization layer - vendor shapes to canonical shapes
[UPDATE]: When Egera payload fields or currency aliases change
*/

use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::types::{BalanceAccount, Balances, Market, Ticker};

/// Legacy or exchange-specific currency ids and their unified codes
const COMMON_CURRENCIES: &[(&str, &str)] = &[
    ("XBT", "BTC"),
    ("BCC", "BCH"),
    ("BCHABC", "BCH"),
    ("BCHSV", "BSV"),
    ("DRK", "DASH"),
];

/// Map an exchange currency id to its unified code.
pub fn safe_currency_code(currency_id: &str) -> String {
    let upper = currency_id.trim().to_uppercase();
    COMMON_CURRENCIES
        .iter()
        .find(|(id, _)| *id == upper)
        .map(|(_, code)| (*code).to_string())
        .unwrap_or(upper)
}

/// Build a market from a bare id such as `eth_pln` by splitting on `delimiter`.
///
/// Returns `None` when the id does not contain the delimiter or one side is empty.
pub fn market_from_id(market_id: &str, delimiter: char) -> Option<Market> {
    let (base_id, quote_id) = market_id.split_once(delimiter)?;
    if base_id.is_empty() || quote_id.is_empty() {
        return None;
    }
    let base = safe_currency_code(base_id);
    let quote = safe_currency_code(quote_id);
    Some(Market {
        id: market_id.to_string(),
        symbol: format!("{base}/{quote}"),
        base,
        quote,
        base_id: base_id.to_string(),
        quote_id: quote_id.to_string(),
    })
}

/// Read a decimal that may arrive as a JSON string or number.
///
/// Absent, null, empty and unparsable values all read as `None`.
pub fn safe_decimal(object: &Value, key: &str) -> Option<Decimal> {
    match object.get(key)? {
        Value::String(raw) => parse_decimal(raw),
        Value::Number(number) => parse_decimal(&number.to_string()),
        _ => None,
    }
}

pub fn safe_string<'a>(object: &'a Value, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim().trim_end_matches('%').trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Convert a raw Egera ticker into the canonical shape.
///
/// Egera ticker frames only carry `last`, `volume` and a `change` string like
/// `"0.00 %"`; callers that want quotes fill `bid`/`ask` beforehand.
pub fn parse_ticker(raw: &Value, market: Option<&Market>) -> Ticker {
    let now = Utc::now();
    let last = safe_decimal(raw, "last");
    let symbol = market
        .map(|market| market.symbol.clone())
        .or_else(|| safe_string(raw, "symbol").map(str::to_string));

    Ticker {
        symbol,
        timestamp: now.timestamp_millis(),
        datetime: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        last,
        close: last,
        bid: safe_decimal(raw, "bid"),
        ask: safe_decimal(raw, "ask"),
        base_volume: safe_decimal(raw, "volume"),
        percentage: safe_decimal(raw, "change"),
        info: raw.clone(),
    }
}

/// Fill in whichever of free/used/total can be derived from the other two.
pub fn safe_balance(mut balances: Balances) -> Balances {
    for account in balances.accounts.values_mut() {
        complete_account(account);
    }
    balances
}

fn complete_account(account: &mut BalanceAccount) {
    match (account.free, account.used, account.total) {
        (Some(free), Some(used), None) => account.total = Some(free + used),
        (None, Some(used), Some(total)) => account.free = Some(total - used),
        (Some(free), None, Some(total)) => account.used = Some(total - free),
        _ => {}
    }
}
