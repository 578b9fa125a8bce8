/*
[INPUT]:  Market lists from REST or a fixed set
[OUTPUT]: Indexed market metadata for symbol/id lookups
[POS]:    Market layer - symbol metadata required before subscribing
[UPDATE]: When adding market sources or lookup rules
*/

use std::collections::HashMap;

use async_trait::async_trait;

use crate::http::{EgeraError, Result};
use crate::normalize::market_from_id;
use crate::types::Market;

/// Source of market metadata.
///
/// The REST client implements this; tests and offline tools can hand the
/// adapter a fixed list through [`StaticMarkets`].
#[async_trait]
pub trait MarketSource: Send + Sync {
    async fn load_markets(&self) -> Result<Vec<Market>>;
}

/// Fixed market list
#[derive(Debug, Clone, Default)]
pub struct StaticMarkets(pub Vec<Market>);

#[async_trait]
impl MarketSource for StaticMarkets {
    async fn load_markets(&self) -> Result<Vec<Market>> {
        Ok(self.0.clone())
    }
}

/// Markets indexed by unified symbol and by exchange id
#[derive(Debug, Clone, Default)]
pub struct MarketIndex {
    by_symbol: HashMap<String, Market>,
    // keys are upper-cased: the stream reports `ETH_PLN` for REST id `eth_pln`
    by_id: HashMap<String, Market>,
}

impl MarketIndex {
    pub fn new(markets: Vec<Market>) -> Self {
        let mut index = Self::default();
        for market in markets {
            index.by_id.insert(market.id.to_uppercase(), market.clone());
            index.by_symbol.insert(market.symbol.clone(), market);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }

    /// Look up a market by unified symbol (`BTC/USD`).
    pub fn market(&self, symbol: &str) -> Result<&Market> {
        self.by_symbol
            .get(symbol)
            .ok_or_else(|| EgeraError::BadSymbol(symbol.to_string()))
    }

    /// Look up a market by exchange id, synthesizing one from the id when it
    /// is not loaded.
    pub fn safe_market(&self, market_id: &str, delimiter: char) -> Option<Market> {
        self.by_id
            .get(&market_id.to_uppercase())
            .cloned()
            .or_else(|| market_from_id(market_id, delimiter))
    }
}
