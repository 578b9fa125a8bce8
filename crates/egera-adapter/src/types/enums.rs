/*
[INPUT]:  Egera stream vocabulary
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - wire enums shared by ws requests and topics
[UPDATE]: When Egera adds stream channels or request ops
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Request operation carried in the `op` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Subscribe,
    Unsubscribe,
}

/// Stream channel, the left half of a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Trades,
    Tickers,
    Orderbooks,
    Connected,
    Balances,
    Orders,
    Wallets,
}

impl Channel {
    pub const ALL: [Channel; 7] = [
        Channel::Trades,
        Channel::Tickers,
        Channel::Orderbooks,
        Channel::Connected,
        Channel::Balances,
        Channel::Orders,
        Channel::Wallets,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Trades => "trades",
            Channel::Tickers => "tickers",
            Channel::Orderbooks => "orderbooks",
            Channel::Connected => "connected",
            Channel::Balances => "balances",
            Channel::Orders => "orders",
            Channel::Wallets => "wallets",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|channel| channel.as_str() == value)
            .ok_or_else(|| format!("unknown channel: {value}"))
    }
}
