/*
[INPUT]:  Channel names and scopes (`tickers:BTC_USD`)
[OUTPUT]: Typed Topic values used as request args and message hashes
[POS]:    WebSocket layer - subscription topic vocabulary
[UPDATE]: When topic formatting rules change
*/

use std::fmt;
use std::str::FromStr;

use crate::types::Channel;

/// Scope that selects every symbol/currency of a channel
pub const ALL_SCOPE: &str = "all";

/// `{channel}:{scope}` pair.
///
/// The rendered string is both the outbound `args` value and the key inbound
/// data is resolved under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic {
    pub channel: Channel,
    pub scope: String,
}

impl Topic {
    pub fn new(channel: Channel, scope: impl Into<String>) -> Self {
        Self {
            channel,
            scope: scope.into(),
        }
    }

    pub fn all(channel: Channel) -> Self {
        Self::new(channel, ALL_SCOPE)
    }

    /// Ticker topic for an exchange market id; Egera expects upper case.
    pub fn tickers(market_id: &str) -> Self {
        Self::new(Channel::Tickers, market_id.to_uppercase())
    }

    pub fn balances(currency_id: &str) -> Self {
        Self::new(Channel::Balances, currency_id)
    }

    pub fn is_all(&self) -> bool {
        self.scope == ALL_SCOPE
    }

    /// Whether a message routed under `other` falls under this topic.
    pub fn covers(&self, other: &Topic) -> bool {
        self.channel == other.channel && (self.is_all() || self.scope == other.scope)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel, self.scope)
    }
}

impl FromStr for Topic {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (channel, scope) = value
            .split_once(':')
            .ok_or_else(|| format!("topic without scope: {value}"))?;
        if scope.is_empty() {
            return Err(format!("topic without scope: {value}"));
        }
        Ok(Self::new(channel.parse()?, scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_ticker_topic_upper_cases_market_id() {
        assert_eq!(Topic::tickers("btc_usd").to_string(), "tickers:BTC_USD");
    }

    #[test]
    fn test_balances_all() {
        let topic = Topic::all(Channel::Balances);
        assert_eq!(topic.to_string(), "balances:all");
        assert!(topic.is_all());
    }

    #[rstest]
    #[case("tickers:ETH_PLN", Channel::Tickers, "ETH_PLN")]
    #[case("balances:all", Channel::Balances, "all")]
    #[case("orderbooks:BTC_PLN", Channel::Orderbooks, "BTC_PLN")]
    fn test_parse(#[case] raw: &str, #[case] channel: Channel, #[case] scope: &str) {
        let topic: Topic = raw.parse().expect("topic");
        assert_eq!(topic, Topic::new(channel, scope));
        assert_eq!(topic.to_string(), raw);
    }

    #[rstest]
    #[case("tickers")]
    #[case("tickers:")]
    #[case("candles:BTC_USD")]
    fn test_parse_rejects(#[case] raw: &str) {
        assert!(raw.parse::<Topic>().is_err());
    }

    #[test]
    fn test_covers() {
        let all = Topic::all(Channel::Tickers);
        let btc = Topic::tickers("BTC_USD");
        assert!(all.covers(&btc));
        assert!(btc.covers(&btc));
        assert!(!btc.covers(&all));
        assert!(!Topic::all(Channel::Balances).covers(&btc));
    }
}
