/*
[INPUT]:  Public REST endpoints
[OUTPUT]: Market metadata for the stream adapter
[POS]:    HTTP layer - public market data endpoints (no auth required)
[UPDATE]: When adding new public endpoints or changing response format
*/

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::http::{EgeraClient, Result};
use crate::markets::MarketSource;
use crate::normalize::{market_from_id, safe_currency_code};
use crate::types::Market;

const MARKETS_ENDPOINT: &str = "/markets";

#[derive(Debug, Deserialize)]
struct RawMarket {
    id: String,
    #[serde(default)]
    base: Option<String>,
    #[serde(default)]
    quote: Option<String>,
}

impl RawMarket {
    fn into_market(self) -> Option<Market> {
        match (self.base, self.quote) {
            (Some(base_id), Some(quote_id)) => {
                let base = safe_currency_code(&base_id);
                let quote = safe_currency_code(&quote_id);
                Some(Market {
                    symbol: format!("{base}/{quote}"),
                    id: self.id,
                    base,
                    quote,
                    base_id,
                    quote_id,
                })
            }
            _ => market_from_id(&self.id, '_'),
        }
    }
}

impl EgeraClient {
    /// Fetch all markets
    ///
    /// GET /markets
    pub async fn fetch_markets(&self) -> Result<Vec<Market>> {
        let builder = self.request(Method::GET, MARKETS_ENDPOINT)?;
        let raw: Vec<RawMarket> = self.send_json(builder).await?;
        let total = raw.len();

        let markets: Vec<Market> = raw
            .into_iter()
            .filter_map(|market| {
                let id = market.id.clone();
                let parsed = market.into_market();
                if parsed.is_none() {
                    warn!(market_id = %id, "skipping market without base/quote");
                }
                parsed
            })
            .collect();

        debug!(total, loaded = markets.len(), "markets fetched");
        Ok(markets)
    }
}

#[async_trait]
impl MarketSource for EgeraClient {
    async fn load_markets(&self) -> Result<Vec<Market>> {
        self.fetch_markets().await
    }
}

#[cfg(test)]
mod tests {
    use crate::http::{ClientConfig, EgeraClient, EgeraError};
    use crate::types::Market;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> EgeraClient {
        EgeraClient::with_config_and_base_url(ClientConfig::default(), &server.uri())
            .expect("client init")
    }

    #[tokio::test]
    async fn test_fetch_markets() {
        let server = MockServer::start().await;
        let mock_response = r#"[
            {"id": "btc_usd", "base": "btc", "quote": "usd"},
            {"id": "eth_pln"},
            {"id": "broken"}
        ]"#;

        let _mock = Mock::given(method("GET"))
            .and(path("/markets"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(mock_response, "application/json"))
            .expect(1)
            .mount(&server)
            .await;

        let markets = client_for(&server)
            .fetch_markets()
            .await
            .expect("fetch_markets failed");

        let expected = vec![
            Market {
                id: "btc_usd".to_string(),
                symbol: "BTC/USD".to_string(),
                base: "BTC".to_string(),
                quote: "USD".to_string(),
                base_id: "btc".to_string(),
                quote_id: "usd".to_string(),
            },
            Market {
                id: "eth_pln".to_string(),
                symbol: "ETH/PLN".to_string(),
                base: "ETH".to_string(),
                quote: "PLN".to_string(),
                base_id: "eth".to_string(),
                quote_id: "pln".to_string(),
            },
        ];

        assert_eq!(markets, expected);
    }

    #[tokio::test]
    async fn test_fetch_markets_api_error() {
        let server = MockServer::start().await;

        let _mock = Mock::given(method("GET"))
            .and(path("/markets"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        match client_for(&server).fetch_markets().await {
            Err(EgeraError::Api { code, message }) => {
                assert_eq!(code, 503);
                assert_eq!(message, "maintenance");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
