/*
[INPUT]:  EGERA_UID / EGERA_SECRET environment variables
[OUTPUT]: Live BTC/PLN tickers printed to stdout
[POS]:    Examples - WebSocket stream handling
[UPDATE]: When WebSocket API changes
*/

use std::sync::Arc;

use egera_adapter::*;
use tracing_subscriber::EnvFilter;

/// Example: stream tickers for one market
///
/// Run with `RUST_LOG=egera_adapter=debug` to see subscription traffic.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let uid = std::env::var("EGERA_UID").map_err(|_| EgeraError::Config("EGERA_UID not set".into()))?;
    let secret =
        std::env::var("EGERA_SECRET").map_err(|_| EgeraError::Config("EGERA_SECRET not set".into()))?;
    let symbol = std::env::args().nth(1).unwrap_or_else(|| "BTC/PLN".to_string());

    let rest = EgeraClient::new()?;
    let ws = EgeraWebSocket::new(WsConfig::default(), Arc::new(rest))
        .with_credentials(Credentials { uid, secret });
    ws.connect().await?;

    for _ in 0..10 {
        let ticker = ws.watch_ticker(&symbol).await?;
        println!(
            "{} last={} volume={}",
            ticker.datetime,
            ticker.last.map(|v| v.to_string()).unwrap_or_default(),
            ticker.base_volume.map(|v| v.to_string()).unwrap_or_default(),
        );
    }

    ws.disconnect().await;
    Ok(())
}
