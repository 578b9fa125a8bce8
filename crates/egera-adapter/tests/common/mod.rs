/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for egera-adapter tests

use std::sync::Arc;
use std::time::Duration;

use egera_adapter::{Credentials, EgeraWebSocket, Market, StaticMarkets, WsConfig};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use wiremock::MockServer;

/// Setup a mock HTTP server for testing
#[allow(dead_code)]
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

#[allow(dead_code)]
pub fn test_credentials() -> Credentials {
    Credentials {
        uid: "uid-1".to_string(),
        secret: "secret-token".to_string(),
    }
}

#[allow(dead_code)]
pub fn btc_usd() -> Market {
    Market {
        id: "btc_usd".to_string(),
        symbol: "BTC/USD".to_string(),
        base: "BTC".to_string(),
        quote: "USD".to_string(),
        base_id: "btc".to_string(),
        quote_id: "usd".to_string(),
    }
}

/// WebSocket server standing in for the Egera endpoint.
///
/// Connections are served one after another, so a reconnect is picked up
/// once the previous socket closes. Text frames sent by the client land in
/// `received`; values pushed into `push` go to the current connection.
#[allow(dead_code)]
pub struct MockStream {
    pub url: String,
    pub received: mpsc::UnboundedReceiver<Value>,
    pub push: mpsc::UnboundedSender<Value>,
}

#[allow(dead_code)]
impl MockStream {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (received_tx, received_rx) = mpsc::unbounded_channel();
        let (push_tx, mut push_rx) = mpsc::unbounded_channel::<Value>();

        tokio::spawn(async move {
            'accept: loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
                    continue;
                };
                let (mut write, mut read) = ws.split();

                loop {
                    tokio::select! {
                        frame = read.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                if let Ok(value) = serde_json::from_str::<Value>(text.as_str()) {
                                    let _ = received_tx.send(value);
                                }
                            }
                            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                            Some(Ok(_)) => {}
                        },
                        outgoing = push_rx.recv() => match outgoing {
                            Some(value) => {
                                if write.send(Message::Text(value.to_string().into())).await.is_err() {
                                    break;
                                }
                            }
                            None => break 'accept,
                        },
                    }
                }
            }
        });

        Self {
            url: format!("ws://{addr}"),
            received: received_rx,
            push: push_tx,
        }
    }

    /// Next client frame that is not a keep-alive ping
    pub async fn next_request(&mut self) -> Value {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), self.received.recv())
                .await
                .expect("timed out waiting for client frame")
                .expect("server task ended");
            if frame.get("type").and_then(Value::as_str) != Some("ping") {
                return frame;
            }
        }
    }

    pub fn send(&self, value: Value) {
        self.push.send(value).expect("server task ended");
    }
}

/// Adapter wired to `stream` with one BTC/USD market and test credentials
#[allow(dead_code)]
pub fn adapter_for(stream: &MockStream, config: WsConfig) -> Arc<EgeraWebSocket> {
    let config = WsConfig {
        url: stream.url.clone(),
        ..config
    };
    Arc::new(
        EgeraWebSocket::new(config, Arc::new(StaticMarkets(vec![btc_usd()])))
            .with_credentials(test_credentials()),
    )
}
