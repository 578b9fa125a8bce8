/*
[INPUT]:  WebSocket test scenarios against a local stream server
[OUTPUT]: Test results for the stream adapter
[POS]:    Integration tests - WebSocket
[UPDATE]: When WebSocket client changes
*/

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockStream, adapter_for};
use egera_adapter::{
    Channel, EgeraError, EgeraWebSocket, StaticMarkets, StreamValue, SubscriptionState, Topic,
    WsConfig,
};
use rust_decimal::Decimal;
use serde_json::json;
use tokio_test::assert_ok;

fn dec(raw: &str) -> Decimal {
    raw.parse().expect("decimal")
}

#[tokio::test]
async fn test_watch_ticker_round_trip() {
    let mut stream = MockStream::start().await;
    let ws = adapter_for(&stream, WsConfig::default());
    assert_ok!(ws.connect().await);
    assert!(ws.is_connected().await);

    let watcher = {
        let ws = Arc::clone(&ws);
        tokio::spawn(async move { ws.watch_ticker("BTC/USD").await })
    };

    let request = stream.next_request().await;
    assert_eq!(
        request,
        json!({
            "op": "subscribe",
            "id": "1",
            "headers": {"id": "uid-1", "token": "secret-token"},
            "args": "tickers:BTC_USD",
        })
    );

    stream.send(json!({"id": "1", "type": "ack"}));
    stream.send(json!({
        "action": "ticker",
        "symbol": "BTC_USD",
        "last": "64000.5",
        "volume": "12.5",
        "change": "-0.40 %",
    }));

    let ticker = assert_ok!(watcher.await.expect("join"));
    assert_eq!(ticker.symbol.as_deref(), Some("BTC/USD"));
    assert_eq!(ticker.bid, Some(dec("64000.5")));
    assert_eq!(ticker.ask, Some(dec("64000.5")));
    assert_eq!(ticker.percentage, Some(dec("-0.40")));

    assert_eq!(ws.ticker("BTC/USD"), Some(ticker));
    assert_eq!(
        ws.subscription("tickers:BTC_USD").map(|record| record.state),
        Some(SubscriptionState::Active)
    );
}

#[tokio::test]
async fn test_watch_balance_round_trip() {
    let mut stream = MockStream::start().await;
    let ws = adapter_for(&stream, WsConfig::default());
    assert_ok!(ws.connect().await);

    let watcher = {
        let ws = Arc::clone(&ws);
        tokio::spawn(async move { ws.watch_balance().await })
    };

    let request = stream.next_request().await;
    assert_eq!(request["op"], "subscribe");
    assert_eq!(request["args"], "balances:all");

    // frames the router cannot classify are dropped without breaking the stream
    stream.send(json!({"hello": "world"}));
    stream.send(json!({
        "action": "balance",
        "symbol": "BTC",
        "value": {"active": 1.5, "inactive": 0.5},
    }));

    let balances = assert_ok!(watcher.await.expect("join"));
    let account = balances.get("BTC").expect("BTC account");
    assert_eq!(account.free, Some(dec("1.5")));
    assert_eq!(account.used, Some(dec("0.5")));
    assert_eq!(account.total, Some(dec("2.0")));
}

#[tokio::test]
async fn test_unsubscribe_fails_pending_watchers() {
    let mut stream = MockStream::start().await;
    let ws = adapter_for(&stream, WsConfig::default());
    assert_ok!(ws.connect().await);

    let watcher = {
        let ws = Arc::clone(&ws);
        tokio::spawn(async move { ws.watch_ticker("BTC/USD").await })
    };
    let subscribe = stream.next_request().await;
    assert_eq!(subscribe["id"], "1");

    let unsubscriber = {
        let ws = Arc::clone(&ws);
        tokio::spawn(async move { ws.unsubscribe(&Topic::tickers("btc_usd"), None).await })
    };
    let unsubscribe = stream.next_request().await;
    assert_eq!(unsubscribe["op"], "unsubscribe");
    assert_eq!(unsubscribe["args"], "tickers:BTC_USD");
    assert_eq!(unsubscribe["id"], "2");

    stream.send(json!({"id": "2", "type": "ack"}));

    let ack = assert_ok!(unsubscriber.await.expect("join"));
    assert_eq!(ack, StreamValue::Ack(json!({"id": "2", "type": "ack"})));
    match watcher.await.expect("join") {
        Err(EgeraError::Unsubscribed(topic)) => assert_eq!(topic, "tickers:BTC_USD"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(ws.subscription("tickers:BTC_USD").is_none());
}

#[tokio::test]
async fn test_disable_all_sends_every_channel() {
    let mut stream = MockStream::start().await;
    let ws = adapter_for(&stream, WsConfig::default());
    assert_ok!(ws.connect().await);

    let disabler = {
        let ws = Arc::clone(&ws);
        tokio::spawn(async move { ws.disable_all().await })
    };

    let request = stream.next_request().await;
    assert_eq!(request["op"], "unsubscribe");
    assert_eq!(
        request["args"],
        json!([
            "trades:all",
            "tickers:all",
            "orderbooks:all",
            "connected:all",
            "balances:all",
            "orders:all",
            "wallets:all",
        ])
    );

    stream.send(json!({"id": request["id"].clone(), "type": "ack"}));
    assert!(matches!(
        disabler.await.expect("join"),
        Ok(StreamValue::Ack(_))
    ));
}

#[tokio::test]
async fn test_keepalive_ping_frames() {
    let mut stream = MockStream::start().await;
    let config = WsConfig {
        ping_interval: Duration::from_millis(50),
        ..WsConfig::default()
    };
    let ws = adapter_for(&stream, config);
    assert_ok!(ws.connect().await);

    let frame = tokio::time::timeout(Duration::from_secs(5), stream.received.recv())
        .await
        .expect("ping within timeout")
        .expect("server task ended");
    assert_eq!(frame["type"], "ping");
    assert_eq!(frame["id"], "1");
}

#[tokio::test]
async fn test_missing_pong_closes_connection_and_fails_watchers() {
    let mut stream = MockStream::start().await;
    let config = WsConfig {
        ping_interval: Duration::from_millis(30),
        pong_timeout: Duration::from_millis(100),
        ..WsConfig::default()
    };
    let ws = adapter_for(&stream, config);
    assert_ok!(ws.connect().await);

    let watcher = {
        let ws = Arc::clone(&ws);
        tokio::spawn(async move { ws.watch_balance().await })
    };
    stream.next_request().await;

    match tokio::time::timeout(Duration::from_secs(5), watcher)
        .await
        .expect("watcher finished")
        .expect("join")
    {
        Err(EgeraError::WebSocket(message)) => assert_eq!(message, "connection closed"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!ws.is_connected().await);
    assert!(ws.subscription("balances:all").is_none());
}

#[tokio::test]
async fn test_watch_times_out_without_data() {
    let mut stream = MockStream::start().await;
    let config = WsConfig {
        watch_timeout: Duration::from_millis(100),
        ..WsConfig::default()
    };
    let ws = adapter_for(&stream, config);
    assert_ok!(ws.connect().await);

    let watcher = {
        let ws = Arc::clone(&ws);
        tokio::spawn(async move { ws.watch_balance().await })
    };
    stream.next_request().await;

    match watcher.await.expect("join") {
        Err(EgeraError::Timeout {
            message_hash,
            duration,
        }) => {
            assert_eq!(message_hash, "balances:all");
            assert_eq!(duration, 100);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_unsubscribe_can_be_retried_after_timeout() {
    let mut stream = MockStream::start().await;
    let config = WsConfig {
        watch_timeout: Duration::from_millis(100),
        ..WsConfig::default()
    };
    let ws = adapter_for(&stream, config);
    assert_ok!(ws.connect().await);
    let topic = Topic::tickers("BTC_USD");

    let first = {
        let ws = Arc::clone(&ws);
        let topic = topic.clone();
        tokio::spawn(async move { ws.unsubscribe(&topic, None).await })
    };
    assert_eq!(stream.next_request().await["id"], "1");
    assert!(matches!(
        first.await.expect("join"),
        Err(EgeraError::Timeout { .. })
    ));
    assert!(ws.subscription("unsubscribe:tickers:BTC_USD").is_none());

    let second = {
        let ws = Arc::clone(&ws);
        tokio::spawn(async move { ws.unsubscribe(&topic, None).await })
    };
    let retry = stream.next_request().await;
    assert_eq!(retry["op"], "unsubscribe");
    assert_eq!(retry["id"], "2");

    stream.send(json!({"id": "2", "type": "ack"}));
    assert!(matches!(
        second.await.expect("join"),
        Ok(StreamValue::Ack(_))
    ));
}

#[tokio::test]
async fn test_reconnect_keeps_new_session_state() {
    let mut stream = MockStream::start().await;
    let ws = adapter_for(&stream, WsConfig::default());

    for _ in 0..5 {
        assert_ok!(ws.connect().await);
        ws.disconnect().await;
        assert!(!ws.is_connected().await);
        assert_ok!(ws.connect().await);

        let watcher = {
            let ws = Arc::clone(&ws);
            tokio::spawn(async move { ws.watch_balance().await })
        };
        let request = stream.next_request().await;
        assert_eq!(request["args"], "balances:all");

        // give the first session's task time to wind down
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(ws.is_connected().await);
        assert!(ws.subscription("balances:all").is_some());

        stream.send(json!({
            "action": "balance",
            "symbol": "BTC",
            "value": {"active": "1", "inactive": "0"},
        }));
        let balances = assert_ok!(watcher.await.expect("join"));
        assert!(balances.get("BTC").is_some());

        ws.disconnect().await;
    }
}

#[tokio::test]
async fn test_connect_rejects_zero_ping_interval() {
    let stream = MockStream::start().await;
    let config = WsConfig {
        ping_interval: Duration::ZERO,
        ..WsConfig::default()
    };
    let ws = adapter_for(&stream, config);
    assert!(matches!(ws.connect().await, Err(EgeraError::Config(_))));
    assert!(!ws.is_connected().await);
}

#[tokio::test]
async fn test_connect_twice_is_rejected() {
    let stream = MockStream::start().await;
    let ws = adapter_for(&stream, WsConfig::default());
    assert_ok!(ws.connect().await);
    assert!(matches!(
        ws.connect().await,
        Err(EgeraError::AlreadyConnected)
    ));
}

#[tokio::test]
async fn test_subscribe_requires_credentials() {
    let ws = EgeraWebSocket::new(WsConfig::default(), Arc::new(StaticMarkets::default()));
    assert!(matches!(
        ws.subscribe(&Topic::all(Channel::Balances), None).await,
        Err(EgeraError::MissingCredentials("secret"))
    ));
}

#[test]
fn test_request_ids_start_at_one() {
    let ws = EgeraWebSocket::new(WsConfig::default(), Arc::new(StaticMarkets::default()));
    let ids: Vec<u64> = (0..5).map(|_| ws.request_id()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}
