/*
[INPUT]:  WsConfig and shared stream state
[OUTPUT]: Background task pumping outbound frames, inbound routing and keep-alive
[POS]:    WebSocket layer - socket ownership
[UPDATE]: When changing connection lifecycle or keep-alive rules
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

use crate::http::{EgeraError, Result};

use super::config::WsConfig;
use super::message::ping_frame;
use super::router::truncate_for_log;
use super::state::StreamState;

const PARSE_FAIL_LOG_LIMIT: usize = 3;
const RAW_LOG_MAX_BYTES: usize = 1024;

static PARSE_FAIL_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Open the socket and spawn the task that owns it.
pub(crate) async fn open(state: Arc<StreamState>, config: &WsConfig) -> Result<()> {
    config.validate()?;
    if state.outbound.lock().await.is_some() {
        return Err(EgeraError::AlreadyConnected);
    }

    let (ws_stream, _response) = connect_async(config.url.as_str())
        .await
        .map_err(|err| EgeraError::WebSocket(err.to_string()))?;
    let (mut write, mut read) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel(config.channel_capacity);

    let generation = {
        let mut guard = state.outbound.lock().await;
        if guard.is_some() {
            return Err(EgeraError::AlreadyConnected);
        }
        state.begin_session(&mut guard, outbound_tx)
    };
    state.touch_pong();
    info!(url = %config.url, generation, "ws connected");

    let ping_every = config.ping_interval;
    let pong_timeout = config.pong_timeout;

    tokio::spawn(async move {
        let mut ping = interval_at(Instant::now() + ping_every, ping_every);

        loop {
            tokio::select! {
                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(message) => {
                            if write.send(message).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            let _ = write.send(WsMessage::Close(None)).await;
                            break;
                        }
                    }
                }
                _ = ping.tick() => {
                    let silent_for = state.since_last_pong();
                    if silent_for > pong_timeout {
                        warn!(silent_ms = silent_for.as_millis() as u64, "ws pong timeout, closing");
                        let _ = write.send(WsMessage::Close(None)).await;
                        break;
                    }
                    let frame = ping_frame(state.next_request_id());
                    if write.send(WsMessage::Text(frame.to_string().into())).await.is_err() {
                        break;
                    }
                }
                incoming = read.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Close(_))) => {
                            let _ = write.send(WsMessage::Close(None)).await;
                            break;
                        }
                        Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => {}
                        Some(Ok(message)) => route_frame(&state, message),
                        Some(Err(err)) => {
                            warn!(error = %err, "ws read failed");
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        let mut guard = state.outbound.lock().await;
        match state.end_session(&mut guard, generation) {
            Some(rejected) => info!(generation, rejected, "ws disconnected"),
            None => debug!(generation, "ws session already replaced"),
        }
    });

    Ok(())
}

fn route_frame(state: &StreamState, message: WsMessage) {
    let parsed = match &message {
        WsMessage::Text(text) => serde_json::from_str::<Value>(text.as_str()),
        WsMessage::Binary(bytes) => serde_json::from_slice::<Value>(bytes),
        _ => return,
    };

    match parsed {
        Ok(value) => {
            state.handle_message(&value);
        }
        Err(err) => log_parse_fail_once(&err, &message),
    }
}

fn log_parse_fail_once(err: &serde_json::Error, message: &WsMessage) {
    let count = PARSE_FAIL_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < PARSE_FAIL_LOG_LIMIT {
        let raw = message.to_text().unwrap_or_default();
        warn!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            error = %err,
            bytes = raw.len(),
            "ws message parse failed"
        );
        debug!(
            sample_index = count + 1,
            sample_limit = PARSE_FAIL_LOG_LIMIT,
            message = %truncate_for_log(raw, RAW_LOG_MAX_BYTES),
            "ws message parse failed"
        );
    }
}
