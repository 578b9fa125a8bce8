/*
[INPUT]:  WebSocket configuration and subscription topics
[OUTPUT]: Real-time tickers and balances
[POS]:    WebSocket layer - real-time data streams
[UPDATE]: When adding new channels or changing connection logic
*/

pub mod client;
pub mod config;
mod connection;
pub mod hub;
pub mod message;
pub mod request_id;
mod router;
mod state;
pub mod subscription;
pub mod topic;

pub use client::EgeraWebSocket;
pub use config::{DEFAULT_WS_URL, WsConfig};
pub use hub::StreamValue;
pub use message::{Args, InboundMessage, StreamRequest};
pub use request_id::RequestIdCounter;
pub use subscription::{SubscriptionKind, SubscriptionRecord, SubscriptionState};
pub use topic::Topic;
