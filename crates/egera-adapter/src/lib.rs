/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Egera adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod http;
pub mod markets;
pub mod normalize;
pub mod types;
pub mod ws;

// Re-export commonly used types from http
pub use http::{ClientConfig, Credentials, EgeraClient, EgeraError, Result};

pub use markets::{MarketIndex, MarketSource, StaticMarkets};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{
    EgeraWebSocket,
    StreamValue,
    SubscriptionKind,
    SubscriptionRecord,
    SubscriptionState,
    Topic,
    WsConfig,
};
