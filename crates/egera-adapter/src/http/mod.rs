/*
[INPUT]:  HTTP client configuration and API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST base extended by the stream adapter
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod client;
pub mod error;
pub mod public;

pub use error::{EgeraError, Result};

pub use client::{ClientConfig, Credentials, EgeraClient};
