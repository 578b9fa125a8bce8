/*
[INPUT]:  Outbound request parts and raw inbound JSON frames
[OUTPUT]: Serialized stream requests and classified InboundMessage values
[POS]:    WebSocket layer - wire format
[UPDATE]: When adding new message types or changing format
*/

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::{Credentials, Result};
use crate::types::Op;

/// `args` of a request: one topic or a list of topics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Args {
    One(String),
    Many(Vec<String>),
}

impl Args {
    pub fn topics(&self) -> Vec<&str> {
        match self {
            Args::One(topic) => vec![topic.as_str()],
            Args::Many(topics) => topics.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestHeaders {
    pub id: String,
    pub token: String,
}

impl From<&Credentials> for RequestHeaders {
    fn from(credentials: &Credentials) -> Self {
        Self {
            id: credentials.uid.clone(),
            token: credentials.secret.clone(),
        }
    }
}

/// Subscribe/unsubscribe frame.
///
/// `id` carries the request id so the server's `{"id": .., "type": "ack"}`
/// can be matched back to the subscription record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamRequest {
    pub op: Op,
    pub id: String,
    pub headers: RequestHeaders,
    pub args: Args,
}

impl StreamRequest {
    /// Render to JSON, with `params` merged over the top-level keys.
    pub fn into_value(self, params: Option<Map<String, Value>>) -> Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if let (Some(object), Some(params)) = (value.as_object_mut(), params) {
            object.extend(params);
        }
        Ok(value)
    }
}

/// Text keep-alive frame
pub fn ping_frame(request_id: u64) -> Value {
    serde_json::json!({
        "id": request_id.to_string(),
        "type": "ping",
    })
}

/// Inbound frame, discriminated by `action` and then by the presence of `id`
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage<'a> {
    Ticker(&'a Value),
    Balance(&'a Value),
    Ack { id: String, kind: Option<&'a str> },
    Unknown,
}

impl<'a> InboundMessage<'a> {
    pub fn classify(message: &'a Value) -> Self {
        match message.get("action").and_then(Value::as_str) {
            Some("ticker") => return InboundMessage::Ticker(message),
            Some("balance") => return InboundMessage::Balance(message),
            _ => {}
        }

        match message.get("id").and_then(id_string) {
            Some(id) => InboundMessage::Ack {
                id,
                kind: message.get("type").and_then(Value::as_str),
            },
            None => InboundMessage::Unknown,
        }
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
