//! Wire codec for the queue push channel
//!
//! Frames are JSON text messages shaped `{"event": NAME, "data": PAYLOAD}`.
//! Unknown server events are ignored so the backend can add events freely.

use serde::{Deserialize, Serialize};
use waitline_core::domain::{QueueEntry, QueueSnapshot, SubscriptionScope};
use waitline_core::port::{FeedError, PushMessage};

pub const EVENT_GET_QUEUE: &str = "GET_QUEUE";
pub const EVENT_GET_QUEUE_BY_DATE: &str = "GET_QUEUE_BY_DATE";
pub const EVENT_QUEUE_UPDATE: &str = "QUEUE_UPDATE";
pub const EVENT_RESET_SUCCESS: &str = "RESET_SUCCESS";

/// Client to server requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientFrame {
    #[serde(rename = "GET_QUEUE")]
    GetQueue,
    /// Date key `YYYY-MM-DD`
    #[serde(rename = "GET_QUEUE_BY_DATE")]
    GetQueueByDate(String),
}

impl From<SubscriptionScope> for ClientFrame {
    fn from(scope: SubscriptionScope) -> Self {
        match scope {
            SubscriptionScope::All => ClientFrame::GetQueue,
            SubscriptionScope::Date(date) => ClientFrame::GetQueueByDate(date.key()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ResetPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    queue: Vec<QueueEntry>,
}

pub fn encode_subscribe(scope: SubscriptionScope) -> Result<String, FeedError> {
    serde_json::to_string(&ClientFrame::from(scope))
        .map_err(|e| FeedError::Protocol(e.to_string()))
}

/// Decode one server text frame; Ok(None) for events this client does not handle
pub fn decode_server_frame(text: &str) -> Result<Option<PushMessage>, FeedError> {
    let frame: RawFrame = serde_json::from_str(text)
        .map_err(|e| FeedError::Protocol(format!("malformed frame: {}", e)))?;

    match frame.event.as_str() {
        EVENT_QUEUE_UPDATE => {
            let entries: Vec<QueueEntry> =
                serde_json::from_value(frame.data).map_err(|e| bad_payload(EVENT_QUEUE_UPDATE, e))?;
            Ok(Some(PushMessage::FullSnapshot(QueueSnapshot::from(entries))))
        }
        EVENT_RESET_SUCCESS => {
            let payload: ResetPayload =
                serde_json::from_value(frame.data).map_err(|e| bad_payload(EVENT_RESET_SUCCESS, e))?;
            Ok(Some(PushMessage::Reset {
                message: payload.message,
                snapshot: QueueSnapshot::from(payload.queue),
            }))
        }
        _ => Ok(None),
    }
}

fn bad_payload(event: &str, e: serde_json::Error) -> FeedError {
    FeedError::Protocol(format!("bad {} payload: {}", event, e))
}
