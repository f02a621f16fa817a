// Waitline Infrastructure - Network Adapters
// Implements: FeedChannel (WebSocket), QueueApi (HTTP)

pub mod backoff;
pub mod codec;
pub mod http_api;
pub mod ws_channel;

pub use backoff::{BackoffConfig, ReconnectBackoff};
pub use http_api::HttpQueueApi;
pub use ws_channel::{derive_feed_url, WsFeedChannel, WsFeedConfig};
