// Port Layer - Interfaces for external dependencies

pub mod feed_channel;
pub mod id_provider; // For deterministic testing
pub mod queue_api;
pub mod speech_engine;
pub mod time_provider;

// Re-exports
pub use feed_channel::{FeedChannel, FeedError, FeedEvent, PushMessage};
pub use id_provider::IdProvider;
pub use queue_api::{ApiError, QueueApi};
pub use speech_engine::{
    CompletionSender, SilentSpeechEngine, SpeechCompletion, SpeechEngine, SpeechError,
    SpeechOutcome, Utterance, UtteranceId, VoiceDescriptor,
};
pub use time_provider::TimeProvider;
