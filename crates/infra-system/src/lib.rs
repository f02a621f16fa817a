// Waitline Infrastructure - System Adapters
// Implements: SpeechEngine

pub mod speech_engine_impl;

pub use speech_engine_impl::SubprocessSpeechEngine;
