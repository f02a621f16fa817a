// Speech Engine Port
// Abstraction over the audio output used for "now serving" announcements

use thiserror::Error;
use tokio::sync::mpsc;

/// Identifier of one utterance, unique per coordinator
pub type UtteranceId = u64;

/// An installed voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceDescriptor {
    pub name: String,
    /// BCP-47 language tag (e.g. "te-IN")
    pub lang: String,
}

impl VoiceDescriptor {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// Text to speak plus prosody
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub lang: String,
    pub voice: Option<VoiceDescriptor>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

/// Speech errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("Speech output unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to start speech: {0}")]
    SpawnFailed(String),

    #[error("Playback failed: {0}")]
    Playback(String),
}

/// How an utterance ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    Completed,
    /// Stopped by `cancel()`; not an error
    Cancelled,
    Failed(SpeechError),
}

/// Completion notification for one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechCompletion {
    pub utterance_id: UtteranceId,
    pub outcome: SpeechOutcome,
}

pub type CompletionSender = mpsc::UnboundedSender<SpeechCompletion>;

/// Speech Engine trait
///
/// Playback is fire-and-forget: `speak` returns as soon as playback has
/// started and reports exactly one `SpeechCompletion` on `done` later.
/// The engine does not serialize overlapping utterances; callers cancel first.
pub trait SpeechEngine: Send + Sync {
    /// Whether any speech output exists on this host
    fn is_available(&self) -> bool;

    /// Installed voices, in engine preference order
    fn voices(&self) -> Vec<VoiceDescriptor>;

    /// Start speaking
    ///
    /// # Errors
    /// - SpeechError::Unavailable if the engine cannot speak at all
    /// - SpeechError::SpawnFailed if playback could not be started
    fn speak(&self, utterance: Utterance, done: CompletionSender) -> Result<(), SpeechError>;

    /// Cancel in-flight playback (idempotent)
    fn cancel(&self);
}

/// Engine for hosts without audio output
pub struct SilentSpeechEngine;

impl SpeechEngine for SilentSpeechEngine {
    fn is_available(&self) -> bool {
        false
    }

    fn voices(&self) -> Vec<VoiceDescriptor> {
        Vec::new()
    }

    fn speak(&self, _utterance: Utterance, _done: CompletionSender) -> Result<(), SpeechError> {
        Err(SpeechError::Unavailable("no speech engine configured".to_string()))
    }

    fn cancel(&self) {}
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Mock engine behavior
    #[derive(Debug, Clone)]
    pub enum MockSpeechBehavior {
        /// Keep utterances pending until the test finishes them
        Manual,
        /// Report completion immediately
        AutoComplete,
        /// Reject every `speak` call
        RejectSpeak(SpeechError),
    }

    #[derive(Default)]
    struct Recorder {
        spoken: Vec<Utterance>,
        pending: HashMap<UtteranceId, CompletionSender>,
        cancel_count: usize,
    }

    /// Recording Speech Engine for testing
    #[derive(Clone)]
    pub struct MockSpeechEngine {
        available: bool,
        voices: Vec<VoiceDescriptor>,
        behavior: Arc<Mutex<MockSpeechBehavior>>,
        recorder: Arc<Mutex<Recorder>>,
    }

    impl MockSpeechEngine {
        pub fn new(behavior: MockSpeechBehavior) -> Self {
            Self {
                available: true,
                voices: vec![VoiceDescriptor::new("Telugu", "te-IN")],
                behavior: Arc::new(Mutex::new(behavior)),
                recorder: Arc::new(Mutex::new(Recorder::default())),
            }
        }

        pub fn new_manual() -> Self {
            Self::new(MockSpeechBehavior::Manual)
        }

        pub fn new_auto_complete() -> Self {
            Self::new(MockSpeechBehavior::AutoComplete)
        }

        pub fn new_unavailable() -> Self {
            let mut engine = Self::new(MockSpeechBehavior::Manual);
            engine.available = false;
            engine.voices.clear();
            engine
        }

        pub fn with_voices(mut self, voices: Vec<VoiceDescriptor>) -> Self {
            self.voices = voices;
            self
        }

        pub fn set_behavior(&self, behavior: MockSpeechBehavior) {
            *self.behavior.lock().unwrap() = behavior;
        }

        /// Every utterance passed to `speak`, in order
        pub fn spoken(&self) -> Vec<Utterance> {
            self.recorder.lock().unwrap().spoken.clone()
        }

        pub fn spoken_texts(&self) -> Vec<String> {
            self.spoken().into_iter().map(|u| u.text).collect()
        }

        pub fn cancel_count(&self) -> usize {
            self.recorder.lock().unwrap().cancel_count
        }

        pub fn pending_count(&self) -> usize {
            self.recorder.lock().unwrap().pending.len()
        }

        /// Finish a pending utterance with the given outcome
        pub fn finish(&self, utterance_id: UtteranceId, outcome: SpeechOutcome) -> bool {
            let sender = self.recorder.lock().unwrap().pending.remove(&utterance_id);
            match sender {
                Some(tx) => tx
                    .send(SpeechCompletion {
                        utterance_id,
                        outcome,
                    })
                    .is_ok(),
                None => false,
            }
        }

        pub fn complete(&self, utterance_id: UtteranceId) -> bool {
            self.finish(utterance_id, SpeechOutcome::Completed)
        }

        pub fn fail(&self, utterance_id: UtteranceId, message: impl Into<String>) -> bool {
            self.finish(
                utterance_id,
                SpeechOutcome::Failed(SpeechError::Playback(message.into())),
            )
        }
    }

    impl SpeechEngine for MockSpeechEngine {
        fn is_available(&self) -> bool {
            self.available
        }

        fn voices(&self) -> Vec<VoiceDescriptor> {
            self.voices.clone()
        }

        fn speak(&self, utterance: Utterance, done: CompletionSender) -> Result<(), SpeechError> {
            let behavior = self.behavior.lock().unwrap().clone();
            let mut recorder = self.recorder.lock().unwrap();

            match behavior {
                MockSpeechBehavior::RejectSpeak(err) => Err(err),
                MockSpeechBehavior::AutoComplete => {
                    let utterance_id = utterance.id;
                    recorder.spoken.push(utterance);
                    let _ = done.send(SpeechCompletion {
                        utterance_id,
                        outcome: SpeechOutcome::Completed,
                    });
                    Ok(())
                }
                MockSpeechBehavior::Manual => {
                    recorder.pending.insert(utterance.id, done);
                    recorder.spoken.push(utterance);
                    Ok(())
                }
            }
        }

        fn cancel(&self) {
            let mut recorder = self.recorder.lock().unwrap();
            recorder.cancel_count += 1;
            for (utterance_id, tx) in recorder.pending.drain() {
                let _ = tx.send(SpeechCompletion {
                    utterance_id,
                    outcome: SpeechOutcome::Cancelled,
                });
            }
        }
    }
}
