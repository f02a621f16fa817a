//! Announcement Coordinator - speaks "now serving" exactly once per entry
//!
//! The coordinator watches each snapshot for the current patient and starts
//! an utterance the first time an id becomes current. Ids are remembered in
//! a spoken set until `reset()`, so repeated or reordered deliveries never
//! produce a second utterance. A failed utterance un-marks its id so the next
//! qualifying snapshot retries it; nothing else is ever retried.

use crate::application::localization::{select_voice_with, Locale};
use crate::application::projector::current_patient;
use crate::domain::{EntryId, QueueEntry, QueueSnapshot};
use crate::port::{
    CompletionSender, SpeechCompletion, SpeechEngine, SpeechOutcome, Utterance, UtteranceId,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const SPEECH_RATE: f32 = 0.8;
pub const SPEECH_PITCH: f32 = 1.0;
pub const SPEECH_VOLUME: f32 = 1.0;

/// In-flight utterance state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnouncerState {
    Idle,
    Speaking {
        utterance_id: UtteranceId,
        entry_id: EntryId,
    },
}

pub struct AnnouncementCoordinator {
    engine: Arc<dyn SpeechEngine>,
    locale: Locale,
    capable: bool,
    enabled: bool,
    spoken: HashSet<EntryId>,
    last_announced: Option<EntryId>,
    state: AnnouncerState,
    next_utterance_id: UtteranceId,
    completions_tx: CompletionSender,
    completions_rx: mpsc::UnboundedReceiver<SpeechCompletion>,
}

impl AnnouncementCoordinator {
    /// Create a coordinator; speech capability is probed once here
    pub fn new(engine: Arc<dyn SpeechEngine>, locale: Locale, enabled: bool) -> Self {
        let capable = engine.is_available();
        if !capable {
            warn!(
                locale = locale.tag(),
                "Speech output unavailable, announcements disabled"
            );
        }

        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            engine,
            locale,
            capable,
            enabled,
            spoken: HashSet::new(),
            last_announced: None,
            state: AnnouncerState::Idle,
            next_utterance_id: 1,
            completions_tx,
            completions_rx,
        }
    }

    /// Announce the current patient if it has not been announced yet
    ///
    /// Returns the id of the utterance that was started, if any. While
    /// disabled the entry is still marked as spoken, so re-enabling does not
    /// replay a patient who became current in the meantime.
    pub fn announce_if_needed(&mut self, snapshot: &QueueSnapshot) -> Option<UtteranceId> {
        if !self.capable {
            return None;
        }

        let entry = current_patient(snapshot)?;
        if self.spoken.contains(&entry.id) {
            return None;
        }

        self.spoken.insert(entry.id.clone());
        self.last_announced = Some(entry.id.clone());

        if !self.enabled {
            debug!(
                entry_id = %entry.id,
                token = entry.token_number,
                "Announcements disabled, marking entry as spoken"
            );
            return None;
        }

        self.speak(entry)
    }

    fn speak(&mut self, entry: &QueueEntry) -> Option<UtteranceId> {
        // Never overlap: whatever is playing is superseded
        self.engine.cancel();

        let utterance_id = self.next_utterance_id;
        self.next_utterance_id += 1;

        let voice = select_voice_with(&self.locale.voice_strategies(), &self.engine.voices());
        let utterance = Utterance {
            id: utterance_id,
            text: self.locale.announcement_text(entry.token_number, &entry.name),
            lang: self.locale.tag().to_string(),
            voice,
            rate: SPEECH_RATE,
            pitch: SPEECH_PITCH,
            volume: SPEECH_VOLUME,
        };

        match self.engine.speak(utterance, self.completions_tx.clone()) {
            Ok(()) => {
                info!(
                    entry_id = %entry.id,
                    token = entry.token_number,
                    utterance_id,
                    "Announcing patient"
                );
                self.state = AnnouncerState::Speaking {
                    utterance_id,
                    entry_id: entry.id.clone(),
                };
                Some(utterance_id)
            }
            Err(e) => {
                warn!(
                    entry_id = %entry.id,
                    token = entry.token_number,
                    error = %e,
                    "Failed to start announcement, will retry on next snapshot"
                );
                self.spoken.remove(&entry.id);
                self.state = AnnouncerState::Idle;
                None
            }
        }
    }

    /// Apply a completion reported by the engine
    ///
    /// Completions for anything but the in-flight utterance are stale and
    /// ignored.
    pub fn on_completion(&mut self, completion: SpeechCompletion) {
        let entry_id = match &self.state {
            AnnouncerState::Speaking {
                utterance_id,
                entry_id,
            } if *utterance_id == completion.utterance_id => entry_id.clone(),
            _ => {
                debug!(
                    utterance_id = completion.utterance_id,
                    "Ignoring completion for superseded utterance"
                );
                return;
            }
        };

        self.state = AnnouncerState::Idle;
        match completion.outcome {
            SpeechOutcome::Completed => {
                debug!(entry_id = %entry_id, "Announcement finished");
            }
            SpeechOutcome::Cancelled => {
                debug!(entry_id = %entry_id, "Announcement cancelled");
            }
            SpeechOutcome::Failed(e) => {
                warn!(
                    entry_id = %entry_id,
                    error = %e,
                    "Announcement failed, will retry on next snapshot"
                );
                self.spoken.remove(&entry_id);
            }
        }
    }

    /// Wait for the next completion notification
    pub async fn next_completion(&mut self) -> Option<SpeechCompletion> {
        self.completions_rx.recv().await
    }

    /// Apply every completion already delivered; returns how many were applied
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.on_completion(completion);
            applied += 1;
        }
        applied
    }

    /// Forget every announced id; the only way to announce an id again
    pub fn reset(&mut self) {
        debug!(cleared = self.spoken.len(), "Clearing spoken set");
        self.spoken.clear();
        self.last_announced = None;
    }

    /// Cancel in-flight speech (idempotent)
    pub fn stop(&mut self) {
        if !self.capable {
            return;
        }
        if self.state != AnnouncerState::Idle {
            debug!("Stopping in-flight announcement");
        }
        self.engine.cancel();
        self.state = AnnouncerState::Idle;
    }

    /// Toggle speech; disabling also silences whatever is playing
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        info!(enabled, "Announcements toggled");
        if !enabled {
            self.stop();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_capable(&self) -> bool {
        self.capable
    }

    pub fn state(&self) -> &AnnouncerState {
        &self.state
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self.state, AnnouncerState::Speaking { .. })
    }

    pub fn has_spoken(&self, id: &EntryId) -> bool {
        self.spoken.contains(id)
    }

    pub fn last_announced_id(&self) -> Option<&EntryId> {
        self.last_announced.as_ref()
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }
}
