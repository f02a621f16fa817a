// Subprocess speech engine
// Drives a local eSpeak-compatible TTS binary, one child process per utterance
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use waitline_core::port::{
    CompletionSender, SpeechCompletion, SpeechEngine, SpeechError, SpeechOutcome, Utterance,
    UtteranceId, VoiceDescriptor,
};

/// Binaries probed when none is configured, in order
pub const DEFAULT_TTS_BINARIES: [&str; 2] = ["espeak-ng", "espeak"];

/// Words per minute at rate 1.0 (eSpeak default)
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// Time allowed for `--voices` to answer during detection (5s)
const VOICE_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Time a cancelled child gets after SIGTERM before SIGKILL (2s)
const GRACEFUL_STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Time allowed to collect stderr once a failed child has exited (1s)
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Trailing stderr characters kept in a playback error
const STDERR_TAIL_CHARS: usize = 512;

/// Environment passed through to the TTS child; everything else is dropped
const ENV_ALLOWLIST: [&str; 5] = ["PATH", "HOME", "XDG_RUNTIME_DIR", "PULSE_SERVER", "ALSA_CARD"];

struct Playback {
    utterance_id: UtteranceId,
    cancel: oneshot::Sender<()>,
}

/// Speech engine backed by `espeak-ng` (or a compatible binary)
pub struct SubprocessSpeechEngine {
    binary: Option<String>,
    voices: Vec<VoiceDescriptor>,
    current: Arc<Mutex<Option<Playback>>>,
}

impl SubprocessSpeechEngine {
    /// Engine for a known binary and voice list (no probing)
    pub fn with_binary(binary: impl Into<String>, voices: Vec<VoiceDescriptor>) -> Self {
        Self {
            binary: Some(binary.into()),
            voices,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Engine that reports itself unavailable
    pub fn unavailable() -> Self {
        Self {
            binary: None,
            voices: Vec::new(),
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Fresh engine for the same binary and voices, with its own playback slot
    pub fn fork(&self) -> Self {
        Self {
            binary: self.binary.clone(),
            voices: self.voices.clone(),
            current: Arc::new(Mutex::new(None)),
        }
    }

    pub fn binary(&self) -> Option<&str> {
        self.binary.as_deref()
    }

    /// Probe for a working TTS binary
    ///
    /// Uses `preferred` when given, otherwise the first of
    /// [`DEFAULT_TTS_BINARIES`] that answers `--voices`. Detection happens
    /// once; a host without any binary gets an unavailable engine.
    pub async fn detect(preferred: Option<&str>) -> Self {
        let candidates: Vec<&str> = match preferred {
            Some(binary) => vec![binary],
            None => DEFAULT_TTS_BINARIES.to_vec(),
        };

        for binary in candidates {
            match probe_voices(binary).await {
                Ok(voices) => {
                    info!(binary, voices = voices.len(), "Speech engine detected");
                    return Self::with_binary(binary, voices);
                }
                Err(e) => debug!(binary, error = %e, "TTS binary not usable"),
            }
        }

        warn!("No TTS binary found, speech output unavailable");
        Self::unavailable()
    }

    fn spawn_child(&self, binary: &str, utterance: &Utterance) -> Result<Child, SpeechError> {
        Command::new(binary)
            .args(espeak_args(utterance))
            .env_clear()
            .envs(allowed_env())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpeechError::SpawnFailed(format!("{}: {}", binary, e)))
    }
}

impl SpeechEngine for SubprocessSpeechEngine {
    fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    fn voices(&self) -> Vec<VoiceDescriptor> {
        self.voices.clone()
    }

    fn speak(&self, utterance: Utterance, done: CompletionSender) -> Result<(), SpeechError> {
        let binary = self
            .binary
            .as_deref()
            .ok_or_else(|| SpeechError::Unavailable("no TTS binary detected".to_string()))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SpeechError::Unavailable(format!("no async runtime: {}", e)))?;

        let _guard = runtime.enter();
        let child = self.spawn_child(binary, &utterance)?;
        let utterance_id = utterance.id;
        let (cancel_tx, cancel_rx) = oneshot::channel();

        if let Ok(mut current) = self.current.lock() {
            *current = Some(Playback {
                utterance_id,
                cancel: cancel_tx,
            });
        }

        debug!(utterance_id, pid = ?child.id(), lang = %utterance.lang, "Speaking");

        let current = Arc::clone(&self.current);
        runtime.spawn(async move {
            let outcome = supervise(child, cancel_rx).await;

            if let Ok(mut slot) = current.lock() {
                if slot.as_ref().map(|p| p.utterance_id) == Some(utterance_id) {
                    *slot = None;
                }
            }

            let _ = done.send(SpeechCompletion {
                utterance_id,
                outcome,
            });
        });

        Ok(())
    }

    fn cancel(&self) {
        let playback = self.current.lock().ok().and_then(|mut slot| slot.take());
        if let Some(playback) = playback {
            debug!(utterance_id = playback.utterance_id, "Cancelling speech");
            let _ = playback.cancel.send(());
        }
    }
}

/// Wait for the child to finish or for a cancel request
///
/// Stderr is drained on its own task while the child runs, so a chatty
/// binary can never block on a full pipe.
async fn supervise(mut child: Child, mut cancel_rx: oneshot::Receiver<()>) -> SpeechOutcome {
    let stderr = child.stderr.take().map(|pipe| tokio::spawn(drain(pipe)));

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => SpeechOutcome::Completed,
            Ok(status) => {
                let detail = collect(stderr).await;
                SpeechOutcome::Failed(SpeechError::Playback(format!("{} {}", status, detail.trim())))
            }
            Err(e) => SpeechOutcome::Failed(SpeechError::Playback(e.to_string())),
        },
        _ = &mut cancel_rx => {
            terminate(&mut child).await;
            SpeechOutcome::Cancelled
        }
    }
}

async fn drain(mut pipe: ChildStderr) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Err(e) = pipe.read_to_end(&mut buf).await {
        debug!(error = %e, "Reading TTS stderr failed");
    }
    buf
}

/// Tail of what the child wrote to stderr
async fn collect(stderr: Option<JoinHandle<Vec<u8>>>) -> String {
    let Some(handle) = stderr else {
        return String::new();
    };
    let bytes = match timeout(STDERR_DRAIN_TIMEOUT, handle).await {
        Ok(Ok(bytes)) => bytes,
        _ => return String::new(),
    };
    stderr_tail(&String::from_utf8_lossy(&bytes))
}

fn stderr_tail(text: &str) -> String {
    let start = text
        .char_indices()
        .rev()
        .nth(STDERR_TAIL_CHARS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    text[start..].to_string()
}

/// SIGTERM first, SIGKILL if the child does not exit in time
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                debug!(pid, error = %e, "SIGTERM failed");
            } else if timeout(GRACEFUL_STOP_TIMEOUT, child.wait()).await.is_ok() {
                return;
            }
            warn!(pid, "TTS process did not exit after SIGTERM, killing");
        }
    }

    if let Err(e) = child.kill().await {
        debug!(error = %e, "Kill failed (process already gone)");
    }
}

async fn probe_voices(binary: &str) -> Result<Vec<VoiceDescriptor>, SpeechError> {
    let output = timeout(
        VOICE_PROBE_TIMEOUT,
        Command::new(binary)
            .arg("--voices")
            .env_clear()
            .envs(allowed_env())
            .stdin(Stdio::null())
            .output(),
    )
    .await
    .map_err(|_| SpeechError::Unavailable(format!("{} --voices timed out", binary)))?
    .map_err(|e| SpeechError::Unavailable(e.to_string()))?;

    if !output.status.success() {
        return Err(SpeechError::Unavailable(format!(
            "{} --voices exited with {}",
            binary, output.status
        )));
    }
    Ok(parse_voices(&String::from_utf8_lossy(&output.stdout)))
}

fn allowed_env() -> Vec<(String, String)> {
    std::env::vars()
        .filter(|(k, _)| ENV_ALLOWLIST.contains(&k.as_str()))
        .collect()
}

/// Parse the table printed by `espeak-ng --voices`
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  te              --/M      Telugu             dra/te
/// ```
pub fn parse_voices(output: &str) -> Vec<VoiceDescriptor> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                [_, lang, _, name, ..] => Some(VoiceDescriptor::new(*name, *lang)),
                _ => None,
            }
        })
        .collect()
}

/// Command-line arguments for one utterance
///
/// Rate scales the default 175 wpm, pitch maps 1.0 to eSpeak's 50 and volume
/// maps 1.0 to amplitude 100.
pub fn espeak_args(utterance: &Utterance) -> Vec<String> {
    let voice = match &utterance.voice {
        Some(voice) => voice.lang.clone(),
        None => utterance
            .lang
            .split('-')
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let words_per_minute = (BASE_WORDS_PER_MINUTE * utterance.rate).round() as u32;
    let pitch = (50.0 * utterance.pitch).round().clamp(0.0, 99.0) as u32;
    let amplitude = (100.0 * utterance.volume).round().clamp(0.0, 200.0) as u32;

    vec![
        "-v".to_string(),
        voice,
        "-s".to_string(),
        words_per_minute.to_string(),
        "-p".to_string(),
        pitch.to_string(),
        "-a".to_string(),
        amplitude.to_string(),
        "--".to_string(),
        utterance.text.clone(),
    ]
}
