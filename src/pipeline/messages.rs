//! Message and event types passed between pipeline stages and to the caller.

use std::time::Instant;

/// A chunk of raw audio samples from the capture side.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Mono f32 samples at the configured input sample rate.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Timestamp when this chunk was captured.
    pub captured_at: Instant,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            captured_at: Instant::now(),
        }
    }
}

/// A complete utterance detected by the segmenter, ready for STT.
#[derive(Debug, Clone)]
pub struct SpeechSegment {
    /// Concatenated audio samples for the entire utterance.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// When the utterance started.
    pub started_at: Instant,
}

/// Best-effort speaker attribution from diarization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerAttribution {
    /// Stable identifier for the speaker within this session.
    pub speaker_id: String,
    /// Whether this speaker was first seen on this segment.
    pub is_new: bool,
}

/// One completed user/assistant exchange. Not persisted anywhere.
#[derive(Debug, Clone)]
pub struct Turn {
    /// What the user said.
    pub transcript: String,
    /// The generated response text.
    pub response: String,
    /// Synthesized response audio, if a TTS component produced one.
    pub synthesized_audio: Option<Vec<u8>>,
}

/// Events emitted by the pipeline to the caller.
///
/// Delivered over a bounded channel in the order they occur. Recording
/// control (`PauseRecording` / `ResumeRecording`) is advisory: the caller
/// owns the capture device and is expected to honor it to avoid the
/// assistant hearing itself.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Normalized input level in [0, 1], one per audio chunk.
    AudioLevel(f32),
    /// The user started speaking.
    SpeechStart,
    /// The user stopped speaking; an utterance is being finalized.
    SpeechEnd,
    /// Final accepted transcription for the turn.
    TranscriptFinal {
        text: String,
        speaker: Option<SpeakerAttribution>,
    },
    /// Diarization saw a speaker it has not seen this session.
    NewSpeakerDetected { speaker_id: String },
    /// Diarization attributed this turn to a different known speaker.
    SpeakerChanged { speaker_id: String },
    /// Response generation started.
    GenerationStarted,
    /// Accumulated partial response text, coalesced at the configured
    /// interval.
    GenerationPartial { text: String },
    /// Complete response text.
    GenerationFinal { text: String },
    /// Speech synthesis and playback started.
    SynthesisStarted,
    /// Speech synthesis and playback finished.
    SynthesisCompleted,
    /// The caller should pause audio capture (assistant about to speak).
    PauseRecording,
    /// The caller should resume audio capture.
    ResumeRecording,
    /// A component's `initialize` call is starting.
    ComponentInitializing { name: String },
    /// A component's `initialize` call succeeded.
    ComponentInitialized { name: String },
    /// All configured components initialized; the turn loop is running.
    AllComponentsInitialized,
    /// A mid-turn stage failed; the pipeline has returned to listening.
    TurnFailed { reason: String },
}
