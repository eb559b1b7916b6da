//! Collaborator traits consumed by the pipeline.
//!
//! The orchestrator never implements recognition, generation, or synthesis.
//! Embedders supply these capabilities as trait objects; any that are left
//! unset cause the corresponding stage to be skipped, not to fail.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::pipeline::messages::SpeakerAttribution;

/// Options for a single transcription request.
#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    /// BCP-47 language hint, if known.
    pub language: Option<String>,
}

/// A transcription result from the STT engine.
#[derive(Debug, Clone)]
pub struct Transcription {
    /// The transcribed text.
    pub text: String,
    /// Engine confidence in [0, 1], if reported.
    pub confidence: Option<f32>,
}

/// Options for a single generation request.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
        }
    }
}

/// Options for a single synthesis request.
#[derive(Debug, Clone, Default)]
pub struct SynthesisOptions {
    /// Voice identifier understood by the TTS backend.
    pub voice: Option<String>,
    /// Speaking rate multiplier, 1.0 = normal.
    pub rate: Option<f32>,
}

/// Frame-level speech detection.
#[async_trait]
pub trait VadService: Send + Sync {
    /// One-time setup before the turn loop starts.
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Whether this frame of samples contains speech.
    async fn detect_speech(&self, samples: &[f32]) -> Result<bool>;
}

/// Speech-to-text transcription.
#[async_trait]
pub trait SttService: Send + Sync {
    /// One-time setup before the turn loop starts.
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Transcribe 16-bit little-endian PCM at `sample_rate` Hz.
    async fn transcribe(
        &self,
        pcm: &[u8],
        sample_rate: u32,
        options: &TranscribeOptions,
    ) -> Result<Transcription>;
}

/// Streaming response generation.
#[async_trait]
pub trait LlmService: Send + Sync {
    /// One-time setup before the turn loop starts.
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Generate a response to `prompt`, sending incremental text fragments
    /// to `tokens` as they decode. Returns the complete response text.
    ///
    /// Implementations should treat a closed `tokens` channel as a
    /// cancellation signal and stop generating.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
        tokens: mpsc::Sender<String>,
    ) -> Result<String>;
}

/// Text-to-speech synthesis.
#[async_trait]
pub trait TtsService: Send + Sync {
    /// One-time setup before the turn loop starts.
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Synthesize `text` to playable audio bytes.
    async fn synthesize(&self, text: &str, options: &SynthesisOptions) -> Result<Vec<u8>>;
}

/// Best-effort speaker identification on finalized utterances.
#[async_trait]
pub trait DiarizationService: Send + Sync {
    /// One-time setup before the turn loop starts.
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Attribute an utterance to a speaker. `None` when undecided.
    async fn process_audio(&self, samples: &[f32]) -> Result<Option<SpeakerAttribution>>;
}

/// Playback driver for synthesized audio. Resolves when playback finishes.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// One-time setup before the turn loop starts.
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Play `audio` to completion.
    async fn play(&self, audio: &[u8]) -> Result<()>;
}

/// The set of components wired into a pipeline.
///
/// Every handle is optional. Configured once through the builder methods
/// and read-only afterwards.
#[derive(Clone, Default)]
pub struct ComponentSet {
    pub vad: Option<Arc<dyn VadService>>,
    pub stt: Option<Arc<dyn SttService>>,
    pub llm: Option<Arc<dyn LlmService>>,
    pub tts: Option<Arc<dyn TtsService>>,
    pub diarization: Option<Arc<dyn DiarizationService>>,
    pub player: Option<Arc<dyn AudioPlayer>>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vad(mut self, vad: Arc<dyn VadService>) -> Self {
        self.vad = Some(vad);
        self
    }

    pub fn with_stt(mut self, stt: Arc<dyn SttService>) -> Self {
        self.stt = Some(stt);
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmService>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_tts(mut self, tts: Arc<dyn TtsService>) -> Self {
        self.tts = Some(tts);
        self
    }

    pub fn with_diarization(mut self, diarization: Arc<dyn DiarizationService>) -> Self {
        self.diarization = Some(diarization);
        self
    }

    pub fn with_player(mut self, player: Arc<dyn AudioPlayer>) -> Self {
        self.player = Some(player);
        self
    }
}

impl std::fmt::Debug for ComponentSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentSet")
            .field("vad", &self.vad.is_some())
            .field("stt", &self.stt.is_some())
            .field("llm", &self.llm.is_some())
            .field("tts", &self.tts.is_some())
            .field("diarization", &self.diarization.is_some())
            .field("player", &self.player.is_some())
            .finish()
    }
}
