//! Utterance segmentation: deciding where speech starts and ends.
//!
//! Two implementations share one endpointing core. [`EnergySegmenter`]
//! classifies frames by RMS energy and is the fallback when no VAD component
//! is configured; [`ModelSegmenter`] asks the external [`VadService`] for
//! the per-frame verdict. Everything downstream of the speech/silence
//! verdict is identical, so the counter logic lives in [`EndpointCounters`]
//! and is testable without an async harness.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::audio::rms_energy;
use crate::config::EndpointConfig;
use crate::error::Result;
use crate::pipeline::messages::{AudioChunk, SpeechSegment};
use crate::services::VadService;

/// End-of-segment decision.
#[derive(Debug)]
pub enum Endpoint {
    /// The segment met the minimum-speech gate and is ready for STT.
    Utterance(SpeechSegment),
    /// The segment was too short and has been discarded.
    Noise,
}

/// Outcome of feeding one frame to a segmenter.
#[derive(Debug)]
pub struct SegmenterUpdate {
    /// Per-frame verdict for this frame.
    pub is_speech: bool,
    /// This frame opened a new segment.
    pub speech_started: bool,
    /// This frame closed the open segment.
    pub endpoint: Option<Endpoint>,
}

impl SegmenterUpdate {
    fn quiet(is_speech: bool) -> Self {
        Self {
            is_speech,
            speech_started: false,
            endpoint: None,
        }
    }
}

/// Turns per-frame speech/silence verdicts into utterance boundaries.
///
/// Trailing silence inside an open segment is still appended to the buffer
/// so endpointing does not clip final words; the silence counter alone
/// decides when the segment closes.
#[derive(Debug)]
pub struct EndpointCounters {
    config: EndpointConfig,
    buffer: Vec<f32>,
    in_speech: bool,
    silence_frames: u32,
    speech_frames: u32,
    speech_start: Option<Instant>,
}

impl EndpointCounters {
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            config,
            buffer: Vec::new(),
            in_speech: false,
            silence_frames: 0,
            speech_frames: 0,
            speech_start: None,
        }
    }

    /// Whether a segment is currently open.
    pub fn in_speech(&self) -> bool {
        self.in_speech
    }

    /// Feed one frame with its speech verdict.
    pub fn update(&mut self, is_speech: bool, chunk: &AudioChunk) -> SegmenterUpdate {
        if is_speech {
            let speech_started = !self.in_speech;
            if speech_started {
                self.in_speech = true;
                self.buffer.clear();
                self.speech_frames = 0;
                self.speech_start = Some(chunk.captured_at);
            }
            self.silence_frames = 0;
            self.speech_frames += 1;
            self.buffer.extend_from_slice(&chunk.samples);
            return SegmenterUpdate {
                is_speech: true,
                speech_started,
                endpoint: None,
            };
        }

        if !self.in_speech {
            return SegmenterUpdate::quiet(false);
        }

        self.silence_frames += 1;
        self.buffer.extend_from_slice(&chunk.samples);

        if self.silence_frames < self.config.silence_threshold_frames {
            return SegmenterUpdate::quiet(false);
        }

        // Segment closed. Gate on accumulated speech, not total length, so
        // a long silent tail cannot promote noise to an utterance.
        let speech_frames = self.speech_frames;
        let started_at = self.speech_start.take().unwrap_or_else(Instant::now);
        let samples = std::mem::take(&mut self.buffer);
        self.in_speech = false;
        self.silence_frames = 0;
        self.speech_frames = 0;

        let endpoint = if speech_frames >= self.config.minimum_speech_frames {
            Endpoint::Utterance(SpeechSegment {
                samples,
                sample_rate: chunk.sample_rate,
                started_at,
            })
        } else {
            debug!("discarding {speech_frames}-frame segment as noise");
            Endpoint::Noise
        };
        SegmenterUpdate {
            is_speech: false,
            speech_started: false,
            endpoint: Some(endpoint),
        }
    }

    /// Drop any open segment and return to the idle scanning state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.in_speech = false;
        self.silence_frames = 0;
        self.speech_frames = 0;
        self.speech_start = None;
    }
}

/// Frame-by-frame utterance boundary detection.
#[async_trait]
pub trait Segmenter: Send {
    /// Feed one audio frame; returns what changed.
    async fn push_frame(&mut self, chunk: &AudioChunk) -> Result<SegmenterUpdate>;

    /// Drop any open segment.
    fn reset(&mut self);
}

/// Rule-based segmenter using RMS energy thresholding.
#[derive(Debug)]
pub struct EnergySegmenter {
    threshold: f32,
    counters: EndpointCounters,
}

impl EnergySegmenter {
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            threshold: config.silence_energy_threshold,
            counters: EndpointCounters::new(config),
        }
    }
}

#[async_trait]
impl Segmenter for EnergySegmenter {
    async fn push_frame(&mut self, chunk: &AudioChunk) -> Result<SegmenterUpdate> {
        let is_speech = rms_energy(&chunk.samples) > self.threshold;
        Ok(self.counters.update(is_speech, chunk))
    }

    fn reset(&mut self) {
        self.counters.reset();
    }
}

/// Segmenter backed by an external VAD component.
///
/// The VAD supplies the per-frame verdict; endpointing (silence counting,
/// minimum-speech gating) is shared with [`EnergySegmenter`].
pub struct ModelSegmenter {
    vad: Arc<dyn VadService>,
    counters: EndpointCounters,
}

impl ModelSegmenter {
    pub fn new(vad: Arc<dyn VadService>, config: EndpointConfig) -> Self {
        Self {
            vad,
            counters: EndpointCounters::new(config),
        }
    }
}

#[async_trait]
impl Segmenter for ModelSegmenter {
    async fn push_frame(&mut self, chunk: &AudioChunk) -> Result<SegmenterUpdate> {
        let is_speech = self.vad.detect_speech(&chunk.samples).await?;
        Ok(self.counters.update(is_speech, chunk))
    }

    fn reset(&mut self) {
        self.counters.reset();
    }
}
