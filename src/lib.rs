//! Voiceloop: turn-taking orchestrator for on-device voice conversations.
//!
//! The crate coordinates four pluggable capabilities into one conversation
//! loop: Audio in → Segmenter → STT → LLM → TTS → Audio out
//!
//! # Architecture
//!
//! The caller feeds ~100 ms [`pipeline::AudioChunk`]s into a bounded channel
//! and receives typed [`pipeline::PipelineEvent`]s back. One task owns the
//! loop:
//! - **Segmentation**: utterance boundaries via energy thresholding, or an
//!   external VAD component when one is configured
//! - **Recognition / generation / synthesis**: supplied by the embedder as
//!   [`services`] trait objects; absent components skip their stage
//! - **Feedback guard**: pause/resume signaling and a post-playback
//!   cooldown so the assistant does not hear its own voice
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use tokio_stream::wrappers::ReceiverStream;
//! use voiceloop::pipeline::{EVENT_CHANNEL_SIZE, TurnOrchestrator};
//! use voiceloop::{ComponentSet, VoiceConfig};
//!
//! # async fn example(stt: Arc<dyn voiceloop::SttService>) -> voiceloop::Result<()> {
//! let components = ComponentSet::new().with_stt(stt);
//! let orchestrator = TurnOrchestrator::new(VoiceConfig::default(), components);
//!
//! let (audio_tx, audio_rx) = mpsc::channel(64);
//! let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
//! let events = ReceiverStream::new(event_rx);
//! # let _ = (audio_tx, events);
//! orchestrator.run(audio_rx, event_tx).await
//! # }
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod segmenter;
pub mod services;

pub use config::VoiceConfig;
pub use error::{Result, VoiceError};
pub use pipeline::{AudioChunk, PipelineEvent, PipelineState, TurnOrchestrator};
pub use services::{
    AudioPlayer, ComponentSet, DiarizationService, LlmService, SttService, TtsService, VadService,
};
