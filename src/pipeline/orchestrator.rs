//! Sequential turn driver for the voice conversation loop.
//!
//! One task owns the whole conversation: it pulls audio chunks, feeds the
//! segmenter, and runs each finalized utterance through STT, the transcript
//! filter, streaming generation, and synthesis in order. There is no
//! parallelism between turns; audio that arrives while a turn is in flight
//! is dropped, and anything still queued when the turn ends is drained
//! before listening resumes.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::audio::{AudioLevelMeter, samples_to_pcm16};
use crate::config::VoiceConfig;
use crate::error::{Result, VoiceError};
use crate::pipeline::filter::TranscriptFilter;
use crate::pipeline::guard::AudioFeedbackGuard;
use crate::pipeline::messages::{
    AudioChunk, PipelineEvent, SpeakerAttribution, SpeechSegment, Turn,
};
use crate::pipeline::state::{PipelineState, PipelineStateMachine};
use crate::segmenter::{Endpoint, EnergySegmenter, ModelSegmenter, Segmenter};
use crate::services::{
    ComponentSet, GenerateOptions, LlmService, SynthesisOptions, TranscribeOptions,
};

/// Bound for the caller-facing event channel.
pub const EVENT_CHANNEL_SIZE: usize = 256;
/// Bound for the internal LLM token channel.
const TOKEN_CHANNEL_SIZE: usize = 64;

/// Drives the turn-taking conversation loop over a chunked audio input.
pub struct TurnOrchestrator {
    config: VoiceConfig,
    components: ComponentSet,
    state: Arc<PipelineStateMachine>,
    filter: TranscriptFilter,
    cancel: CancellationToken,
    transcribe_options: TranscribeOptions,
    synthesis_options: SynthesisOptions,
    known_speakers: HashSet<String>,
    last_speaker: Option<String>,
}

impl TurnOrchestrator {
    pub fn new(config: VoiceConfig, components: ComponentSet) -> Self {
        Self {
            config,
            components,
            state: Arc::new(PipelineStateMachine::new()),
            filter: TranscriptFilter::new(),
            cancel: CancellationToken::new(),
            transcribe_options: TranscribeOptions::default(),
            synthesis_options: SynthesisOptions::default(),
            known_speakers: HashSet::new(),
            last_speaker: None,
        }
    }

    /// Replace the default transcript filter.
    pub fn with_transcript_filter(mut self, filter: TranscriptFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set options forwarded to every transcription request.
    pub fn with_transcribe_options(mut self, options: TranscribeOptions) -> Self {
        self.transcribe_options = options;
        self
    }

    /// Set options forwarded to every synthesis request.
    pub fn with_synthesis_options(mut self, options: SynthesisOptions) -> Self {
        self.synthesis_options = options;
        self
    }

    /// Token that stops the pipeline when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Shared handle for observing the session state.
    pub fn state_machine(&self) -> Arc<PipelineStateMachine> {
        Arc::clone(&self.state)
    }

    /// Run the conversation loop until the input closes or the token fires.
    ///
    /// Initialization failures terminate the loop with an error; everything
    /// that fails after `AllComponentsInitialized` degrades back to
    /// listening instead.
    ///
    /// # Errors
    ///
    /// Returns an error if a component's `initialize` fails or the event
    /// channel closes while the pipeline is running.
    pub async fn run(
        mut self,
        mut audio_rx: mpsc::Receiver<AudioChunk>,
        events: mpsc::Sender<PipelineEvent>,
    ) -> Result<()> {
        self.initialize_components(&events).await?;

        let mut guard = AudioFeedbackGuard::new(self.config.guard.clone());
        let result = self.run_loop(&mut audio_rx, &events, &mut guard).await;

        self.state.transition(PipelineState::Idle);
        guard.release(&events).await;
        info!("voice pipeline stopped");
        result
    }

    async fn run_loop(
        &mut self,
        audio_rx: &mut mpsc::Receiver<AudioChunk>,
        events: &mpsc::Sender<PipelineEvent>,
        guard: &mut AudioFeedbackGuard,
    ) -> Result<()> {
        // ModelSegmenter when a VAD component is wired in, energy fallback
        // otherwise. Both share the same endpointing counters.
        let mut segmenter: Box<dyn Segmenter> = match &self.components.vad {
            Some(vad) => Box::new(ModelSegmenter::new(
                Arc::clone(vad),
                self.config.endpoint.clone(),
            )),
            None => Box::new(EnergySegmenter::new(self.config.endpoint.clone())),
        };

        let meter = AudioLevelMeter::new();
        let cancel = self.cancel.clone();
        self.state.transition(PipelineState::Listening);

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("pipeline cancelled");
                    break;
                }
                chunk = audio_rx.recv() => match chunk {
                    Some(chunk) => chunk,
                    None => {
                        info!("audio input closed");
                        break;
                    }
                },
            };

            self.emit(events, PipelineEvent::AudioLevel(meter.level(&chunk.samples)))
                .await?;

            // Outside Listening the chunk is echo or barge-over we must not
            // segment; drop it and purge any half-open segment.
            if self.state.state() != PipelineState::Listening {
                segmenter.reset();
                continue;
            }

            let update = match segmenter.push_frame(&chunk).await {
                Ok(update) => update,
                Err(e) => {
                    warn!("segmenter error, skipping frame: {e}");
                    continue;
                }
            };

            if update.speech_started {
                self.emit(events, PipelineEvent::SpeechStart).await?;
            }
            let Some(endpoint) = update.endpoint else {
                continue;
            };
            // Noise-discarded segments close silently; only an accepted
            // utterance announces the end of speech.
            let Endpoint::Utterance(segment) = endpoint else {
                continue;
            };
            self.emit(events, PipelineEvent::SpeechEnd).await?;

            if !self.state.transition(PipelineState::ProcessingSpeech) {
                continue;
            }

            let mut turn_result = Ok(None);
            let cancelled = tokio::select! {
                _ = cancel.cancelled() => true,
                result = self.process_turn(segment, events, guard) => {
                    turn_result = result;
                    false
                }
            };
            if cancelled {
                info!("pipeline cancelled mid-turn");
                break;
            }
            if let Some(turn) = turn_result? {
                debug!(
                    transcript_len = turn.transcript.len(),
                    response_len = turn.response.len(),
                    synthesized = turn.synthesized_audio.is_some(),
                    "turn complete"
                );
            }

            // Chunks that queued up during the turn are stale input
            // (mostly the assistant's own voice); drain them unseen.
            let mut drained = 0usize;
            while audio_rx.try_recv().is_ok() {
                drained += 1;
            }
            if drained > 0 {
                debug!("drained {drained} stale audio chunks after turn");
            }
            segmenter.reset();
        }

        segmenter.reset();
        Ok(())
    }

    /// Run one component's `initialize`, bracketed by lifecycle events.
    async fn init_component(
        &self,
        events: &mpsc::Sender<PipelineEvent>,
        name: &str,
        init: impl Future<Output = Result<()>>,
    ) -> Result<()> {
        self.emit(
            events,
            PipelineEvent::ComponentInitializing { name: name.to_string() },
        )
        .await?;
        init.await.map_err(|e| {
            error!("{name} initialization failed: {e}");
            e
        })?;
        self.emit(
            events,
            PipelineEvent::ComponentInitialized { name: name.to_string() },
        )
        .await
    }

    async fn initialize_components(&self, events: &mpsc::Sender<PipelineEvent>) -> Result<()> {
        if let Some(vad) = &self.components.vad {
            self.init_component(events, "vad", vad.initialize()).await?;
        }
        if let Some(stt) = &self.components.stt {
            self.init_component(events, "stt", stt.initialize()).await?;
        }
        if let Some(llm) = &self.components.llm {
            self.init_component(events, "llm", llm.initialize()).await?;
        }
        if let Some(tts) = &self.components.tts {
            self.init_component(events, "tts", tts.initialize()).await?;
        }
        if let Some(diarization) = &self.components.diarization {
            self.init_component(events, "diarization", diarization.initialize())
                .await?;
        }
        if let Some(player) = &self.components.player {
            self.init_component(events, "player", player.initialize())
                .await?;
        }
        self.emit(events, PipelineEvent::AllComponentsInitialized)
            .await
    }

    /// Execute one full turn for a finalized utterance. Stage failures are
    /// reported as `TurnFailed` and leave the pipeline listening; only a
    /// closed event channel is an error here.
    async fn process_turn(
        &mut self,
        segment: SpeechSegment,
        events: &mpsc::Sender<PipelineEvent>,
        guard: &mut AudioFeedbackGuard,
    ) -> Result<Option<Turn>> {
        let Some(stt) = self.components.stt.clone() else {
            debug!("no STT component configured, discarding utterance");
            self.state.transition(PipelineState::Listening);
            return Ok(None);
        };

        let sample_rate = segment.sample_rate;
        let pcm = samples_to_pcm16(&segment.samples);
        let transcription = match stt
            .transcribe(&pcm, sample_rate, &self.transcribe_options)
            .await
        {
            Ok(transcription) => transcription,
            Err(e) => {
                error!("transcription failed: {e}");
                self.fail_turn(events, format!("transcription failed: {e}"))
                    .await?;
                return Ok(None);
            }
        };

        let text = transcription.text.trim().to_string();
        if self.filter.is_garbage(&text) {
            debug!("discarding garbage transcript: {text:?}");
            self.state.transition(PipelineState::Listening);
            return Ok(None);
        }

        let speaker = self.attribute_speaker(&segment, events).await?;
        self.emit(
            events,
            PipelineEvent::TranscriptFinal {
                text: text.clone(),
                speaker,
            },
        )
        .await?;

        let Some(llm) = self.components.llm.clone() else {
            // Transcription-only deployments end the turn here.
            self.state.transition(PipelineState::Listening);
            return Ok(Some(Turn {
                transcript: text,
                response: String::new(),
                synthesized_audio: None,
            }));
        };

        self.state.transition(PipelineState::GeneratingResponse);
        self.emit(events, PipelineEvent::GenerationStarted).await?;
        let response = match self.generate_response(llm, &text, events).await {
            Ok(response) => response,
            Err(e) => {
                error!("generation failed: {e}");
                self.fail_turn(events, format!("generation failed: {e}"))
                    .await?;
                return Ok(None);
            }
        };
        self.emit(
            events,
            PipelineEvent::GenerationFinal {
                text: response.clone(),
            },
        )
        .await?;

        let synthesized = if response.trim().is_empty() {
            debug!("empty response, skipping synthesis");
            self.state.transition(PipelineState::Listening);
            None
        } else if let Some(tts) = self.components.tts.clone() {
            self.state.transition(PipelineState::PlayingTts);
            guard.pause(events).await?;
            self.emit(events, PipelineEvent::SynthesisStarted).await?;

            let player = self.components.player.clone();
            let options = self.synthesis_options.clone();
            let playback = async {
                let audio = tts.synthesize(&response, &options).await?;
                if let Some(player) = &player {
                    player.play(&audio).await?;
                }
                Ok::<Vec<u8>, VoiceError>(audio)
            };
            let synthesized = match playback.await {
                Ok(audio) => {
                    self.emit(events, PipelineEvent::SynthesisCompleted).await?;
                    Some(audio)
                }
                Err(e) => {
                    error!("synthesis/playback failed: {e}");
                    self.emit(
                        events,
                        PipelineEvent::TurnFailed {
                            reason: format!("synthesis failed: {e}"),
                        },
                    )
                    .await?;
                    None
                }
            };

            // Playback reaches cooldown on success and failure alike; the
            // speaker may have produced partial audio either way.
            self.state.transition(PipelineState::Cooldown);
            guard.cooldown().await;
            self.state.transition(PipelineState::Listening);
            guard.resume(events).await?;
            synthesized
        } else {
            self.state.transition(PipelineState::Listening);
            None
        };

        Ok(Some(Turn {
            transcript: text,
            response,
            synthesized_audio: synthesized,
        }))
    }

    /// Stream a response, coalescing partial-text events so the caller sees
    /// at most one update per configured interval.
    async fn generate_response(
        &self,
        llm: Arc<dyn LlmService>,
        prompt: &str,
        events: &mpsc::Sender<PipelineEvent>,
    ) -> Result<String> {
        let (token_tx, mut token_rx) = mpsc::channel::<String>(TOKEN_CHANNEL_SIZE);
        let options = GenerateOptions {
            max_tokens: self.config.generation.max_tokens,
            temperature: self.config.generation.temperature,
        };
        let prompt = prompt.to_string();
        let task = tokio::spawn(async move { llm.generate(&prompt, &options, token_tx).await });

        let interval = Duration::from_millis(self.config.generation.partial_interval_ms);
        let mut accumulated = String::new();
        let mut last_emit = tokio::time::Instant::now();
        let mut pending = false;
        loop {
            tokio::select! {
                token = token_rx.recv() => match token {
                    Some(token) => {
                        accumulated.push_str(&token);
                        pending = true;
                    }
                    None => break,
                },
                _ = tokio::time::sleep_until(last_emit + interval), if pending => {
                    self.emit(
                        events,
                        PipelineEvent::GenerationPartial { text: accumulated.clone() },
                    )
                    .await?;
                    last_emit = tokio::time::Instant::now();
                    pending = false;
                }
            }
        }

        task.await.map_err(|e| VoiceError::Generation(e.to_string()))?
    }

    /// Best-effort speaker attribution; failures never block the turn.
    async fn attribute_speaker(
        &mut self,
        segment: &SpeechSegment,
        events: &mpsc::Sender<PipelineEvent>,
    ) -> Result<Option<SpeakerAttribution>> {
        if !self.config.diarization.enabled {
            return Ok(None);
        }
        let Some(diarization) = self.components.diarization.clone() else {
            return Ok(None);
        };
        let attribution = match diarization.process_audio(&segment.samples).await {
            Ok(attribution) => attribution,
            Err(e) => {
                debug!("diarization failed, continuing without speaker: {e}");
                return Ok(None);
            }
        };
        let Some(mut attribution) = attribution else {
            return Ok(None);
        };

        attribution.is_new = self.known_speakers.insert(attribution.speaker_id.clone());
        if attribution.is_new {
            self.emit(
                events,
                PipelineEvent::NewSpeakerDetected {
                    speaker_id: attribution.speaker_id.clone(),
                },
            )
            .await?;
        } else if self.last_speaker.as_deref() != Some(attribution.speaker_id.as_str()) {
            self.emit(
                events,
                PipelineEvent::SpeakerChanged {
                    speaker_id: attribution.speaker_id.clone(),
                },
            )
            .await?;
        }
        self.last_speaker = Some(attribution.speaker_id.clone());
        Ok(Some(attribution))
    }

    async fn fail_turn(&self, events: &mpsc::Sender<PipelineEvent>, reason: String) -> Result<()> {
        self.emit(events, PipelineEvent::TurnFailed { reason }).await?;
        self.state.transition(PipelineState::Listening);
        Ok(())
    }

    async fn emit(
        &self,
        events: &mpsc::Sender<PipelineEvent>,
        event: PipelineEvent,
    ) -> Result<()> {
        events
            .send(event)
            .await
            .map_err(|e| VoiceError::Channel(e.to_string()))
    }
}
