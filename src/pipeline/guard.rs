//! Acoustic feedback mitigation around synthesized speech playback.
//!
//! Without hardware echo cancellation the assistant will hear its own voice
//! through the microphone and answer itself. The guard signals the capture
//! side to pause before playback and holds the pipeline in a cooldown
//! window afterwards so the settle time and residual room echo pass before
//! listening resumes.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::FeedbackGuardConfig;
use crate::error::{Result, VoiceError};
use crate::pipeline::messages::PipelineEvent;

/// Pause/resume signaling and cooldown timing for the playback phase.
///
/// The guard is the only emitter of [`PipelineEvent::PauseRecording`] and
/// [`PipelineEvent::ResumeRecording`]. Every `pause` must be balanced by a
/// `resume` or, on cancellation, by `release` so the capture side is never
/// left paused.
#[derive(Debug)]
pub struct AudioFeedbackGuard {
    config: FeedbackGuardConfig,
    pause_pending: bool,
}

impl AudioFeedbackGuard {
    pub fn new(config: FeedbackGuardConfig) -> Self {
        Self {
            config,
            pause_pending: false,
        }
    }

    /// Whether a pause has been emitted without a matching resume.
    pub fn pause_pending(&self) -> bool {
        self.pause_pending
    }

    /// Signal the capture side to stop recording. Call before playback
    /// starts. Idempotent while a pause is already outstanding.
    pub async fn pause(&mut self, events: &mpsc::Sender<PipelineEvent>) -> Result<()> {
        if self.pause_pending {
            return Ok(());
        }
        send_event(events, PipelineEvent::PauseRecording).await?;
        self.pause_pending = true;
        Ok(())
    }

    /// Wait out the post-playback settle and echo-margin window.
    pub async fn cooldown(&self) {
        let window = Duration::from_millis(self.config.settle_ms + self.config.echo_margin_ms);
        debug!("cooldown for {window:?} after playback");
        tokio::time::sleep(window).await;
    }

    /// Signal the capture side to resume recording after the cooldown.
    pub async fn resume(&mut self, events: &mpsc::Sender<PipelineEvent>) -> Result<()> {
        if !self.pause_pending {
            return Ok(());
        }
        send_event(events, PipelineEvent::ResumeRecording).await?;
        self.pause_pending = false;
        Ok(())
    }

    /// Release an outstanding pause during shutdown or cancellation.
    ///
    /// Unlike `resume`, a failed send is only logged: the stream may
    /// already be closing, and there is nothing further to unwind.
    pub async fn release(&mut self, events: &mpsc::Sender<PipelineEvent>) {
        if !self.pause_pending {
            return;
        }
        self.pause_pending = false;
        if events.send(PipelineEvent::ResumeRecording).await.is_err() {
            warn!("event stream closed before pending resume could be delivered");
        }
    }
}

async fn send_event(events: &mpsc::Sender<PipelineEvent>, event: PipelineEvent) -> Result<()> {
    events
        .send(event)
        .await
        .map_err(|e| VoiceError::Channel(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pause_then_resume_emits_balanced_signals() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut guard = AudioFeedbackGuard::new(FeedbackGuardConfig::default());

        guard.pause(&tx).await.unwrap();
        assert!(guard.pause_pending());
        guard.resume(&tx).await.unwrap();
        assert!(!guard.pause_pending());

        assert_eq!(rx.recv().await, Some(PipelineEvent::PauseRecording));
        assert_eq!(rx.recv().await, Some(PipelineEvent::ResumeRecording));
    }

    #[tokio::test]
    async fn double_pause_emits_once() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut guard = AudioFeedbackGuard::new(FeedbackGuardConfig::default());

        guard.pause(&tx).await.unwrap();
        guard.pause(&tx).await.unwrap();
        guard.resume(&tx).await.unwrap();
        drop(tx);

        assert_eq!(rx.recv().await, Some(PipelineEvent::PauseRecording));
        assert_eq!(rx.recv().await, Some(PipelineEvent::ResumeRecording));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn resume_without_pause_is_silent() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut guard = AudioFeedbackGuard::new(FeedbackGuardConfig::default());
        guard.resume(&tx).await.unwrap();
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn release_emits_resume_for_outstanding_pause() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut guard = AudioFeedbackGuard::new(FeedbackGuardConfig::default());

        guard.pause(&tx).await.unwrap();
        guard.release(&tx).await;
        assert!(!guard.pause_pending());

        assert_eq!(rx.recv().await, Some(PipelineEvent::PauseRecording));
        assert_eq!(rx.recv().await, Some(PipelineEvent::ResumeRecording));
    }

    #[tokio::test]
    async fn release_survives_closed_stream() {
        let (tx, rx) = mpsc::channel(8);
        let mut guard = AudioFeedbackGuard::new(FeedbackGuardConfig::default());
        guard.pause(&tx).await.unwrap();
        drop(rx);
        guard.release(&tx).await;
        assert!(!guard.pause_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_spans_settle_plus_echo_margin() {
        let guard = AudioFeedbackGuard::new(FeedbackGuardConfig {
            settle_ms: 300,
            echo_margin_ms: 200,
        });
        let start = tokio::time::Instant::now();
        guard.cooldown().await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
