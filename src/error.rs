//! Error types for the voiceloop pipeline.

/// Top-level error type for the turn-taking orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// A required component was used before `initialize` succeeded.
    #[error("component not initialized: {0}")]
    ComponentNotInitialized(String),

    /// Voice activity detection error.
    #[error("VAD error: {0}")]
    Vad(String),

    /// Speech-to-text transcription error.
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Language model generation error.
    #[error("generation error: {0}")]
    Generation(String),

    /// Text-to-speech synthesis error.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Audio playback error.
    #[error("playback error: {0}")]
    Playback(String),

    /// Speaker diarization error.
    #[error("diarization error: {0}")]
    Diarization(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, VoiceError>;
