//! The turn-taking pipeline: state machine, transcript filter, feedback
//! guard, and the orchestrator that drives them.

pub mod filter;
pub mod guard;
pub mod messages;
pub mod orchestrator;
pub mod state;

pub use filter::TranscriptFilter;
pub use guard::AudioFeedbackGuard;
pub use messages::{AudioChunk, PipelineEvent, SpeakerAttribution, SpeechSegment, Turn};
pub use orchestrator::{EVENT_CHANNEL_SIZE, TurnOrchestrator};
pub use state::{PipelineState, PipelineStateMachine};
