// Purpose: voice lifecycle - creation, envelopes, release, cleanup
// This layer sits above the audio backend and never renders samples itself

pub mod envelope;
pub mod factory;
pub mod manager;
pub mod message;
pub mod voice;

pub use envelope::{CleanupTask, EnvelopeScheduler, DEFAULT_CLEANUP_MARGIN};
pub use factory::{OscillatorBank, VoiceFactory};
pub use manager::{NoteSink, VoiceManager};
pub use message::{MessageReceiver, SynthMessage};
pub use voice::{EnvelopePhase, SoundSource, Voice, VoiceId};
