//! Audio playback seam for voice replies.

/// Playback seam for synthesized voice responses.
///
/// Playback is fire-and-forget: it happens outside the session data
/// contract and failures are ignored, so implementations return nothing.
pub trait AudioSink: Send + Sync {
    fn play(&self, audio: Vec<u8>);
}

/// Sink that discards audio (headless and test environments).
#[derive(Debug, Default)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn play(&self, _audio: Vec<u8>) {}
}
