//! Spoken instructions.
//!
//! The platform speech engine is an external collaborator behind
//! [`SpeechSynthesizer`]. [`VoiceAnnouncer`] keeps at most one utterance
//! queued: every new announcement cancels whatever is still pending.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Platform text-to-speech.
pub trait SpeechSynthesizer: Send + Sync {
    /// Queue `text` for speaking.
    fn speak(&self, text: &str);

    /// Drop any pending or in-flight utterance. Safe to call when idle.
    fn cancel(&self);
}

/// Speech synthesizer that only logs what it would say.
#[derive(Debug, Default)]
pub struct TracingSpeech;

impl SpeechSynthesizer for TracingSpeech {
    fn speak(&self, text: &str) {
        tracing::info!(text, "Speak");
    }

    fn cancel(&self) {}
}

/// Single-slot announcement queue in front of a [`SpeechSynthesizer`].
pub struct VoiceAnnouncer {
    synth: Arc<dyn SpeechSynthesizer>,
    spoken: AtomicUsize,
}

impl VoiceAnnouncer {
    pub fn new(synth: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            synth,
            spoken: AtomicUsize::new(0),
        }
    }

    /// Replace any pending utterance with `text`.
    pub fn announce(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        self.synth.cancel();
        self.synth.speak(text);
        self.spoken.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(text, "Announcement queued");
    }

    /// Cancel pending speech.
    pub fn silence(&self) {
        self.synth.cancel();
    }

    /// Total announcements made through this announcer.
    pub fn spoken_count(&self) -> usize {
        self.spoken.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for VoiceAnnouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceAnnouncer")
            .field("spoken", &self.spoken_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct QueueSpeech {
        queue: Mutex<Vec<String>>,
        cancels: AtomicUsize,
    }

    impl SpeechSynthesizer for QueueSpeech {
        fn speak(&self, text: &str) {
            self.queue.lock().push(text.to_string());
        }

        fn cancel(&self) {
            self.queue.lock().clear();
            self.cancels.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_new_announcement_replaces_pending() {
        let speech = Arc::new(QueueSpeech::default());
        let voice = VoiceAnnouncer::new(speech.clone());

        voice.announce("Turn left");
        voice.announce("Turn right");

        assert_eq!(*speech.queue.lock(), vec!["Turn right".to_string()]);
        assert_eq!(voice.spoken_count(), 2);
    }

    #[test]
    fn test_silence_clears_queue() {
        let speech = Arc::new(QueueSpeech::default());
        let voice = VoiceAnnouncer::new(speech.clone());

        voice.announce("Head north");
        voice.silence();
        voice.silence();

        assert!(speech.queue.lock().is_empty());
        assert_eq!(speech.cancels.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_blank_text_is_not_spoken() {
        let speech = Arc::new(QueueSpeech::default());
        let voice = VoiceAnnouncer::new(speech.clone());

        voice.announce("   ");
        assert_eq!(voice.spoken_count(), 0);
        assert_eq!(speech.cancels.load(Ordering::Relaxed), 0);
    }
}
