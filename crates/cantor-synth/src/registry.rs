//! Voice bookkeeping keyed by note.
//!
//! At most one voice is *registered* per key. A voice that is released stays
//! registered until its teardown time, so a quick re-trigger of the same key
//! finds it; the old voice is then detached (left to finish its release
//! unkeyed) and the new one takes the key. Every voice is reaped by its own
//! teardown time, so a stale schedule can never remove a newer voice that
//! reuses the key.

use std::collections::BTreeMap;

use crate::envelope::STEAL_RELEASE;
use crate::voice::Voice;

/// What [`VoiceRegistry::play`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The key already had a held voice; nothing changed.
    AlreadyHeld,
    /// A new voice was registered.
    Started {
        /// Generation of the new voice.
        generation: u64,
        /// A releasing voice for the same key was detached.
        retriggered: bool,
        /// Key of a held voice released to stay within polyphony.
        stolen: Option<String>,
    },
}

/// Owns every sounding voice.
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    voices: BTreeMap<String, Voice>,
    detached: Vec<Voice>,
    next_generation: u64,
    polyphony: Option<usize>,
}

impl VoiceRegistry {
    /// Registry without a polyphony limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that releases the oldest held voice beyond `limit` held notes.
    ///
    /// `None` disables the limit. A limit of zero is treated as one.
    pub fn with_polyphony(limit: Option<usize>) -> Self {
        Self {
            polyphony: limit.map(|l| l.max(1)),
            ..Self::default()
        }
    }

    /// The polyphony limit, if any.
    pub fn polyphony(&self) -> Option<usize> {
        self.polyphony
    }

    /// Change the polyphony limit. Takes effect on the next [`play`](Self::play).
    pub fn set_polyphony(&mut self, limit: Option<usize>) {
        self.polyphony = limit.map(|l| l.max(1));
    }

    /// Start a voice for `key` unless one is already held.
    ///
    /// `build` receives the generation to stamp on the new voice and is only
    /// called when a voice will actually be registered.
    pub fn play<F>(&mut self, key: &str, now: f64, build: F) -> PlayOutcome
    where
        F: FnOnce(u64) -> Voice,
    {
        let retriggered = match self.voices.get(key) {
            Some(voice) if !voice.is_released() => return PlayOutcome::AlreadyHeld,
            Some(_) => true,
            None => false,
        };

        if retriggered && let Some(old) = self.voices.remove(key) {
            tracing::debug!(key, generation = old.generation(), "detaching releasing voice");
            self.detached.push(old);
        }

        let stolen = self.steal_if_full(now);

        self.next_generation += 1;
        let generation = self.next_generation;
        let voice = build(generation);
        self.voices.insert(key.to_owned(), voice);

        PlayOutcome::Started {
            generation,
            retriggered,
            stolen,
        }
    }

    fn steal_if_full(&mut self, now: f64) -> Option<String> {
        let limit = self.polyphony?;
        if self.held_count() < limit {
            return None;
        }
        let (key, voice) = self
            .voices
            .iter_mut()
            .filter(|(_, v)| !v.is_released())
            .min_by_key(|(_, v)| v.generation())?;
        voice.release_over(now, STEAL_RELEASE);
        tracing::debug!(key = %key, "stealing oldest voice");
        Some(key.clone())
    }

    /// Release the held voice for `key`.
    ///
    /// Returns the teardown time, or `None` if the key was not held.
    pub fn stop(&mut self, key: &str, now: f64) -> Option<f64> {
        let voice = self.voices.get_mut(key)?;
        if voice.is_released() {
            return None;
        }
        Some(voice.release(now))
    }

    /// Release every held voice. Returns how many were released.
    pub fn stop_all(&mut self, now: f64) -> usize {
        let mut released = 0;
        for voice in self.voices.values_mut().filter(|v| !v.is_released()) {
            voice.release(now);
            released += 1;
        }
        released
    }

    /// Tear down every voice whose teardown time has passed.
    ///
    /// Returns how many voices were destroyed.
    pub fn reap(&mut self, now: f64) -> usize {
        let mut reaped = 0;
        let mut destroy = |voice: &mut Voice| {
            let due = voice.teardown_at().is_some_and(|t| t <= now);
            if due {
                let report = voice.teardown();
                tracing::trace!(
                    key = voice.key(),
                    generation = voice.generation(),
                    stopped = report.stopped,
                    "voice destroyed"
                );
                reaped += 1;
            } else {
                voice.prune(now);
            }
            !due
        };
        self.voices.retain(|_, v| destroy(v));
        self.detached.retain_mut(|v| destroy(v));
        reaped
    }

    /// Tear down every voice immediately.
    pub fn clear(&mut self) {
        for voice in self.voices.values_mut().chain(self.detached.iter_mut()) {
            voice.teardown();
        }
        self.voices.clear();
        self.detached.clear();
    }

    /// Voices still sounding, registered or detached.
    pub fn active_count(&self) -> usize {
        self.voices.len() + self.detached.len()
    }

    /// Registered voices that have not been released.
    pub fn held_count(&self) -> usize {
        self.voices.values().filter(|v| !v.is_released()).count()
    }

    /// The registered voice for `key`.
    pub fn get(&self, key: &str) -> Option<&Voice> {
        self.voices.get(key)
    }

    /// Whether `key` has a registered voice.
    pub fn contains(&self, key: &str) -> bool {
        self.voices.contains_key(key)
    }

    /// Registered voices in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Voice)> {
        self.voices.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Detached voices finishing their release.
    pub fn detached(&self) -> &[Voice] {
        &self.detached
    }

    /// Render every voice for one quantum starting at `start`.
    pub fn render(&mut self, start: f64, sample_period: f64, dry: &mut [f32], wet: &mut [f32]) {
        for voice in self.voices.values_mut().chain(self.detached.iter_mut()) {
            voice.render(start, sample_period, dry, wet);
        }
    }
}
