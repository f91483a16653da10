//! Shared beat state.
//!
//! [`SharedBeatState`] wraps the [`BeatState`] in one `Arc<Mutex>`. Waveforms
//! and pattern live behind `Arc`s, so a reader copies the whole state out
//! with a handful of reference-count bumps and releases the lock right away.

use std::sync::{Arc, Mutex, PoisonError};

use super::pattern::AccentPattern;

/// Tempo, waveforms and accent pattern read by the player once per beat.
#[derive(Clone, Debug)]
pub struct BeatState {
    /// Beats per minute, always within `1..=MAX_BPM`
    pub beat_rate: u32,
    /// Normal click samples
    pub beat: Arc<[i16]>,
    /// Accented click samples
    pub accentuated_beat: Arc<[i16]>,
    /// Which beats get the accent
    pub accent_pattern: AccentPattern,
    /// Bumped on every mutation
    pub revision: u64,
}

impl BeatState {
    /// State with silent waveforms and no accents.
    pub fn new(beat_rate: u32) -> Self {
        Self {
            beat_rate,
            beat: Arc::from(Vec::new()),
            accentuated_beat: Arc::from(Vec::new()),
            accent_pattern: AccentPattern::default(),
            revision: 0,
        }
    }

    /// Waveform for beat number `index`.
    pub fn waveform_for(&self, index: u64) -> (bool, &Arc<[i16]>) {
        if self.accent_pattern.is_accented(index) {
            (true, &self.accentuated_beat)
        } else {
            (false, &self.beat)
        }
    }
}

/// Thread-safe handle to the beat state.
#[derive(Clone, Debug)]
pub struct SharedBeatState {
    state: Arc<Mutex<BeatState>>,
}

impl SharedBeatState {
    /// Wrap an initial state.
    pub fn new(state: BeatState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Read the state with a closure, holding the lock only for its duration.
    pub fn with_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&BeatState) -> R,
    {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Mutate the state with a closure and bump the revision.
    pub fn with_state_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut BeatState) -> R,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut state);
        state.revision += 1;
        result
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> BeatState {
        self.with_state(BeatState::clone)
    }
}
