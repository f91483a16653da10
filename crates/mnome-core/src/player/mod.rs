//! Beat generation engine.
//!
//! The [`BeatPlayer`] runs one producer thread that renders a frame per beat
//! and pushes it into an [`AudioSink`]. Setters may be called from any thread
//! at any time:
//!
//! - each setter takes the state lock once, so updates are never torn
//! - the producer copies the state out at every beat boundary, so a change
//!   applies from the next beat and never to a beat already in flight
//! - the lock is never held while rendering, sleeping or emitting

mod pattern;
mod sink;
mod state;
pub mod synth;

pub use pattern::AccentPattern;
pub use sink::{AudioSink, ChannelSink, Frame, NullSink};
pub use state::{BeatState, SharedBeatState};

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::worker::{StopSignal, Worker};
use synth::{beat_interval, interval_samples, render_frame};

/// Highest accepted tempo.
pub const MAX_BPM: u32 = 1000;

/// Longest the producer sleeps before looking at the stop flag again.
const STOP_POLL: Duration = Duration::from_millis(5);

/// Check a tempo against the accepted range.
///
/// Zero has no defined cadence and is rejected rather than clamped.
pub fn validate_bpm(bpm: u32) -> Result<u32> {
    if bpm == 0 || bpm > MAX_BPM {
        return Err(Error::InvalidBpm(bpm));
    }
    Ok(bpm)
}

/// Plays a beat a given number of times per minute.
pub struct BeatPlayer {
    state: SharedBeatState,
    sink: Arc<dyn AudioSink>,
    sample_rate: u32,
    worker: Worker,
}

impl BeatPlayer {
    /// Create a stopped player.
    ///
    /// Fails with [`Error::InvalidBpm`] for a tempo outside `1..=MAX_BPM`.
    pub fn new(beat_rate: u32, sample_rate: u32, sink: Arc<dyn AudioSink>) -> Result<Self> {
        let beat_rate = validate_bpm(beat_rate)?;
        Ok(Self {
            state: SharedBeatState::new(BeatState::new(beat_rate)),
            sink,
            sample_rate: sample_rate.max(1),
            worker: Worker::new("mnome-player"),
        })
    }

    /// Sample rate frames are rendered at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Set the normal click.
    pub fn set_beat(&self, beat: impl Into<Arc<[i16]>>) {
        let beat = beat.into();
        self.state.with_state_mut(|s| s.beat = beat);
    }

    /// Same as [`BeatPlayer::set_beat`].
    pub fn set_data(&self, beat: impl Into<Arc<[i16]>>) {
        self.set_beat(beat);
    }

    /// Set the accented click.
    pub fn set_accentuated_beat(&self, beat: impl Into<Arc<[i16]>>) {
        let beat = beat.into();
        self.state.with_state_mut(|s| s.accentuated_beat = beat);
    }

    /// Set which beats are accented.
    pub fn set_accentuated_pattern(&self, pattern: impl Into<AccentPattern>) {
        let pattern = pattern.into();
        self.state.with_state_mut(|s| s.accent_pattern = pattern);
    }

    /// Change the tempo. An invalid tempo leaves the state untouched.
    pub fn set_bpm(&self, bpm: u32) -> Result<()> {
        let bpm = validate_bpm(bpm)?;
        self.state.with_state_mut(|s| s.beat_rate = bpm);
        Ok(())
    }

    /// Change the normal click and the tempo in one update.
    pub fn set_data_and_bpm(&self, beat: impl Into<Arc<[i16]>>, bpm: u32) -> Result<()> {
        let bpm = validate_bpm(bpm)?;
        let beat = beat.into();
        self.state.with_state_mut(|s| {
            s.beat = beat;
            s.beat_rate = bpm;
        });
        Ok(())
    }

    /// Current tempo.
    pub fn bpm(&self) -> u32 {
        self.state.with_state(|s| s.beat_rate)
    }

    /// Current accent pattern.
    pub fn accent_pattern(&self) -> AccentPattern {
        self.state.with_state(|s| s.accent_pattern.clone())
    }

    /// Copy of the whole beat state.
    pub fn snapshot(&self) -> BeatState {
        self.state.snapshot()
    }

    /// Start playback. A previous run is joined first.
    pub fn start(&self) -> Result<()> {
        log::info!("Playing at {} bpm", self.bpm());
        let state = self.state.clone();
        let sink = self.sink.clone();
        let sample_rate = self.sample_rate;
        self.worker
            .start(move |stop| produce(state, sink, sample_rate, stop))
    }

    /// Request playback to stop. Does not block.
    pub fn stop(&self) {
        self.worker.stop();
    }

    /// Whether the producer thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Block until the producer thread has exited.
    pub fn wait_for_stop(&self) -> Result<()> {
        self.worker.wait_for_stop()
    }

    /// Stop flag of the producer, for teardown from other threads.
    pub fn stop_signal(&self) -> StopSignal {
        self.worker.stop_signal()
    }

    /// Run `change` with playback paused, restarting only if it was playing.
    pub fn reconfigure<F, R>(&self, change: F) -> Result<R>
    where
        F: FnOnce(&Self) -> Result<R>,
    {
        let was_running = self.is_running();
        if was_running {
            self.stop();
            self.wait_for_stop()?;
        }
        let result = change(self);
        if was_running {
            self.start()?;
        }
        result
    }
}

impl std::fmt::Debug for BeatPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeatPlayer")
            .field("state", &self.state)
            .field("sample_rate", &self.sample_rate)
            .field("worker", &self.worker)
            .finish_non_exhaustive()
    }
}

/// Rendered frames for one state revision.
#[derive(Default)]
struct FrameCache {
    revision: Option<u64>,
    normal: Option<Arc<[i16]>>,
    accent: Option<Arc<[i16]>>,
}

impl FrameCache {
    fn frame(&mut self, state: &BeatState, index: u64, sample_rate: u32) -> (bool, Arc<[i16]>) {
        if self.revision != Some(state.revision) {
            self.revision = Some(state.revision);
            self.normal = None;
            self.accent = None;
        }
        let (accented, waveform) = state.waveform_for(index);
        let slot = if accented { &mut self.accent } else { &mut self.normal };
        let samples = slot
            .get_or_insert_with(|| {
                let interval = interval_samples(state.beat_rate, sample_rate);
                Arc::from(render_frame(waveform, interval, sample_rate))
            })
            .clone();
        (accented, samples)
    }
}

/// Producer loop: one frame per beat until a stop is requested.
fn produce(state: SharedBeatState, sink: Arc<dyn AudioSink>, sample_rate: u32, stop: StopSignal) {
    let mut cache = FrameCache::default();
    let mut index = 0u64;
    let mut deadline = Instant::now();

    while !stop.is_requested() {
        let snapshot = state.snapshot();
        let (accented, samples) = cache.frame(&snapshot, index, sample_rate);
        let frame = Frame {
            index,
            accented,
            bpm: snapshot.beat_rate,
            samples,
        };
        if let Err(e) = sink.emit(&frame) {
            log::error!("Stopping playback: {}", e);
            break;
        }
        index += 1;

        let interval = beat_interval(snapshot.beat_rate);
        deadline += interval;
        let now = Instant::now();
        if now > deadline + interval {
            log::warn!("Player fell behind by {:?}, resynchronising", now - deadline);
            deadline = now;
        }
        sleep_until(deadline, &stop);
    }
    log::debug!("Player stopped after {} beats", index);
}

fn sleep_until(deadline: Instant, stop: &StopSignal) {
    loop {
        if stop.is_requested() {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(STOP_POLL));
    }
}
