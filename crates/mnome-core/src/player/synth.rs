//! Click synthesis and frame rendering.

use std::f64::consts::PI;
use std::time::Duration;

/// Default playback rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Fades never last longer than a share of this (10 ms).
const FADE_MIN_TIME: f64 = 0.01;

/// Share of the fade window used for each ramp.
const FADE_MIN_PERCENTAGE: f64 = 0.30;

/// Peak level of generated tones relative to full scale.
const TONE_LEVEL: f64 = 0.75;

/// Time between two beats.
pub fn beat_interval(bpm: u32) -> Duration {
    Duration::from_secs_f64(60.0 / f64::from(bpm.max(1)))
}

/// Number of samples in one beat interval, at least one.
pub fn interval_samples(bpm: u32, sample_rate: u32) -> usize {
    let samples = (60.0 / f64::from(bpm.max(1)) * f64::from(sample_rate)).round() as usize;
    samples.max(1)
}

/// Playback time of `samples` samples.
pub fn duration_of(samples: usize, sample_rate: u32) -> Duration {
    Duration::from_secs_f64(samples as f64 / f64::from(sample_rate.max(1)))
}

/// Sine tone of `frequency` Hz lasting `length` seconds.
pub fn generate_sine(frequency: f64, length: f64, sample_rate: u32) -> Vec<i16> {
    let rate = f64::from(sample_rate);
    let samples = (rate * length.max(0.0)).floor() as usize;
    (0..samples)
        .map(|i| {
            let sample = (i as f64 * 2.0 * PI * frequency / rate).sin();
            (f64::from(i16::MAX) * TONE_LEVEL * sample) as i16
        })
        .collect()
}

/// Ramp length for a waveform of `len` samples.
///
/// 30% of 10 ms, or 30% of the waveform itself when it is shorter than that.
pub fn ramp_steps(len: usize, sample_rate: u32) -> usize {
    let rate = f64::from(sample_rate);
    let length = len as f64 / rate;
    let window = if length < FADE_MIN_TIME { length } else { FADE_MIN_TIME };
    (rate * window * FADE_MIN_PERCENTAGE).floor() as usize
}

/// Exponential fade in over the first `fade_in` and out over the last
/// `fade_out` samples.
///
/// Exponential ramps sound smoother than linear ones. The gain starts slightly
/// above zero and is multiplied by a constant ratio each step until it
/// reaches one: `r = (1 / g0) ^ (1 / steps)`.
pub fn fade_in_out(data: &mut [i16], fade_in: usize, fade_out: usize) {
    let start = 2.0 / f64::from(i16::MAX);
    let fade_in = fade_in.min(data.len());
    let fade_out = fade_out.min(data.len());

    if fade_in > 0 {
        let ratio = (1.0 / start).powf(1.0 / fade_in as f64);
        let mut gain = start;
        for sample in &mut data[..fade_in] {
            *sample = scale(*sample, gain);
            gain *= ratio;
        }
    }

    if fade_out > 0 {
        let ratio = 1.0 / (1.0 / start).powf(1.0 / fade_out as f64);
        let mut gain = ratio;
        let from = data.len() - fade_out;
        for sample in &mut data[from..] {
            *sample = scale(*sample, gain);
            gain *= ratio;
        }
    }
}

fn scale(sample: i16, gain: f64) -> i16 {
    (f64::from(sample) * gain).round() as i16
}

/// One playable beat: `waveform` cut to the interval, faded, then padded
/// with silence to exactly `interval` samples.
pub fn render_frame(waveform: &[i16], interval: usize, sample_rate: u32) -> Vec<i16> {
    let mut frame = waveform[..waveform.len().min(interval)].to_vec();
    let steps = ramp_steps(frame.len(), sample_rate);
    fade_in_out(&mut frame, steps, steps);
    frame.resize(interval, 0);
    frame
}
