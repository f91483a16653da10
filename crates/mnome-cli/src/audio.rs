//! Sound card output.
//!
//! Frames produced by the player arrive through a channel and are played back
//! one after another by a cpal output stream. When no frame is queued the
//! stream plays silence.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Receiver;
use mnome_core::Frame;

/// An open output stream. Playback stops when this is dropped.
pub struct AudioOutput {
    device_name: String,
    sample_rate: u32,
    _stream: cpal::Stream,
}

impl AudioOutput {
    /// Name of the device being played on.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Rate the device runs at; frames must be rendered at this rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Open `device` (or the default output) and start playing `frames`.
pub fn open_output(device: Option<&str>, frames: Receiver<Frame>) -> Result<AudioOutput> {
    let host = cpal::default_host();
    let device = match device {
        Some(name) => host
            .output_devices()
            .context("Failed to enumerate output devices")?
            .find(|d| d.name().is_ok_and(|n| n == name))
            .with_context(|| format!("No output device named {name:?}"))?,
        None => host
            .default_output_device()
            .context("No output device available")?,
    };
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let config = device
        .default_output_config()
        .context("Failed to get default output config")?;
    let sample_rate = config.sample_rate().0;
    let channels = usize::from(config.channels());
    log::debug!(
        "Output config for {}: {} Hz, {} channels, {:?}",
        device_name,
        sample_rate,
        channels,
        config.sample_format()
    );

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), frames, channels),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), frames, channels),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), frames, channels),
        other => bail!("Unsupported sample format {other:?}"),
    }
    .context("Failed to build output stream")?;
    stream.play().context("Failed to start output stream")?;

    Ok(AudioOutput {
        device_name,
        sample_rate,
        _stream: stream,
    })
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    frames: Receiver<Frame>,
    channels: usize,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut playback = Playback::new(frames);
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channels.max(1)) {
                let sample = T::from_sample(playback.next_sample());
                // Mono to all channels
                for channel_sample in frame.iter_mut() {
                    *channel_sample = sample;
                }
            }
        },
        |err| log::error!("Audio stream error: {}", err),
        None,
    )
}

/// Walks through queued frames sample by sample.
struct Playback {
    frames: Receiver<Frame>,
    current: Option<Arc<[i16]>>,
    position: usize,
}

impl Playback {
    fn new(frames: Receiver<Frame>) -> Self {
        Self {
            frames,
            current: None,
            position: 0,
        }
    }

    fn next_sample(&mut self) -> f32 {
        loop {
            if let Some(samples) = &self.current {
                if let Some(&sample) = samples.get(self.position) {
                    self.position += 1;
                    return f32::from(sample) / f32::from(i16::MAX);
                }
            }
            match self.frames.try_recv() {
                Ok(frame) => {
                    self.current = Some(frame.samples);
                    self.position = 0;
                }
                Err(_) => {
                    self.current = None;
                    return 0.0;
                }
            }
        }
    }
}

/// Output device names, the default one marked.
pub fn list_output_devices() -> Result<Vec<(String, bool)>> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());
    let mut devices: Vec<(String, bool)> = host
        .output_devices()
        .context("Failed to enumerate output devices")?
        .filter_map(|d| d.name().ok())
        .map(|name| {
            let is_default = default_name.as_ref().is_some_and(|d| d == &name);
            (name, is_default)
        })
        .collect();
    // Default first, then by name
    devices.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(devices)
}
