//! Audio sink boundary.
//!
//! The player pushes one [`Frame`] per beat into an [`AudioSink`]. Getting the
//! samples to a device is the sink's business.

use std::sync::Arc;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};

use crate::error::{Error, Result};

/// One rendered beat.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Beat number since the player was started
    pub index: u64,
    /// Whether the accented waveform was used
    pub accented: bool,
    /// Tempo the frame was rendered for
    pub bpm: u32,
    /// Mono samples, exactly one beat interval long
    pub samples: Arc<[i16]>,
}

/// Receiver of rendered frames.
pub trait AudioSink: Send + Sync {
    /// Called once per beat from the player thread.
    fn emit(&self, frame: &Frame) -> Result<()>;
}

/// Sink that discards frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn emit(&self, frame: &Frame) -> Result<()> {
        log::trace!(
            "Beat {} ({}, {} samples)",
            frame.index,
            if frame.accented { "accent" } else { "normal" },
            frame.samples.len()
        );
        Ok(())
    }
}

/// Sink forwarding frames into a channel.
///
/// A bounded sink never blocks the player: a frame that does not fit is
/// dropped with a warning.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<Frame>,
}

impl ChannelSink {
    /// Sink with an unbounded queue.
    pub fn unbounded() -> (Self, Receiver<Frame>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    /// Sink holding at most `capacity` frames.
    pub fn bounded(capacity: usize) -> (Self, Receiver<Frame>) {
        let (tx, rx) = bounded(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl AudioSink for ChannelSink {
    fn emit(&self, frame: &Frame) -> Result<()> {
        match self.tx.try_send(frame.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(frame)) => {
                log::warn!("Audio queue full, dropping beat {}", frame.index);
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(Error::Sink("frame receiver disconnected".to_string()))
            }
        }
    }
}
