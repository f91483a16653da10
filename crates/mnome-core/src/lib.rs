//! mnome-core - Console metronome engine
//!
//! Building blocks of the `mnome` metronome:
//!
//! - **Arguments** - whitespace token cursor and shape-driven parsers
//! - **Commands** - named handlers with typed argument records
//! - **Repl** - line-oriented command loop on a worker thread
//! - **Player** - beat generation thread emitting one frame per beat
//! - **Config** - TOML configuration file
//!
//! # Usage as a Library
//!
//! ```no_run
//! use std::sync::Arc;
//! use mnome_core::{Config, Metronome, NullSink};
//!
//! let config = Config::load_or_default();
//! let app = Metronome::new(&config, Arc::new(NullSink), config.player.sample_rate)?;
//! app.start()?;
//! app.wait_for_stop()?;
//! # Ok::<(), mnome_core::Error>(())
//! ```

pub mod app;
pub mod args;
pub mod commands;
pub mod config;
pub mod error;
pub mod player;
pub mod repl;
pub mod worker;

#[cfg(test)]
mod testing;

// Re-export main types
pub use app::{Metronome, ShutdownHandle};
pub use args::{Arg, Args, Arguments, Shape, Value};
pub use commands::{Command, CommandRegistry};
pub use config::Config;
pub use error::{Error, Result};
pub use player::{AccentPattern, AudioSink, BeatPlayer, ChannelSink, Frame, NullSink, MAX_BPM};
pub use repl::{Console, Repl};
pub use worker::{StopSignal, Worker};
