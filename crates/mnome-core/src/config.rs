//! Configuration file support for mnome
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/mnome/config.toml`
//! - macOS: `~/Library/Application Support/mnome/config.toml`
//! - Windows: `%APPDATA%\mnome\config.toml`

use crate::error::{Error, Result};
use crate::player::synth::{generate_sine, DEFAULT_SAMPLE_RATE};
use crate::player::{validate_bpm, AccentPattern};
use crate::repl::DEFAULT_PROMPT;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tempo and accents
    pub player: PlayerSettings,
    /// Normal click
    pub beat: ToneSettings,
    /// Accented click. Keys missing from the section take the accent defaults.
    #[serde(default = "ToneSettings::accent", deserialize_with = "accent_tone")]
    pub accent: ToneSettings,
    /// Command loop
    pub repl: ReplSettings,
    /// Audio output
    pub audio: AudioSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player: PlayerSettings::default(),
            beat: ToneSettings::default(),
            accent: ToneSettings::accent(),
            repl: ReplSettings::default(),
            audio: AudioSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Err(Error::Config(format!("Config file not found at {:?}", path)))
        }
    }

    /// Load configuration from `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration or return default if not found
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(Error::Config(msg)) => {
                log::debug!("{}", msg);
                Self::default()
            }
            Err(e) => {
                log::warn!("Ignoring config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the default config file location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "mnome") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Err(Error::Config("Could not determine config directory".to_string()))
        }
    }

    /// Create a default config file with comments
    pub fn create_default_config_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        Self::write_default_config_file(&path)?;
        Ok(path)
    }

    /// Write the commented default config to `path`
    pub fn write_default_config_file(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = r#"# mnome configuration file

[player]
# Beats per minute (1-1000)
bpm = 80

# Accent pattern: '*' is an accented beat, '+' a normal one
pattern = "*+++"

# Sample rate used when no audio device dictates one
sample_rate = 48000

[beat]
# Normal click: sine frequency in Hz and length in milliseconds
frequency = 500.0
length_ms = 50

[accent]
# Accented click
frequency = 750.0
length_ms = 50

[repl]
prompt = "[mnome]: "

[audio]
# Set to false to run without a sound device
enabled = true

# Output device name (optional, defaults to the system default)
# device = "pulse"

# Beats queued for the device before new ones are dropped
queue_frames = 4
"#;

        fs::write(path, content)?;
        Ok(())
    }

    /// Check values the type system cannot
    pub fn validate(&self) -> Result<()> {
        validate_bpm(self.player.bpm)?;
        self.accent_pattern()?;
        if self.player.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be positive".to_string()));
        }
        Ok(())
    }

    /// Parsed `[player] pattern`
    pub fn accent_pattern(&self) -> Result<AccentPattern> {
        self.player.pattern.parse()
    }
}

/// Player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Beats per minute
    pub bpm: u32,
    /// Accent pattern text
    pub pattern: String,
    /// Fallback sample rate in Hz
    pub sample_rate: u32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            bpm: 80,
            pattern: "*+++".to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

/// A generated click
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneSettings {
    /// Sine frequency in Hz
    pub frequency: f64,
    /// Tone length in milliseconds
    pub length_ms: u64,
}

impl ToneSettings {
    /// Render the tone at `sample_rate`
    pub fn generate(&self, sample_rate: u32) -> Vec<i16> {
        generate_sine(self.frequency, self.length_ms as f64 / 1000.0, sample_rate)
    }

    fn accent() -> Self {
        Self {
            frequency: 750.0,
            ..Self::default()
        }
    }
}

impl Default for ToneSettings {
    fn default() -> Self {
        Self {
            frequency: 500.0,
            length_ms: 50,
        }
    }
}

/// `[accent]` as written, before the accent defaults are filled in
#[derive(Deserialize)]
struct PartialTone {
    frequency: Option<f64>,
    length_ms: Option<u64>,
}

fn accent_tone<'de, D>(deserializer: D) -> std::result::Result<ToneSettings, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let partial = PartialTone::deserialize(deserializer)?;
    let defaults = ToneSettings::accent();
    Ok(ToneSettings {
        frequency: partial.frequency.unwrap_or(defaults.frequency),
        length_ms: partial.length_ms.unwrap_or(defaults.length_ms),
    })
}

/// Command loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplSettings {
    /// Prompt printed before each line
    pub prompt: String,
}

impl Default for ReplSettings {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

/// Audio output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Play through a sound device
    pub enabled: bool,
    /// Output device name
    pub device: Option<String>,
    /// Beats queued for the device
    pub queue_frames: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            device: None,
            queue_frames: 4,
        }
    }
}
