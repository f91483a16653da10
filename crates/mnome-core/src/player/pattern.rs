//! Accent patterns.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::Error;

/// Cyclic sequence of beats, `true` meaning accented.
///
/// Textual form uses `*` for an accented and `+` for a normal beat, so the
/// common 4/4 pattern is `*+++`. An empty pattern never accents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccentPattern {
    beats: Arc<[bool]>,
}

impl AccentPattern {
    /// Pattern from explicit beats.
    pub fn new(beats: impl Into<Arc<[bool]>>) -> Self {
        Self { beats: beats.into() }
    }

    /// Accent on the first of `beats_per_bar` beats.
    pub fn downbeat(beats_per_bar: usize) -> Self {
        Self::new((0..beats_per_bar).map(|i| i == 0).collect::<Vec<_>>())
    }

    /// Whether beat number `index` (counting from 0 since start) is accented.
    pub fn is_accented(&self, index: u64) -> bool {
        if self.beats.is_empty() {
            return false;
        }
        self.beats[(index % self.beats.len() as u64) as usize]
    }

    /// Number of beats in one cycle.
    pub fn len(&self) -> usize {
        self.beats.len()
    }

    /// True for the "never accent" pattern.
    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }

    /// The beats of one cycle.
    pub fn beats(&self) -> &[bool] {
        &self.beats
    }
}

impl From<Vec<bool>> for AccentPattern {
    fn from(beats: Vec<bool>) -> Self {
        Self::new(beats)
    }
}

impl FromStr for AccentPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::InvalidPattern(s.to_string()));
        }
        s.chars()
            .map(|c| match c {
                '*' => Ok(true),
                '+' => Ok(false),
                _ => Err(Error::InvalidPattern(s.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::from)
    }
}

impl fmt::Display for AccentPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &accent in self.beats.iter() {
            f.write_str(if accent { "*" } else { "+" })?;
        }
        Ok(())
    }
}
