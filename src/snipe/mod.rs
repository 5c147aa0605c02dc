//! Username sniping module - enumerate and check every name of a given shape
//!
//! Candidates come from a deterministic generator, are drawn in batches by one
//! lane per proxy, and are resolved through the bulk lookup service.

mod control;
mod generator;
mod output;
mod scanner;
mod session;

pub use control::{ControlEvent, PhaseWatcher, ScanControl};
pub use generator::{GeneratorCursor, NameGenerator, NameStream, Step};
pub use output::ResultLog;
pub use scanner::{ScanController, ScanEvent};
pub use session::{format_eta, ScanProgress, ScanSession};

use std::collections::HashSet;

use crate::error::{Result, SniperError};
use crate::types::CharacterClass;

/// Ordered character set a scan enumerates over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: Vec<char>,
}

impl Alphabet {
    /// Alphabet from an explicit ordered character list of distinct characters
    pub fn new(chars: Vec<char>) -> Result<Self> {
        if chars.is_empty() {
            return Err(SniperError::config(
                "Alphabet is empty: select at least one character class",
            ));
        }

        let mut seen = HashSet::with_capacity(chars.len());
        if let Some(repeated) = chars.iter().find(|c| !seen.insert(**c)) {
            return Err(SniperError::config(format!(
                "Alphabet repeats the character {:?}",
                repeated
            )));
        }

        Ok(Self { chars })
    }

    /// Letters, then digits, then underscore, for whichever classes are given
    pub fn from_classes(classes: &[CharacterClass]) -> Result<Self> {
        let chars = CharacterClass::ALL
            .iter()
            .filter(|class| classes.contains(class))
            .flat_map(|class| class.chars().iter().copied())
            .collect();
        Self::new(chars)
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// `|alphabet|^length`, saturating at `u128::MAX`
    pub fn total_combinations(&self, length: usize) -> u128 {
        let exponent = u32::try_from(length).unwrap_or(u32::MAX);
        (self.chars.len() as u128).saturating_pow(exponent)
    }
}
