//! Core types and structures for username-sniper

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Result, SniperError};
use crate::proxy::registry;

/// Shortest username the registry accepts
pub const MIN_USERNAME_LENGTH: usize = 1;

/// Longest username the registry accepts
pub const MAX_USERNAME_LENGTH: usize = 16;

/// Character class a scan may draw from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterClass {
    Letters,
    Digits,
    Underscore,
}

impl CharacterClass {
    /// All classes, in alphabet order
    pub const ALL: [CharacterClass; 3] = [
        CharacterClass::Letters,
        CharacterClass::Digits,
        CharacterClass::Underscore,
    ];

    /// Characters contributed by this class, in enumeration order
    pub fn chars(&self) -> &'static [char] {
        match self {
            CharacterClass::Letters => &[
                'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm',
                'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
            ],
            CharacterClass::Digits => &['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'],
            CharacterClass::Underscore => &['_'],
        }
    }
}

impl std::fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CharacterClass::Letters => write!(f, "letters"),
            CharacterClass::Digits => write!(f, "digits"),
            CharacterClass::Underscore => write!(f, "underscore"),
        }
    }
}

/// Configuration for an enumeration scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub length: usize,
    pub letters: bool,
    pub digits: bool,
    pub underscore: bool,
    /// Write claimed names to the result log as well as available ones
    pub include_claimed: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            length: 3,
            letters: true,
            digits: false,
            underscore: false,
            include_claimed: false,
        }
    }
}

impl ScanConfig {
    /// Build a configuration from a length and a set of classes
    pub fn new(length: usize, classes: &[CharacterClass], include_claimed: bool) -> Self {
        Self {
            length,
            letters: classes.contains(&CharacterClass::Letters),
            digits: classes.contains(&CharacterClass::Digits),
            underscore: classes.contains(&CharacterClass::Underscore),
            include_claimed,
        }
    }

    /// Selected classes, in alphabet order
    pub fn classes(&self) -> Vec<CharacterClass> {
        CharacterClass::ALL
            .into_iter()
            .filter(|class| match class {
                CharacterClass::Letters => self.letters,
                CharacterClass::Digits => self.digits,
                CharacterClass::Underscore => self.underscore,
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&self.length) {
            return Err(crate::validation_error!(
                "Username length must be between {} and {}.",
                MIN_USERNAME_LENGTH,
                MAX_USERNAME_LENGTH
            ));
        }

        if !self.letters && !self.digits && !self.underscore {
            return Err(SniperError::validation(
                "You must include at least one of letters, numbers, or underscores.",
            ));
        }

        Ok(())
    }
}

/// Outcome of a single username lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LookupStatus {
    Available,
    Claimed { id: String },
    /// Retry policy gave up before a conclusive answer
    TransientError { message: String },
}

impl std::fmt::Display for LookupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupStatus::Available => write!(f, "available"),
            LookupStatus::Claimed { .. } => write!(f, "claimed"),
            LookupStatus::TransientError { .. } => write!(f, "error"),
        }
    }
}

/// Username lookup result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    pub name: String,
    pub status: LookupStatus,
}

impl LookupResult {
    pub fn available(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: LookupStatus::Available,
        }
    }

    pub fn claimed(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: LookupStatus::Claimed { id: id.into() },
        }
    }

    pub fn transient_error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: LookupStatus::TransientError {
                message: message.into(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == LookupStatus::Available
    }

    pub fn is_claimed(&self) -> bool {
        matches!(self.status, LookupStatus::Claimed { .. })
    }
}

impl std::fmt::Display for LookupResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.status {
            LookupStatus::Available => write!(f, "{} is available", self.name),
            LookupStatus::Claimed { id } => write!(f, "{} is claimed - {}", self.name, id),
            LookupStatus::TransientError { message } => {
                write!(f, "{} could not be checked: {}", self.name, message)
            }
        }
    }
}

/// Phase of a scan session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    Idle,
    Running,
    Paused,
    Completed,
    Stopped,
}

impl ScanPhase {
    /// Running or paused
    pub fn is_active(&self) -> bool {
        matches!(self, ScanPhase::Running | ScanPhase::Paused)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanPhase::Completed | ScanPhase::Stopped)
    }
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanPhase::Idle => write!(f, "idle"),
            ScanPhase::Running => write!(f, "running"),
            ScanPhase::Paused => write!(f, "paused"),
            ScanPhase::Completed => write!(f, "completed"),
            ScanPhase::Stopped => write!(f, "stopped"),
        }
    }
}

/// Lookup endpoints, pacing and lane configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupSettings {
    /// Proxy prefixes; one scan lane per entry
    pub proxies: Vec<String>,
    pub profile_url: String,
    pub bulk_url: String,
    pub single_retry_delay: Duration,
    pub batch_retry_delay: Duration,
    /// Pause each lane takes after every batch
    pub lane_delay: Duration,
    pub timeout: Duration,
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            proxies: registry::DEFAULT_PROXIES.iter().map(|s| s.to_string()).collect(),
            profile_url: registry::PROFILE_LOOKUP_URL.to_string(),
            bulk_url: registry::BULK_LOOKUP_URL.to_string(),
            single_retry_delay: Duration::from_millis(1000),
            batch_retry_delay: Duration::from_millis(2000),
            lane_delay: Duration::from_millis(2000),
            timeout: Duration::from_secs(15),
        }
    }
}

impl LookupSettings {
    /// Read settings from `SNIPER_*` environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(raw) = lookup("SNIPER_PROXIES") {
            let proxies = parse_proxy_list(&raw);
            if proxies.is_empty() {
                return Err(SniperError::config("SNIPER_PROXIES does not list any proxy"));
            }
            settings.proxies = proxies;
        }
        if let Some(url) = lookup("SNIPER_PROFILE_URL") {
            settings.profile_url = url.trim().to_string();
        }
        if let Some(url) = lookup("SNIPER_BULK_URL") {
            settings.bulk_url = url.trim().to_string();
        }
        if let Some(raw) = lookup("SNIPER_SINGLE_RETRY_MS") {
            settings.single_retry_delay = Duration::from_millis(parse_number("SNIPER_SINGLE_RETRY_MS", &raw)?);
        }
        if let Some(raw) = lookup("SNIPER_BATCH_RETRY_MS") {
            settings.batch_retry_delay = Duration::from_millis(parse_number("SNIPER_BATCH_RETRY_MS", &raw)?);
        }
        if let Some(raw) = lookup("SNIPER_LANE_DELAY_MS") {
            settings.lane_delay = Duration::from_millis(parse_number("SNIPER_LANE_DELAY_MS", &raw)?);
        }
        if let Some(raw) = lookup("SNIPER_TIMEOUT_SECS") {
            settings.timeout = Duration::from_secs(parse_number("SNIPER_TIMEOUT_SECS", &raw)?);
        }

        Ok(settings)
    }

    /// Proxy used for one-off checks
    pub fn primary_proxy(&self) -> &str {
        self.proxies.first().map(String::as_str).unwrap_or("")
    }

    /// Number of lanes a scan will run
    pub fn lane_count(&self) -> usize {
        self.proxies.len().max(1)
    }
}

/// Split a comma separated proxy list, dropping blanks
pub fn parse_proxy_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

fn parse_number(key: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| crate::config_error!("{} must be a whole number ({}): {:?}", key, e, raw))
}
