//! Scan session state and progress accounting

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::control::ControlEvent;
use super::generator::{NameGenerator, NameStream};
use super::Alphabet;
use crate::error::Result;
use crate::types::{LookupResult, LookupStatus, ScanConfig, ScanPhase};

const SECS_PER_HOUR: f64 = 3600.0;

/// Above this, the estimate collapses to whole hours
const WHOLE_HOURS_THRESHOLD_SECS: f64 = 10.0 * SECS_PER_HOUR;

/// Above this, hours switch to scientific notation
const SCIENTIFIC_THRESHOLD_SECS: f64 = 1000.0 * SECS_PER_HOUR;

/// Outcome of drawing work from a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Draw {
    Batch(Vec<String>),
    /// Generator drained
    Exhausted,
    /// Not running; nothing may be drawn
    Halted,
}

/// A single scan: configuration, live cursor, counters and timing
#[derive(Debug)]
pub struct ScanSession {
    /// Scan identifier
    pub scan_id: String,
    config: ScanConfig,
    stream: NameStream,
    total: u128,
    scanned: u128,
    available_count: u64,
    claimed_count: u64,
    error_count: u64,
    /// Batches drawn but not yet recorded
    in_flight: usize,
    started_at: Instant,
    started_wall: DateTime<Utc>,
    paused_total: Duration,
    paused_since: Option<Instant>,
    phase: ScanPhase,
}

impl ScanSession {
    /// Create an idle session for a validated configuration
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let alphabet = Alphabet::from_classes(&config.classes())?;
        let stream = NameGenerator::new(config.length, alphabet).stream();
        let total = stream.generator().total();
        let now = Utc::now();

        Ok(Self {
            scan_id: format!("scan_{}_{}", config.length, now.format("%Y%m%d_%H%M%S")),
            config,
            stream,
            total,
            scanned: 0,
            available_count: 0,
            claimed_count: 0,
            error_count: 0,
            in_flight: 0,
            started_at: Instant::now(),
            started_wall: now,
            paused_total: Duration::ZERO,
            paused_since: None,
            phase: ScanPhase::Idle,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn total(&self) -> u128 {
        self.total
    }

    pub fn scanned(&self) -> u128 {
        self.scanned
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_wall
    }

    /// Drive the phase machine, keeping pause accounting in step
    pub fn apply(&mut self, event: ControlEvent) -> Result<ScanPhase> {
        self.apply_at(event, Instant::now())
    }

    pub(crate) fn apply_at(&mut self, event: ControlEvent, now: Instant) -> Result<ScanPhase> {
        let next = self.phase.apply(event)?;

        match event {
            ControlEvent::Launch => {
                self.started_at = now;
                self.started_wall = Utc::now();
            }
            ControlEvent::Pause => self.paused_since = Some(now),
            _ => {
                if let Some(since) = self.paused_since.take() {
                    self.paused_total += now.saturating_duration_since(since);
                }
            }
        }

        self.phase = next;
        Ok(next)
    }

    /// Take the next batch, only while running
    pub(crate) fn draw_batch(&mut self, size: usize) -> Draw {
        if self.phase != ScanPhase::Running {
            return Draw::Halted;
        }

        let batch = self.stream.next_batch(size);
        if batch.is_empty() {
            return Draw::Exhausted;
        }

        self.in_flight += 1;
        Draw::Batch(batch)
    }

    /// Record the results of a drawn batch.
    ///
    /// Returns `false` when the session was stopped meanwhile and the results were dropped.
    pub(crate) fn record_batch(&mut self, results: &[LookupResult]) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);

        if self.phase == ScanPhase::Stopped {
            return false;
        }

        for result in results {
            self.record(result);
        }
        true
    }

    fn record(&mut self, result: &LookupResult) {
        match result.status {
            LookupStatus::Available => self.available_count += 1,
            LookupStatus::Claimed { .. } => self.claimed_count += 1,
            LookupStatus::TransientError { .. } => self.error_count += 1,
        }
        self.scanned += 1;
    }

    /// Complete the session once the generator is drained and nothing is in flight
    pub(crate) fn try_complete(&mut self) -> bool {
        if self.phase.is_active() && self.stream.is_exhausted() && self.in_flight == 0 {
            return self.apply(ControlEvent::Exhausted).is_ok();
        }
        false
    }

    /// Active scan time, excluding pauses
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        let paused_now = self
            .paused_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default();

        now.saturating_duration_since(self.started_at)
            .saturating_sub(self.paused_total)
            .saturating_sub(paused_now)
    }

    pub fn progress(&self) -> ScanProgress {
        self.progress_at(Instant::now())
    }

    pub fn progress_at(&self, now: Instant) -> ScanProgress {
        let elapsed = self.elapsed_at(now);
        let remaining = estimate_remaining(elapsed, self.scanned, self.total);
        let rate = if elapsed.as_secs_f64() > 0.0 {
            self.scanned as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        ScanProgress {
            phase: self.phase,
            scanned: self.scanned,
            total: self.total,
            available_count: self.available_count,
            claimed_count: self.claimed_count,
            error_count: self.error_count,
            names_per_second: rate,
            elapsed,
            estimated_remaining_secs: remaining,
        }
    }
}

/// `elapsed / scanned * (total - scanned)` in seconds, 0 before the first result
pub fn estimate_remaining(elapsed: Duration, scanned: u128, total: u128) -> f64 {
    if scanned == 0 {
        return 0.0;
    }
    let average = elapsed.as_secs_f64() / scanned as f64;
    average * total.saturating_sub(scanned) as f64
}

/// Render a remaining-time estimate.
///
/// `Hh Mm Ss` normally, whole hours beyond 10h and scientific hours beyond
/// 1000h. Negative or NaN input reads `0h 0m 0s`.
pub fn format_eta(seconds: f64) -> String {
    if seconds.is_nan() || seconds < 0.0 {
        return "0h 0m 0s".to_string();
    }

    if seconds > SCIENTIFIC_THRESHOLD_SECS {
        return format!("{:.2e}h", seconds / SECS_PER_HOUR);
    }

    if seconds > WHOLE_HOURS_THRESHOLD_SECS {
        return format!("{}h", (seconds / SECS_PER_HOUR).floor() as u64);
    }

    let whole = seconds.floor() as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;
    format!("{}h {}m {}s", hours, minutes, secs)
}

/// Scan progress info
#[derive(Debug, Clone, Serialize)]
pub struct ScanProgress {
    pub phase: ScanPhase,
    pub scanned: u128,
    pub total: u128,
    pub available_count: u64,
    pub claimed_count: u64,
    pub error_count: u64,
    pub names_per_second: f64,
    pub elapsed: Duration,
    pub estimated_remaining_secs: f64,
}

impl ScanProgress {
    /// Display state with no scan loaded: `0/0`, no estimate
    pub fn reset(phase: ScanPhase) -> Self {
        Self {
            phase,
            scanned: 0,
            total: 0,
            available_count: 0,
            claimed_count: 0,
            error_count: 0,
            names_per_second: 0.0,
            elapsed: Duration::ZERO,
            estimated_remaining_secs: 0.0,
        }
    }

    /// Get progress percentage
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.scanned as f64 / self.total as f64) * 100.0
        }
    }

    pub fn eta(&self) -> String {
        format_eta(self.estimated_remaining_secs)
    }

    /// `scanned/total`
    pub fn counter(&self) -> String {
        format!("{}/{}", self.scanned, self.total)
    }

    /// `Estimated time: ...`
    pub fn eta_label(&self) -> String {
        format!("Estimated time: {}", self.eta())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CharacterClass;

    fn digits_config() -> ScanConfig {
        ScanConfig::new(1, &[CharacterClass::Digits], false)
    }

    fn running(config: ScanConfig) -> ScanSession {
        let mut session = ScanSession::new(config).unwrap();
        session.apply(ControlEvent::Launch).unwrap();
        session
    }

    #[test]
    fn test_session_creation() {
        let session = ScanSession::new(ScanConfig::new(4, &[CharacterClass::Letters], false)).unwrap();
        assert_eq!(session.total(), 456976);
        assert_eq!(session.scanned(), 0);
        assert_eq!(session.phase(), ScanPhase::Idle);
        assert!(session.scan_id.starts_with("scan_4_"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(ScanSession::new(ScanConfig::new(0, &[CharacterClass::Digits], false)).is_err());
        assert!(ScanSession::new(ScanConfig::new(3, &[], false)).is_err());
    }

    #[test]
    fn test_draw_only_while_running() {
        let mut session = ScanSession::new(digits_config()).unwrap();
        assert_eq!(session.draw_batch(10), Draw::Halted);

        session.apply(ControlEvent::Launch).unwrap();
        session.apply(ControlEvent::Pause).unwrap();
        assert_eq!(session.draw_batch(10), Draw::Halted);

        session.apply(ControlEvent::Resume).unwrap();
        assert!(matches!(session.draw_batch(4), Draw::Batch(b) if b.len() == 4));
    }

    #[test]
    fn test_completion_waits_for_in_flight_batches() {
        let mut session = running(digits_config());

        let Draw::Batch(first) = session.draw_batch(6) else { panic!("expected batch") };
        let Draw::Batch(second) = session.draw_batch(6) else { panic!("expected batch") };
        assert_eq!(second.len(), 4);
        assert_eq!(session.draw_batch(6), Draw::Exhausted);
        assert!(!session.try_complete());

        let results: Vec<LookupResult> = first.iter().map(LookupResult::available).collect();
        assert!(session.record_batch(&results));
        assert!(!session.try_complete());

        let results: Vec<LookupResult> = second.iter().map(LookupResult::available).collect();
        assert!(session.record_batch(&results));
        assert!(session.try_complete());
        assert_eq!(session.phase(), ScanPhase::Completed);
        assert_eq!(session.scanned(), 10);
    }

    #[test]
    fn test_stopped_session_drops_late_results() {
        let mut session = running(digits_config());
        let Draw::Batch(batch) = session.draw_batch(10) else { panic!("expected batch") };
        session.apply(ControlEvent::Stop).unwrap();

        let results: Vec<LookupResult> = batch.iter().map(LookupResult::available).collect();
        assert!(!session.record_batch(&results));
        assert_eq!(session.scanned(), 0);
        assert!(!session.try_complete());
    }

    #[test]
    fn test_counters_by_status() {
        let mut session = running(digits_config());
        let Draw::Batch(_) = session.draw_batch(3) else { panic!("expected batch") };
        session.record_batch(&[
            LookupResult::available("0"),
            LookupResult::claimed("1", "id1"),
            LookupResult::transient_error("2", "gave up"),
        ]);

        let progress = session.progress();
        assert_eq!(progress.scanned, 3);
        assert_eq!(progress.available_count, 1);
        assert_eq!(progress.claimed_count, 1);
        assert_eq!(progress.error_count, 1);
        assert_eq!(progress.counter(), "3/10");
        assert!((progress.percent() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_paused_time_excluded_from_elapsed() {
        let mut session = ScanSession::new(digits_config()).unwrap();
        let t0 = Instant::now();
        session.apply_at(ControlEvent::Launch, t0).unwrap();
        session.apply_at(ControlEvent::Pause, t0 + Duration::from_secs(10)).unwrap();

        // Frozen while paused
        assert_eq!(session.elapsed_at(t0 + Duration::from_secs(40)), Duration::from_secs(10));

        session.apply_at(ControlEvent::Resume, t0 + Duration::from_secs(70)).unwrap();
        assert_eq!(session.elapsed_at(t0 + Duration::from_secs(75)), Duration::from_secs(15));
    }

    #[test]
    fn test_estimate_remaining() {
        assert_eq!(estimate_remaining(Duration::from_secs(30), 0, 100), 0.0);
        assert_eq!(estimate_remaining(Duration::from_secs(10), 10, 100), 90.0);
        assert_eq!(estimate_remaining(Duration::from_secs(10), 100, 100), 0.0);
    }

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(0.0), "0h 0m 0s");
        assert_eq!(format_eta(-5.0), "0h 0m 0s");
        assert_eq!(format_eta(f64::NAN), "0h 0m 0s");
        assert_eq!(format_eta(3725.9), "1h 2m 5s");
        assert_eq!(format_eta(36000.0), "10h 0m 0s");
        assert_eq!(format_eta(36001.0), "10h");
        assert_eq!(format_eta(200.0 * 3600.0 + 59.0), "200h");
        assert_eq!(format_eta(12345.0 * 3600.0), "1.23e4h");
    }

    #[test]
    fn test_reset_progress_display() {
        let progress = ScanProgress::reset(ScanPhase::Stopped);
        assert_eq!(progress.counter(), "0/0");
        assert_eq!(progress.eta_label(), "Estimated time: 0h 0m 0s");
        assert_eq!(progress.percent(), 0.0);
    }
}
