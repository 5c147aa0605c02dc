//! Username sniper - drive enumeration scans through the lookup lanes

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use super::control::{ControlEvent, PhaseWatcher, ScanControl};
use super::session::{Draw, ScanProgress, ScanSession};
use crate::error::{Result, SniperError};
use crate::lookup::{NameLookup, UsernameValidator};
use crate::proxy::registry::BULK_LOOKUP_LIMIT;
use crate::types::{LookupResult, LookupSettings, ScanConfig, ScanPhase};

/// Event emitted by a running scan
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// One candidate resolved
    Result(LookupResult),
    /// Counters after a batch was recorded
    Progress(ScanProgress),
    /// Scan reached a terminal phase
    Finished(ScanPhase),
}

/// The scan currently owned by the controller
struct ActiveScan {
    session: Arc<Mutex<ScanSession>>,
    control: Arc<ScanControl>,
    lanes: JoinSet<()>,
}

/// State shared by every lane of one scan
struct LaneContext {
    lookup: Arc<dyn NameLookup>,
    session: Arc<Mutex<ScanSession>>,
    control: Arc<ScanControl>,
    events: mpsc::UnboundedSender<ScanEvent>,
    lane_delay: Duration,
}

/// Username sniper: one-off checks plus pausable enumeration scans
pub struct ScanController {
    lookup: Arc<dyn NameLookup>,
    settings: LookupSettings,
    validator: UsernameValidator,
    active: Mutex<Option<ActiveScan>>,
}

impl ScanController {
    /// Create a new controller over a lookup backend
    pub fn new(lookup: Arc<dyn NameLookup>, settings: LookupSettings) -> Result<Self> {
        Ok(Self {
            lookup,
            settings,
            validator: UsernameValidator::new()?,
            active: Mutex::new(None),
        })
    }

    pub fn settings(&self) -> &LookupSettings {
        &self.settings
    }

    /// Phase of the current session, `Idle` when none is loaded
    pub fn phase(&self) -> ScanPhase {
        self.active
            .lock()
            .as_ref()
            .map(|scan| scan.session.lock().phase())
            .unwrap_or(ScanPhase::Idle)
    }

    pub fn is_scanning(&self) -> bool {
        self.phase().is_active()
    }

    /// Check a single username through the primary proxy
    pub async fn check_single(&self, name: &str) -> Result<LookupResult> {
        if self.is_scanning() {
            return Err(SniperError::state_conflict(
                "Single checks are disabled while a scan is in progress.",
            ));
        }

        let name = self.validator.validate(name)?;
        Ok(self.lookup.check_name(self.settings.primary_proxy(), &name).await)
    }

    /// Check several usernames one after another, one result per input
    pub async fn check_many(&self, names: &[String]) -> Vec<Result<LookupResult>> {
        let results: Vec<Result<LookupResult>> = stream::iter(names)
            .then(|name| self.check_single(name))
            .collect()
            .await;

        tracing::info!(
            names_requested = names.len(),
            names_resolved = results.iter().filter(|r| r.is_ok()).count(),
            "Username checks completed"
        );
        results
    }

    /// Start a new scan, replacing any finished one.
    ///
    /// Spawns one lane per proxy onto the current tokio runtime and returns the
    /// event stream; the stream closes once every lane has exited.
    pub fn launch(&self, config: ScanConfig) -> Result<mpsc::UnboundedReceiver<ScanEvent>> {
        let mut active = self.active.lock();

        if let Some(scan) = active.as_ref() {
            if scan.session.lock().phase().is_active() {
                return Err(SniperError::state_conflict("A scan is already in progress."));
            }
        }

        let mut session = ScanSession::new(config)?;
        let phase = session.apply(ControlEvent::Launch)?;

        tracing::info!(
            scan_id = %session.scan_id,
            length = session.config().length,
            total = %session.total(),
            lanes = self.settings.lane_count(),
            "Scan launched"
        );

        let control = Arc::new(ScanControl::new());
        control.publish(phase);

        let session = Arc::new(Mutex::new(session));
        let (events, receiver) = mpsc::unbounded_channel();

        let proxies: Vec<String> = if self.settings.proxies.is_empty() {
            vec![String::new()]
        } else {
            self.settings.proxies.clone()
        };

        let mut lanes = JoinSet::new();
        for (lane, proxy) in proxies.into_iter().enumerate() {
            let context = LaneContext {
                lookup: Arc::clone(&self.lookup),
                session: Arc::clone(&session),
                control: Arc::clone(&control),
                events: events.clone(),
                lane_delay: self.settings.lane_delay,
            };
            lanes.spawn(run_lane(lane, proxy, context));
        }

        *active = Some(ActiveScan {
            session,
            control,
            lanes,
        });

        Ok(receiver)
    }

    /// Stop drawing new candidates; in-flight lookups still finish
    pub fn pause(&self) -> Result<()> {
        self.transition(ControlEvent::Pause).map(|_| ())
    }

    pub fn resume(&self) -> Result<()> {
        self.transition(ControlEvent::Resume).map(|_| ())
    }

    /// Stop the scan, discard the remaining candidates and reset progress
    pub fn stop(&self) -> Result<ScanProgress> {
        let mut active = self.active.lock();
        let scan = active
            .as_mut()
            .ok_or_else(|| SniperError::state_conflict("No scan is in progress."))?;

        let final_progress = {
            let mut session = scan.session.lock();
            let phase = session.apply(ControlEvent::Stop)?;
            scan.control.publish(phase);
            session.progress()
        };

        scan.lanes.abort_all();
        *active = None;

        tracing::info!(scanned = %final_progress.scanned, total = %final_progress.total, "Scan stopped");
        Ok(final_progress)
    }

    /// Live progress, or a reset display when no scan is loaded
    pub fn progress(&self) -> ScanProgress {
        match self.active.lock().as_ref() {
            Some(scan) => scan.session.lock().progress(),
            None => ScanProgress::reset(ScanPhase::Idle),
        }
    }

    /// Watch the phase of the current scan
    pub fn watch(&self) -> Option<PhaseWatcher> {
        self.active.lock().as_ref().map(|scan| scan.control.subscribe())
    }

    /// Wait until the current scan completes or stops
    pub async fn wait(&self) -> ScanPhase {
        match self.watch() {
            Some(mut watcher) => watcher.wait_terminal().await,
            None => ScanPhase::Idle,
        }
    }

    fn transition(&self, event: ControlEvent) -> Result<ScanPhase> {
        let active = self.active.lock();
        let scan = active
            .as_ref()
            .ok_or_else(|| SniperError::state_conflict("No scan is in progress."))?;

        let mut session = scan.session.lock();
        let phase = session.apply(event)?;
        scan.control.publish(phase);
        Ok(phase)
    }
}

/// One lane: draw a batch, resolve it through `proxy`, record, rest, repeat
async fn run_lane(lane: usize, proxy: String, context: LaneContext) {
    let mut watcher = context.control.subscribe();
    tracing::debug!(lane = lane, proxy = %proxy, "Lane started");

    loop {
        if !watcher.wait_runnable().await {
            break;
        }

        if context.events.is_closed() {
            abandon_scan(lane, &context);
            break;
        }

        let draw = context.session.lock().draw_batch(BULK_LOOKUP_LIMIT);
        let batch = match draw {
            Draw::Batch(batch) => batch,
            Draw::Exhausted => {
                finish_if_complete(&context);
                break;
            }
            // Paused between the wake-up and the draw
            Draw::Halted => continue,
        };

        let results = context.lookup.check_batch(&proxy, &batch).await;

        {
            let mut session = context.session.lock();
            if !session.record_batch(&results) {
                break;
            }

            let delivered = results
                .into_iter()
                .all(|result| context.events.send(ScanEvent::Result(result)).is_ok())
                && context
                    .events
                    .send(ScanEvent::Progress(session.progress()))
                    .is_ok();

            if !delivered {
                drop(session);
                abandon_scan(lane, &context);
                break;
            }
        }

        if finish_if_complete(&context) {
            break;
        }

        if !context.lane_delay.is_zero() {
            tokio::time::sleep(context.lane_delay).await;
        }
    }

    tracing::debug!(lane = lane, "Lane exited");
}

/// Stop the session once nobody is listening for its results
fn abandon_scan(lane: usize, context: &LaneContext) {
    let mut session = context.session.lock();
    if !session.phase().is_active() {
        return;
    }

    if let Ok(phase) = session.apply(ControlEvent::Stop) {
        context.control.publish(phase);
        tracing::warn!(
            lane = lane,
            scan_id = %session.scan_id,
            scanned = %session.scanned(),
            "Event receiver dropped, stopping scan"
        );
    }
}

/// Complete the session if this lane recorded the last batch
fn finish_if_complete(context: &LaneContext) -> bool {
    let mut session = context.session.lock();
    if !session.try_complete() {
        return false;
    }

    let progress = session.progress();
    context.control.publish(ScanPhase::Completed);
    let _ = context.events.send(ScanEvent::Finished(ScanPhase::Completed));

    tracing::info!(
        scan_id = %session.scan_id,
        scanned = %progress.scanned,
        available = progress.available_count,
        claimed = progress.claimed_count,
        "Scan complete"
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CharacterClass, LookupStatus};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory registry that records every batch it is asked about
    #[derive(Default)]
    struct FakeRegistry {
        claimed: HashMap<String, String>,
        batches: Mutex<Vec<(String, Vec<String>)>>,
        singles: Mutex<Vec<String>>,
        singles_in_flight: AtomicUsize,
        max_singles_in_flight: AtomicUsize,
    }

    impl FakeRegistry {
        fn with_claimed(pairs: &[(&str, &str)]) -> Self {
            Self {
                claimed: pairs
                    .iter()
                    .map(|(name, id)| (name.to_lowercase(), id.to_string()))
                    .collect(),
                ..Default::default()
            }
        }

        fn resolve(&self, name: &str) -> LookupResult {
            match self.claimed.get(&name.to_lowercase()) {
                Some(id) => LookupResult::claimed(name, id.clone()),
                None => LookupResult::available(name),
            }
        }

        fn drawn(&self) -> Vec<String> {
            self.batches
                .lock()
                .iter()
                .flat_map(|(_, batch)| batch.iter().cloned())
                .collect()
        }
    }

    #[async_trait]
    impl NameLookup for FakeRegistry {
        async fn check_name(&self, _proxy: &str, name: &str) -> LookupResult {
            self.singles.lock().push(name.to_string());
            let now = self.singles_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_singles_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.singles_in_flight.fetch_sub(1, Ordering::SeqCst);
            self.resolve(name)
        }

        async fn check_batch(&self, proxy: &str, batch: &[String]) -> Vec<LookupResult> {
            self.batches.lock().push((proxy.to_string(), batch.to_vec()));
            tokio::time::sleep(Duration::from_millis(50)).await;
            batch.iter().map(|name| self.resolve(name)).collect()
        }

        fn method_name(&self) -> &'static str {
            "fake"
        }
    }

    fn settings(lanes: usize) -> LookupSettings {
        LookupSettings {
            proxies: (0..lanes).map(|i| format!("https://proxy{}.test/", i)).collect(),
            lane_delay: Duration::from_millis(100),
            ..Default::default()
        }
    }

    fn controller(registry: Arc<FakeRegistry>, lanes: usize) -> ScanController {
        ScanController::new(registry, settings(lanes)).unwrap()
    }

    async fn collect(mut rx: mpsc::UnboundedReceiver<ScanEvent>) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn results(events: &[ScanEvent]) -> Vec<LookupResult> {
        events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::Result(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_digit_scan_marks_claimed_name() {
        let registry = Arc::new(FakeRegistry::with_claimed(&[("5", "x1")]));
        let controller = controller(Arc::clone(&registry), 1);

        let rx = controller
            .launch(ScanConfig::new(1, &[CharacterClass::Digits], false))
            .unwrap();
        let events = collect(rx).await;

        let results = results(&events);
        assert_eq!(results.len(), 10);
        for result in &results {
            if result.name == "5" {
                assert_eq!(result.status, LookupStatus::Claimed { id: "x1".to_string() });
            } else {
                assert!(result.is_available(), "{}", result.name);
            }
        }

        assert_eq!(registry.batches.lock().len(), 1);
        assert!(matches!(events.last(), Some(ScanEvent::Finished(ScanPhase::Completed))));
        assert_eq!(controller.phase(), ScanPhase::Completed);
        let progress = controller.progress();
        assert_eq!(progress.scanned, 10);
        assert_eq!(progress.total, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lanes_share_one_cursor() {
        let registry = Arc::new(FakeRegistry::default());
        let controller = controller(Arc::clone(&registry), 5);

        let rx = controller
            .launch(ScanConfig::new(2, &[CharacterClass::Digits, CharacterClass::Underscore], true))
            .unwrap();
        let events = collect(rx).await;

        let mut drawn = registry.drawn();
        assert_eq!(drawn.len(), 121);
        drawn.sort();
        drawn.dedup();
        assert_eq!(drawn.len(), 121);

        let proxies: std::collections::HashSet<String> =
            registry.batches.lock().iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(proxies.len(), 5);

        assert_eq!(results(&events).len(), 121);
        let finished = events
            .iter()
            .filter(|e| matches!(e, ScanEvent::Finished(_)))
            .count();
        assert_eq!(finished, 1);
        assert_eq!(controller.progress().scanned, 121);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_resume_neither_skips_nor_repeats() {
        let registry = Arc::new(FakeRegistry::default());
        let controller = controller(Arc::clone(&registry), 2);

        let mut rx = controller
            .launch(ScanConfig::new(2, &[CharacterClass::Digits], false))
            .unwrap();

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            let is_progress = matches!(event, ScanEvent::Progress(_));
            events.push(event);
            if is_progress {
                break;
            }
        }

        controller.pause().unwrap();
        assert_eq!(controller.phase(), ScanPhase::Paused);
        let drawn_at_pause = registry.batches.lock().len();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(registry.batches.lock().len(), drawn_at_pause);

        controller.resume().unwrap();
        events.extend(collect(rx).await);

        let mut names: Vec<String> = results(&events).into_iter().map(|r| r.name).collect();
        assert_eq!(names.len(), 100);
        names.sort();
        let expected: Vec<String> = (0..100).map(|n| format!("{:02}", n)).collect();
        assert_eq!(names, expected);
        assert_eq!(controller.phase(), ScanPhase::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_then_relaunch_resets_counters() {
        let registry = Arc::new(FakeRegistry::default());
        let controller = controller(Arc::clone(&registry), 1);

        let mut rx = controller
            .launch(ScanConfig::new(3, &[CharacterClass::Letters], false))
            .unwrap();
        while let Some(event) = rx.recv().await {
            if matches!(event, ScanEvent::Progress(_)) {
                break;
            }
        }

        let stopped = controller.stop().unwrap();
        assert_eq!(stopped.phase, ScanPhase::Stopped);
        assert_eq!(stopped.total, 17576);
        assert!(stopped.scanned > 0);

        let reset = controller.progress();
        assert_eq!(reset.counter(), "0/0");
        assert_eq!(reset.eta(), "0h 0m 0s");
        assert_eq!(controller.phase(), ScanPhase::Idle);

        // Aborted lanes drop their senders
        assert!(collect(rx).await.iter().all(|e| !matches!(e, ScanEvent::Finished(ScanPhase::Completed))));

        let rx = controller
            .launch(ScanConfig::new(1, &[CharacterClass::Underscore], false))
            .unwrap();
        let progress = controller.progress();
        assert_eq!(progress.scanned, 0);
        assert_eq!(progress.total, 1);

        let events = collect(rx).await;
        assert_eq!(results(&events), vec![LookupResult::available("_")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_conflicts_and_validation() {
        let registry = Arc::new(FakeRegistry::default());
        let controller = controller(Arc::clone(&registry), 1);

        let zero = controller.launch(ScanConfig::new(0, &[CharacterClass::Digits], false));
        assert!(matches!(zero, Err(SniperError::Validation { .. })));
        let none = controller.launch(ScanConfig::new(2, &[], false));
        assert!(matches!(none, Err(SniperError::Validation { .. })));
        assert_eq!(controller.phase(), ScanPhase::Idle);

        let _rx = controller
            .launch(ScanConfig::new(2, &[CharacterClass::Letters], false))
            .unwrap();
        let again = controller.launch(ScanConfig::new(1, &[CharacterClass::Digits], false));
        assert!(matches!(again, Err(SniperError::StateConflict { .. })));
        assert_eq!(controller.progress().total, 676);

        controller.pause().unwrap();
        assert!(matches!(controller.pause(), Err(SniperError::StateConflict { .. })));
        assert!(controller.launch(ScanConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_controls_without_scan_conflict() {
        let controller = controller(Arc::new(FakeRegistry::default()), 1);
        assert!(matches!(controller.pause(), Err(SniperError::StateConflict { .. })));
        assert!(matches!(controller.resume(), Err(SniperError::StateConflict { .. })));
        assert!(matches!(controller.stop(), Err(SniperError::StateConflict { .. })));
        assert_eq!(controller.wait().await, ScanPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_check_validates_and_uses_primary_proxy() {
        let registry = Arc::new(FakeRegistry::with_claimed(&[("Notch", "069a79f4")]));
        let controller = controller(Arc::clone(&registry), 3);

        let claimed = controller.check_single(" Notch ").await.unwrap();
        assert_eq!(claimed, LookupResult::claimed("Notch", "069a79f4"));
        assert!(controller.check_single("xXrandomXx123").await.unwrap().is_available());

        assert!(matches!(
            controller.check_single("bad name!").await,
            Err(SniperError::Validation { .. })
        ));
        assert_eq!(registry.singles.lock().len(), 2);

        let checks = controller
            .check_many(&["jeb_".to_string(), "".to_string()])
            .await;
        assert!(checks[0].is_ok());
        assert!(checks[1].is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_check_refused_during_scan() {
        let controller = controller(Arc::new(FakeRegistry::default()), 1);
        let _rx = controller
            .launch(ScanConfig::new(3, &[CharacterClass::Letters], false))
            .unwrap();

        assert!(matches!(
            controller.check_single("Notch").await,
            Err(SniperError::StateConflict { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_terminal_phase() {
        let controller = controller(Arc::new(FakeRegistry::default()), 2);
        let _rx = controller
            .launch(ScanConfig::new(1, &[CharacterClass::Letters], true))
            .unwrap();

        assert_eq!(controller.wait().await, ScanPhase::Completed);
        assert_eq!(controller.progress().scanned, 26);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_many_runs_one_at_a_time() {
        let registry = Arc::new(FakeRegistry::with_claimed(&[("jeb_", "id")]));
        let controller = controller(Arc::clone(&registry), 3);

        let names: Vec<String> = ["jeb_", "Dinnerbone", "abc"].iter().map(|n| n.to_string()).collect();
        let results = controller.check_many(&names).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().unwrap().is_claimed());
        assert_eq!(*registry.singles.lock(), names);
        assert_eq!(registry.max_singles_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_receiver_stops_lanes() {
        let registry = Arc::new(FakeRegistry::default());
        let controller = controller(Arc::clone(&registry), 2);

        let mut rx = controller
            .launch(ScanConfig::new(3, &[CharacterClass::Letters], false))
            .unwrap();
        while let Some(event) = rx.recv().await {
            if matches!(event, ScanEvent::Progress(_)) {
                break;
            }
        }
        drop(rx);

        tokio::time::sleep(Duration::from_secs(5)).await;
        let drawn = registry.batches.lock().len();
        assert!(drawn <= 4, "{} batches drawn", drawn);
        assert_eq!(controller.phase(), ScanPhase::Stopped);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(registry.batches.lock().len(), drawn);

        let rx = controller
            .launch(ScanConfig::new(1, &[CharacterClass::Digits], false))
            .unwrap();
        assert_eq!(collect(rx).await.len(), 12);
    }
}
