//! Username Sniper - Minecraft username availability checking and enumeration
//!
//! `check` looks up individual names; `scan` enumerates every name of a given
//! length and character set across the configured proxy lanes.

use std::future::Future;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Confirm, MultiSelect, Select};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use username_sniper::{
    snipe::Alphabet,
    types::{parse_proxy_list, MAX_USERNAME_LENGTH, MIN_USERNAME_LENGTH},
    CharacterClass, LookupSettings, ProfileClient, Result, ResultLog, ScanConfig, ScanController,
    ScanEvent, ScanPhase, ScanProgress, SniperError,
};

/// Scans longer than this get a duration warning
const LONG_SCAN_LENGTH: usize = 5;

/// Candidate count above which a maximum-length scan gets a second warning
const HUGE_SCAN_CANDIDATES: u128 = 1_000_000;

/// Progress bar resolution: hundredths of a percent
const BAR_STEPS: u64 = 10_000;

#[derive(Parser, Debug)]
#[command(name = "username-sniper")]
#[command(about = "Check Minecraft username availability and scan for free names")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Proxy prefix to route lookups through (repeatable, overrides SNIPER_PROXIES)
    #[arg(long = "proxy", value_name = "URL", global = true)]
    proxies: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether one or more usernames are taken
    Check {
        /// Usernames to check
        #[arg(required = true, value_name = "NAME")]
        names: Vec<String>,
    },
    /// Enumerate every username of a given length and character set
    Scan(ScanArgs),
}

#[derive(Args, Debug, Clone)]
struct ScanArgs {
    /// Username length (1-16)
    #[arg(short, long)]
    length: Option<usize>,

    /// Include the letters a-z
    #[arg(long)]
    letters: bool,

    /// Include the digits 0-9
    #[arg(long)]
    digits: bool,

    /// Include the underscore
    #[arg(long)]
    underscore: bool,

    /// Keep claimed names in the result log
    #[arg(long)]
    include_claimed: bool,

    /// Directory to save the result log into when the scan ends
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,
}

impl ScanArgs {
    fn is_unconfigured(&self) -> bool {
        self.length.is_none() && !self.letters && !self.digits && !self.underscore
    }

    fn to_config(&self) -> ScanConfig {
        ScanConfig {
            length: self.length.unwrap_or(ScanConfig::default().length),
            letters: self.letters,
            digits: self.digits,
            underscore: self.underscore,
            include_claimed: self.include_claimed,
        }
    }
}

/// Operator command read from stdin during a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Pause,
    Resume,
    Stop,
}

impl Operator {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" => Some(Operator::Pause),
            "r" | "resume" => Some(Operator::Resume),
            "s" | "stop" => Some(Operator::Stop),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize the library
    if let Err(e) = username_sniper::init() {
        eprintln!("{}", e.user_message());
        process::exit(1);
    }

    init_logging();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{}", e.user_message());
        process::exit(1);
    }
}

/// Log to stderr, filtered by RUST_LOG and quiet by default
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = LookupSettings::from_env()?;
    if !cli.proxies.is_empty() {
        settings.proxies = cli
            .proxies
            .iter()
            .flat_map(|raw| parse_proxy_list(raw))
            .collect();
    }

    tracing::debug!(proxies = settings.proxies.len(), "Lookup settings loaded");

    let client = Arc::new(ProfileClient::new(&settings));
    let controller = Arc::new(ScanController::new(client, settings)?);

    match cli.command {
        Command::Check { names } => run_checks(&controller, &names).await,
        Command::Scan(args) => run_scan(controller, args).await,
    }
}

/// Check names one by one and print a line per result
async fn run_checks(controller: &ScanController, names: &[String]) -> Result<()> {
    let results = controller.check_many(names).await;

    let mut failures = 0;
    for (name, result) in names.iter().zip(results) {
        match result {
            Ok(result) if result.is_available() => println!("✅ {}", result),
            Ok(result) if result.is_claimed() => println!("❌ {}", result),
            Ok(result) => {
                failures += 1;
                println!("⚠️  {}", result);
            }
            Err(e) => {
                failures += 1;
                eprintln!("{} ({})", e.user_message(), name);
            }
        }
    }

    if failures > 0 {
        return Err(SniperError::cli(format!(
            "{} of {} username(s) could not be checked",
            failures,
            names.len()
        )));
    }
    Ok(())
}

async fn run_scan(controller: Arc<ScanController>, args: ScanArgs) -> Result<()> {
    let config = if args.is_unconfigured() {
        prompt_config()?
    } else {
        args.to_config()
    };
    config.validate()?;

    warn_about_size(&config)?;

    let mut log = ResultLog::new(config.include_claimed);
    let mut events = controller.launch(config)?;

    println!("🔍 Scan started. Type p to pause, r to resume, s to stop.");
    let commands = spawn_operator_input();
    let bar = progress_bar();

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let stopped = drive_scan(&controller, &mut events, commands, interrupt, &mut log, &bar).await;
    bar.finish();

    let progress = if stopped {
        ScanProgress::reset(ScanPhase::Stopped)
    } else {
        controller.progress()
    };
    print_summary(stopped, &progress, &log);

    if let Some(dir) = args.output.as_deref() {
        save_log(&log, dir);
    }
    Ok(())
}

/// Pump scan events and operator commands until every lane has exited.
///
/// `interrupt` stops the scan when it resolves; it is polled across loop
/// iterations and at most once to completion. Returns `true` when the scan was
/// stopped rather than completed.
async fn drive_scan<F>(
    controller: &ScanController,
    events: &mut mpsc::UnboundedReceiver<ScanEvent>,
    mut commands: mpsc::UnboundedReceiver<Operator>,
    interrupt: F,
    log: &mut ResultLog,
    bar: &ProgressBar,
) -> bool
where
    F: Future<Output = ()>,
{
    let mut stopped = false;
    let mut interrupted = false;
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ScanEvent::Result(result)) => {
                    if let Some(line) = log.record(&result) {
                        bar.println(line);
                    }
                }
                Some(ScanEvent::Progress(progress)) => update_bar(bar, &progress),
                Some(ScanEvent::Finished(phase)) => {
                    tracing::debug!(phase = %phase, "Scan finished");
                }
                None => break,
            },
            Some(command) = commands.recv() => {
                let outcome = match command {
                    Operator::Pause => controller.pause().map(|_| "⏸️  Scan paused"),
                    Operator::Resume => controller.resume().map(|_| "▶️  Scan resumed"),
                    Operator::Stop => controller.stop().map(|_| "⏹️  Scan stopped"),
                };
                match outcome {
                    Ok(message) => {
                        bar.println(message);
                        if command == Operator::Stop {
                            stopped = true;
                            update_bar(bar, &ScanProgress::reset(ScanPhase::Stopped));
                        }
                    }
                    Err(e) => bar.println(e.user_message()),
                }
            }
            _ = &mut interrupt, if !interrupted => {
                interrupted = true;
                if controller.stop().is_ok() {
                    stopped = true;
                    bar.println("⏹️  Scan stopped");
                    update_bar(bar, &ScanProgress::reset(ScanPhase::Stopped));
                }
            }
        }
    }

    stopped
}

/// Forward stdin lines as operator commands.
///
/// Runs on a plain thread so a pending read never holds up runtime shutdown.
fn spawn_operator_input() -> mpsc::UnboundedReceiver<Operator> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match Operator::parse(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => eprintln!("Unknown command {:?}: use p, r or s", line.trim()),
            }
        }
    });

    rx
}

/// Ask for length, character classes and the claimed-name filter
fn prompt_config() -> Result<ScanConfig> {
    let lengths: Vec<usize> = (MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).collect();
    let length = Select::new("Username length:", lengths)
        .with_starting_cursor(2)
        .prompt()
        .map_err(|e| SniperError::cli(e.to_string()))?;

    let classes = MultiSelect::new("Characters to include:", CharacterClass::ALL.to_vec())
        .with_default(&[0])
        .prompt()
        .map_err(|e| SniperError::cli(e.to_string()))?;

    let include_claimed = Confirm::new("Include claimed names in the output?")
        .with_default(false)
        .prompt()
        .map_err(|e| SniperError::cli(e.to_string()))?;

    Ok(ScanConfig::new(length, &classes, include_claimed))
}

/// Advisory warnings for scans that will run for a long time
fn warn_about_size(config: &ScanConfig) -> Result<()> {
    let total = Alphabet::from_classes(&config.classes())?.total_combinations(config.length);
    println!("📊 {} candidate(s) to check", total);

    if config.length > LONG_SCAN_LENGTH {
        println!(
            "⚠️  Warning: scanning {}-character usernames may take a significant amount of time.",
            config.length
        );
    }
    if config.length == MAX_USERNAME_LENGTH && total > HUGE_SCAN_CANDIDATES {
        println!("⚠️  Warning: {} candidates will not finish in any practical amount of time.", total);
    }
    Ok(())
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(BAR_STEPS);
    let style = ProgressStyle::with_template("{bar:40.cyan/blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    bar.set_style(style);
    update_bar(&bar, &ScanProgress::reset(ScanPhase::Running));
    bar
}

fn update_bar(bar: &ProgressBar, progress: &ScanProgress) {
    bar.set_position((progress.percent() * (BAR_STEPS as f64 / 100.0)) as u64);
    bar.set_message(format!(
        "{} ({:.2}%) {}",
        progress.counter(),
        progress.percent(),
        progress.eta_label()
    ));
}

fn print_summary(stopped: bool, progress: &ScanProgress, log: &ResultLog) {
    println!();
    if stopped {
        println!("⏹️  Scan stopped before completion.");
    } else {
        println!("🎉 Scan complete!");
        println!("   ✅ Available: {}", progress.available_count);
        println!("   ❌ Claimed: {}", progress.claimed_count);
        if progress.error_count > 0 {
            println!("   ⚠️  Unresolved: {}", progress.error_count);
        }
        println!("   📊 Total checked: {}", progress.counter());
        println!("   ⏱️  Total time: {:.2}s", progress.elapsed.as_secs_f32());
    }
    println!("   📝 Result log: {} line(s)", log.lines().len());
}

fn save_log(log: &ResultLog, dir: &Path) {
    match log.export(dir) {
        Ok(path) => println!("💾 Results saved to {}", path.display()),
        Err(e) => eprintln!("{}", e.user_message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use username_sniper::{LookupResult, NameLookup};

    /// Every name is free, each batch takes a second
    struct SlowRegistry;

    #[async_trait]
    impl NameLookup for SlowRegistry {
        async fn check_name(&self, _proxy: &str, name: &str) -> LookupResult {
            LookupResult::available(name)
        }

        async fn check_batch(&self, _proxy: &str, batch: &[String]) -> Vec<LookupResult> {
            tokio::time::sleep(Duration::from_secs(1)).await;
            batch.iter().map(LookupResult::available).collect()
        }

        fn method_name(&self) -> &'static str {
            "slow"
        }
    }

    fn controller() -> ScanController {
        let settings = LookupSettings {
            proxies: vec!["https://p1.test/".to_string()],
            lane_delay: Duration::from_millis(100),
            ..Default::default()
        };
        ScanController::new(Arc::new(SlowRegistry), settings).unwrap()
    }

    #[test]
    fn test_operator_parse() {
        assert_eq!(Operator::parse(" P "), Some(Operator::Pause));
        assert_eq!(Operator::parse("resume"), Some(Operator::Resume));
        assert_eq!(Operator::parse("s"), Some(Operator::Stop));
        assert_eq!(Operator::parse("quit"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_mid_scan_stops_once() {
        let controller = controller();
        let mut events = controller
            .launch(ScanConfig::new(3, &[CharacterClass::Letters], false))
            .unwrap();
        let (_tx, commands) = mpsc::unbounded_channel();
        let mut log = ResultLog::new(false);

        // Resolves while the loop is idle between events
        let interrupt = tokio::time::sleep(Duration::from_millis(2500));
        let stopped = drive_scan(
            &controller,
            &mut events,
            commands,
            interrupt,
            &mut log,
            &ProgressBar::hidden(),
        )
        .await;

        assert!(stopped);
        assert_eq!(controller.phase(), ScanPhase::Idle);
        assert_eq!(controller.progress().counter(), "0/0");
        assert!(log.lines().len() < 17576);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_scan_ignores_pending_interrupt() {
        let controller = controller();
        let mut events = controller
            .launch(ScanConfig::new(1, &[CharacterClass::Digits], false))
            .unwrap();
        let (_tx, commands) = mpsc::unbounded_channel();
        let mut log = ResultLog::new(false);

        let stopped = drive_scan(
            &controller,
            &mut events,
            commands,
            std::future::pending::<()>(),
            &mut log,
            &ProgressBar::hidden(),
        )
        .await;

        assert!(!stopped);
        assert_eq!(controller.phase(), ScanPhase::Completed);
        assert_eq!(log.lines().len(), 10);
    }
}
