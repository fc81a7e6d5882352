//! alarm-worker: runs the alarm state machine against a JSON store.
//!
//! Reconciles all instances on start, then delivers armed transitions as
//! they come due. Commands are read from stdin (`help` lists them); wall
//! clock jumps trigger a fresh reconciliation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use reveille_core::config::{load_dotenv, Config};
use reveille_core::{AlarmId, AlarmRecord};
use reveille_engine::clock::{Clock, ClockWatch, SystemClock};
use reveille_engine::command::{WorkerCommand, USAGE};
use reveille_engine::generation::{FileGenerationStore, GenerationCounter};
use reveille_engine::json_store::JsonFileStore;
use reveille_engine::sinks::{LogNextWakePublisher, LogNotificationSink, LogToneSink};
use reveille_engine::timer::TokioTransitionScheduler;
use reveille_engine::wake::CountingWakeLock;
use reveille_engine::{AlarmEvent, AlarmStateManager, Collaborators, UpdateKind};

// ── CLI ─────────────────────────────────────────────────────────────

/// Alarm worker: keeps alarm instances on schedule.
#[derive(Parser, Debug)]
#[command(name = "alarm-worker", version, about)]
struct Cli {
    /// Config profile; keys are looked up as {PROFILE}_{KEY} first.
    #[arg(long, env = "REVEILLE_PROFILE", default_value = "")]
    profile: String,

    /// Overrides DATA_DIR from the environment.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Do not read commands from stdin.
    #[arg(long)]
    no_stdin: bool,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::for_profile(&cli.profile);
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }
    config.log_summary();

    let store = Arc::new(JsonFileStore::open(config.storage.store_path())?);
    let generation =
        GenerationCounter::load(Box::new(FileGenerationStore::new(config.storage.generation_path())))?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<AlarmEvent>();

    let scheduler = Arc::new(TokioTransitionScheduler::new(
        tokio::runtime::Handle::current(),
        Arc::clone(&clock),
        events_tx.clone(),
    ));

    let manager = Arc::new(AlarmStateManager::new(
        config.alarm.clone(),
        Collaborators {
            instances: store.clone(),
            records: store.clone(),
            scheduler: scheduler.clone(),
            notifications: Arc::new(LogNotificationSink),
            tone: Arc::new(LogToneSink),
            next_wake: Arc::new(LogNextWakePublisher),
            clock: Arc::clone(&clock),
            wake_lock: Arc::new(CountingWakeLock::default()),
        },
        generation,
    ));

    info!(path = %store.path().display(), "alarm worker starting");
    events_tx.send(AlarmEvent::Boot)?;

    let mut stdin = if cli.no_stdin {
        None
    } else {
        Some(BufReader::new(tokio::io::stdin()).lines())
    };

    let interval = Duration::from_secs(config.clock.check_interval_secs.max(1));
    let mut ticker = tokio::time::interval(interval);
    let mut watch = ClockWatch::new(
        Duration::from_secs(config.clock.jump_threshold_secs),
        clock.now(),
        Instant::now(),
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = events_rx.recv() => {
                let manager = Arc::clone(&manager);
                let label = event.to_string();
                match tokio::task::spawn_blocking(move || manager.dispatch(event)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!(event = %label, error = %e, "event handling failed"),
                    Err(e) => error!(event = %label, error = %e, "event task panicked"),
                }
            }
            line = next_line(&mut stdin) => {
                match line {
                    Some(line) if !line.trim().is_empty() => {
                        let manager = Arc::clone(&manager);
                        match tokio::task::spawn_blocking(move || run_command(&manager, &line)).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => warn!(error = %e, "command failed"),
                            Err(e) => error!(error = %e, "command task panicked"),
                        }
                    }
                    Some(_) => {}
                    None => {
                        info!("stdin closed, continuing without commands");
                        stdin = None;
                    }
                }
            }
            _ = ticker.tick() => {
                if let Some(drift) = watch.check(clock.now(), Instant::now()) {
                    warn!(drift_secs = drift.num_seconds(), "wall clock jumped, reconciling alarms");
                    events_tx.send(AlarmEvent::TimeChanged)?;
                }
            }
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    info!(armed = scheduler.armed_count(), "alarm worker stopped");
    Ok(())
}

/// Next stdin line, or pending forever when stdin is not being read.
async fn next_line(
    stdin: &mut Option<tokio::io::Lines<BufReader<tokio::io::Stdin>>>,
) -> Option<String> {
    match stdin {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => std::future::pending().await,
    }
}

fn run_command(manager: &AlarmStateManager, line: &str) -> anyhow::Result<()> {
    let command: WorkerCommand = match line.parse() {
        Ok(command) => command,
        Err(e) => {
            println!("{}\n{}", e, USAGE);
            return Ok(());
        }
    };

    match command {
        WorkerCommand::Add {
            hour,
            minute,
            days,
            label,
        } => {
            let record = AlarmRecord::new(hour, minute)?.with_days(days).with_label(label);
            let (record, instance) = manager.add_alarm(record)?;
            match instance {
                Some(instance) => println!("added {} -> {}", record, instance),
                None => println!("added {}", record),
            }
        }
        WorkerCommand::Delete(alarm_id) => {
            if !manager.delete_alarm(alarm_id)? {
                println!("no alarm {}", alarm_id);
            }
        }
        WorkerCommand::Enable(alarm_id) => set_enabled(manager, alarm_id, true)?,
        WorkerCommand::Disable(alarm_id) => set_enabled(manager, alarm_id, false)?,
        WorkerCommand::Snooze(id) => manager.on_user_snooze(id)?,
        WorkerCommand::Dismiss(id) => manager.on_user_dismiss(id)?,
        WorkerCommand::Hide(id) => manager.on_user_hide(id)?,
        WorkerCommand::List => {
            let alarms = manager.alarms()?;
            if alarms.is_empty() {
                println!("no alarms");
            }
            for record in alarms {
                println!("{}", record);
                for instance in manager.instances_of(record.id)? {
                    println!("    {}", instance);
                }
            }
            if let Some(next) = manager.next_alarm()? {
                println!("next: {}", next);
            }
        }
        WorkerCommand::Help => println!("{}", USAGE),
    }
    Ok(())
}

fn set_enabled(manager: &AlarmStateManager, alarm_id: AlarmId, enabled: bool) -> anyhow::Result<()> {
    let Some(mut record) = manager.alarms()?.into_iter().find(|r| r.id == alarm_id) else {
        println!("no alarm {}", alarm_id);
        return Ok(());
    };
    record.enabled = enabled;
    manager.update_alarm(&record, UpdateKind::Major)?;
    println!("{}", record);
    Ok(())
}
