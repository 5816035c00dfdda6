// dbsync/src/scheduler/mod.rs
use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDateTime, NaiveTime, Timelike};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::sync::SyncOrchestrator;

/// When a trigger fires, in local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Once a day at the given time.
    DailyAt(NaiveTime),
    /// At minute 0 of every hour divisible by the step (cron `0 */n * * *`).
    EveryHours(u32),
}

impl Cadence {
    /// First fire time strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        match *self {
            Cadence::DailyAt(time) => {
                let today = now.date().and_time(time);
                if today > now { today } else { today + Duration::days(1) }
            }
            Cadence::EveryHours(step) => {
                let step = step.clamp(1, 24);
                let hour_start = now.date().and_time(NaiveTime::MIN) + Duration::hours(i64::from(now.hour()));
                let mut next = hour_start + Duration::hours(1);
                // Hour 0 always matches, so this ends within a day.
                while next.hour() % step != 0 {
                    next += Duration::hours(1);
                }
                next
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// pull → apply → table sync → export → publish.
    FullSync,
    /// Export only, nothing is published.
    Backup,
    /// pull then apply.
    SchemaRefresh,
}

impl Job {
    pub async fn run(self, orchestrator: &SyncOrchestrator) -> Result<()> {
        match self {
            Job::FullSync => {
                orchestrator.full_sync().await?;
            }
            Job::Backup => {
                orchestrator.export_to_file().await?;
            }
            Job::SchemaRefresh => {
                // The apply runs even when the pull fails, against whatever
                // is checked out.
                orchestrator.pull_latest_from_remote().await;
                orchestrator.apply_schema().await;
            }
        }
        Ok(())
    }

    fn description(self) -> &'static str {
        match self {
            Job::FullSync => "Running scheduled database sync...",
            Job::Backup => "Running hourly backup...",
            Job::SchemaRefresh => "Pulling latest schema from remote...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub name: &'static str,
    pub cadence: Cadence,
    pub job: Job,
}

/// The three triggers of the sync service.
pub fn default_triggers(daily_sync_time: NaiveTime) -> Vec<Trigger> {
    vec![
        Trigger {
            name: "daily-full-sync",
            cadence: Cadence::DailyAt(daily_sync_time),
            job: Job::FullSync,
        },
        Trigger {
            name: "hourly-backup",
            cadence: Cadence::EveryHours(1),
            job: Job::Backup,
        },
        Trigger {
            name: "schema-refresh",
            cadence: Cadence::EveryHours(4),
            job: Job::SchemaRefresh,
        },
    ]
}

/// Fires each trigger from its own timer task against one shared
/// orchestrator.
///
/// Timers are independent, but fired jobs take a shared lock, so a job that
/// overlaps another waits for it instead of racing on the tracked directory.
/// Each trigger has at most one run pending or running; a fire that finds
/// one is skipped.
pub struct Scheduler {
    orchestrator: Arc<SyncOrchestrator>,
    runners: Vec<TriggerRunner>,
    job_lock: Arc<Mutex<()>>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<SyncOrchestrator>) -> Self {
        let job_lock = Arc::new(Mutex::new(()));
        let runners = default_triggers(orchestrator.settings().daily_sync_time)
            .into_iter()
            .map(|trigger| TriggerRunner {
                trigger,
                orchestrator: Arc::clone(&orchestrator),
                job_lock: Arc::clone(&job_lock),
                in_flight: Arc::new(AtomicBool::new(false)),
            })
            .collect();
        Self {
            orchestrator,
            runners,
            job_lock,
        }
    }

    pub fn triggers(&self) -> Vec<Trigger> {
        self.runners.iter().map(|runner| runner.trigger).collect()
    }

    /// Runs `trigger`'s job now, under the job lock, and waits for it.
    pub async fn fire(&self, trigger: Trigger) -> Result<()> {
        run_job(Arc::clone(&self.orchestrator), Arc::clone(&self.job_lock), trigger).await
    }

    /// Queues a run of the named trigger the way its timer does.
    ///
    /// Returns `None` when the name is unknown or a run of that trigger is
    /// already pending.
    pub fn dispatch(&self, trigger_name: &str) -> Option<JoinHandle<()>> {
        self.runners
            .iter()
            .find(|runner| runner.trigger.name == trigger_name)?
            .dispatch()
    }

    /// Spawns one timer task per trigger.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        self.runners
            .iter()
            .map(|runner| {
                info!(trigger = runner.trigger.name, cadence = ?runner.trigger.cadence, "Registering trigger");
                tokio::spawn(trigger_loop(runner.clone()))
            })
            .collect()
    }

    /// Starts the timers and returns on Ctrl-C. Jobs still running are not
    /// waited for.
    pub async fn run_until_interrupted(&self) -> Result<()> {
        info!("Starting database sync scheduler...");
        let handles = self.start();
        info!("✅ Scheduler started successfully!");

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for interrupt signal")?;

        info!("Shutting down scheduler...");
        for handle in handles {
            handle.abort();
        }
        Ok(())
    }
}

#[derive(Clone)]
struct TriggerRunner {
    trigger: Trigger,
    orchestrator: Arc<SyncOrchestrator>,
    job_lock: Arc<Mutex<()>>,
    in_flight: Arc<AtomicBool>,
}

impl TriggerRunner {
    fn dispatch(&self) -> Option<JoinHandle<()>> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            warn!(trigger = self.trigger.name, "Previous run still pending, skipping");
            return None;
        }

        let in_flight = InFlight(Arc::clone(&self.in_flight));
        let orchestrator = Arc::clone(&self.orchestrator);
        let job_lock = Arc::clone(&self.job_lock);
        let trigger = self.trigger;
        Some(tokio::spawn(async move {
            let _in_flight = in_flight;
            if let Err(e) = run_job(orchestrator, job_lock, trigger).await {
                error!(trigger = trigger.name, error = format!("{:#}", e), "Scheduled job failed");
            }
        }))
    }
}

/// Clears a trigger's in-flight flag when its run ends, even by panic or abort.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn trigger_loop(runner: TriggerRunner) {
    let cadence = runner.trigger.cadence;
    let mut next = cadence.next_after(Local::now().naive_local());
    loop {
        debug!(trigger = runner.trigger.name, next = %next, "Next run scheduled");
        let wait = (next - Local::now().naive_local()).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        runner.dispatch();
        next = following_slot(cadence, next, Local::now().naive_local());
    }
}

/// The slot after the one that just fired. Slots already past at `now` are
/// skipped, and a timer that wakes slightly early never repeats `fired`.
fn following_slot(cadence: Cadence, fired: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
    cadence.next_after(fired.max(now))
}

async fn run_job(orchestrator: Arc<SyncOrchestrator>, job_lock: Arc<Mutex<()>>, trigger: Trigger) -> Result<()> {
    let _guard = job_lock.lock().await;
    info!(trigger = trigger.name, "{}", trigger.job.description());
    trigger.job.run(&orchestrator).await
}
