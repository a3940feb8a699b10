use chrono::{DateTime, Utc};
use cron::Schedule;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::evaluator::{AlertEvaluator, EvaluationOutcome};
use crate::store::StoreError;

/// Parses a crontab expression. Five-field (minute-first) expressions get a
/// leading seconds field of `0`.
pub fn parse_schedule(expression: &str) -> Result<Schedule, cron::error::Error> {
    let expression = expression.trim();
    if expression.split_whitespace().count() == 5 {
        Schedule::from_str(&format!("0 {}", expression))
    } else {
        Schedule::from_str(expression)
    }
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Initial,
    Scheduled,
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Scheduled => write!(f, "scheduled"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub cron_expression: String,
    pub next_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Shared {
    // Held for the whole of a pass; passes never overlap.
    gate: tokio::sync::Mutex<()>,
    next_run: Mutex<Option<DateTime<Utc>>>,
    last_run: Mutex<Option<DateTime<Utc>>>,
}

impl Shared {
    fn set_next_run(&self, at: Option<DateTime<Utc>>) {
        *self.next_run.lock().unwrap_or_else(|p| p.into_inner()) = at;
    }

    fn set_last_run(&self, at: DateTime<Utc>) {
        *self.last_run.lock().unwrap_or_else(|p| p.into_inner()) = Some(at);
    }
}

struct Timers {
    periodic: JoinHandle<()>,
    initial: JoinHandle<()>,
}

/// Drives evaluation passes on a cron schedule plus one pass shortly after start.
pub struct Scheduler {
    evaluator: AlertEvaluator,
    schedule: Schedule,
    cron_expression: String,
    initial_delay: Duration,
    shared: Arc<Shared>,
    timers: Mutex<Option<Timers>>,
}

impl Scheduler {
    pub fn new(
        evaluator: AlertEvaluator,
        cron_expression: &str,
        initial_delay: Duration,
    ) -> Result<Self, cron::error::Error> {
        Ok(Self {
            evaluator,
            schedule: parse_schedule(cron_expression)?,
            cron_expression: cron_expression.trim().to_string(),
            initial_delay,
            shared: Arc::new(Shared::default()),
            timers: Mutex::new(None),
        })
    }

    /// Arms the periodic and initial timers. No-op when already running.
    pub fn start(&self) {
        let mut timers = self.timers.lock().unwrap_or_else(|p| p.into_inner());
        if timers.is_some() {
            warn!("Scheduler is already running");
            return;
        }

        let periodic = {
            let evaluator = self.evaluator.clone();
            let shared = self.shared.clone();
            let schedule = self.schedule.clone();
            tokio::spawn(async move {
                loop {
                    let Some(next) = schedule.upcoming(Utc).next() else {
                        warn!("Schedule has no upcoming runs, periodic evaluation ends");
                        shared.set_next_run(None);
                        break;
                    };
                    shared.set_next_run(Some(next));

                    let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                    tokio::time::sleep(wait).await;

                    spawn_pass(evaluator.clone(), shared.clone(), Trigger::Scheduled).await;
                }
            })
        };

        let initial = {
            let evaluator = self.evaluator.clone();
            let shared = self.shared.clone();
            let delay = self.initial_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                spawn_pass(evaluator, shared, Trigger::Initial).await;
            })
        };

        *timers = Some(Timers { periodic, initial });
        info!(
            cron = %self.cron_expression,
            initial_delay_secs = self.initial_delay.as_secs_f64(),
            "Alert evaluation scheduler started"
        );
    }

    /// Disarms the timers. A pass already in flight runs to completion.
    pub fn stop(&self) {
        let Some(timers) = self
            .timers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
        else {
            return;
        };
        timers.periodic.abort();
        timers.initial.abort();
        self.shared.set_next_run(None);
        info!("Alert evaluation scheduler stopped");
    }

    pub fn status(&self) -> SchedulerStatus {
        let is_running = self
            .timers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_some();
        SchedulerStatus {
            is_running,
            cron_expression: self.cron_expression.clone(),
            next_run: *self.shared.next_run.lock().unwrap_or_else(|p| p.into_inner()),
            last_run: *self.shared.last_run.lock().unwrap_or_else(|p| p.into_inner()),
        }
    }

    /// Runs a pass now, waiting for any pass already in flight to finish first.
    pub async fn run_now(&self) -> Result<Vec<EvaluationOutcome>, StoreError> {
        let _gate = self.shared.gate.lock().await;
        execute(&self.evaluator, &self.shared, Trigger::Manual).await
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs a timer-driven pass on its own task so a panic inside it is logged
/// instead of taking the timer down with it.
async fn spawn_pass(evaluator: AlertEvaluator, shared: Arc<Shared>, trigger: Trigger) {
    let handle = tokio::spawn(async move { run_if_idle(&evaluator, &shared, trigger).await });
    if let Err(e) = handle.await {
        error!(error = %e, %trigger, "Alert evaluation task panicked");
    }
}

/// Returns false when another pass holds the gate and this one was skipped.
async fn run_if_idle(evaluator: &AlertEvaluator, shared: &Shared, trigger: Trigger) -> bool {
    let Ok(_gate) = shared.gate.try_lock() else {
        warn!(%trigger, "Previous alert evaluation still running, skipping this run");
        return false;
    };
    let _ = execute(evaluator, shared, trigger).await;
    true
}

async fn execute(
    evaluator: &AlertEvaluator,
    shared: &Shared,
    trigger: Trigger,
) -> Result<Vec<EvaluationOutcome>, StoreError> {
    let span = info_span!("evaluation", run_id = %Uuid::new_v4(), %trigger);
    async {
        shared.set_last_run(Utc::now());
        let started = Instant::now();

        info!("Running alert evaluation");
        let result = evaluator.evaluate_all().await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(outcomes) => {
                let triggered = outcomes
                    .iter()
                    .filter(|o| o.success && o.is_triggered == Some(true))
                    .count();
                let failed = outcomes.iter().filter(|o| !o.success).count();
                info!(
                    duration_ms,
                    evaluated = outcomes.len(),
                    triggered,
                    failed,
                    "Alert evaluation completed"
                );
            }
            Err(e) => {
                error!(duration_ms, error = %e, "Alert evaluation failed");
            }
        }
        result
    }
    .instrument(span)
    .await
}
