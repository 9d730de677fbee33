//! The scheduled loop as an explicit state machine.
//!
//! `WaitingForConfig → Idle → RunningCycle → Sleeping → (RunningCycle | Terminated)`.
//! A failed cycle always sleeps one backoff interval before it is retried.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use tracing::{error, info, warn};

use altforge_config::ScheduleConfig;
use altforge_logging::redact_sensitive_data;

use crate::cycle::{CycleReport, CycleRunner};
use crate::registry::TableRegistry;
use crate::retry::{BackoffPolicy, RetryState};
use crate::trigger::Trigger;

pub const DEFAULT_CONFIG_POLL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    WaitingForConfig,
    Idle,
    RunningCycle,
    Sleeping,
    Terminated,
}

/// Wall clock and timer used by the scheduler.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
    async fn sleep(&self, duration: Duration);
}

/// Real time via tokio.
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub trigger: Trigger,
    pub backoff: BackoffPolicy,
    pub config_poll: Duration,
}

impl SchedulerSettings {
    pub fn new(trigger: Trigger) -> Self {
        Self { trigger, backoff: BackoffPolicy::default(), config_poll: DEFAULT_CONFIG_POLL }
    }

    /// Settings from a defaulted schedule section.
    pub fn from_config(schedule: &ScheduleConfig) -> Result<Self> {
        let trigger = Trigger::parse(schedule.time.as_deref().unwrap_or("now"))?;
        let defaults = BackoffPolicy::default();
        let backoff = BackoffPolicy::from_secs(
            schedule.backoff_secs.unwrap_or(defaults.base_delay_ms / 1_000),
            schedule.max_backoff_secs.unwrap_or(defaults.max_delay_ms / 1_000),
        );
        let config_poll = schedule
            .config_poll_secs
            .map(|s| Duration::from_secs(s.max(1)))
            .unwrap_or(DEFAULT_CONFIG_POLL);
        Ok(Self { trigger, backoff, config_poll })
    }
}

/// Drives cycles for a fixed registry of tables.
pub struct Scheduler<R, C = TokioClock> {
    registry: TableRegistry,
    runner: R,
    clock: C,
    settings: SchedulerSettings,
    state: SchedulerState,
    retry: RetryState,
    cycles_completed: u64,
    last_report: Option<CycleReport>,
}

impl<R: CycleRunner> Scheduler<R, TokioClock> {
    pub fn new(registry: TableRegistry, runner: R, settings: SchedulerSettings) -> Self {
        Self::with_clock(registry, runner, settings, TokioClock)
    }
}

impl<R: CycleRunner, C: Clock> Scheduler<R, C> {
    /// Starts in `WaitingForConfig` when required settings are absent, otherwise `Idle`.
    pub fn with_clock(registry: TableRegistry, runner: R, settings: SchedulerSettings, clock: C) -> Self {
        let missing = runner.missing_config();
        let state = if missing.is_empty() {
            SchedulerState::Idle
        } else {
            warn!(missing = %missing.join(", "), "Required configuration is missing");
            SchedulerState::WaitingForConfig
        };
        Self {
            registry,
            runner,
            clock,
            settings,
            state,
            retry: RetryState::default(),
            cycles_completed: 0,
            last_report: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    pub fn retry_state(&self) -> &RetryState {
        &self.retry
    }

    /// Run until `Terminated`. With a daily trigger this never returns.
    pub async fn run(&mut self) {
        info!(tables = self.registry.len(), trigger = ?self.settings.trigger, "Scheduler started");
        while self.state != SchedulerState::Terminated {
            self.step().await;
        }
        info!(cycles = self.cycles_completed, "Scheduler terminated");
    }

    /// Perform one transition and return the new state.
    pub async fn step(&mut self) -> SchedulerState {
        let next = match self.state {
            SchedulerState::WaitingForConfig => self.wait_for_config().await,
            SchedulerState::Idle => {
                if self.settings.trigger.is_one_shot() {
                    SchedulerState::RunningCycle
                } else {
                    SchedulerState::Sleeping
                }
            }
            SchedulerState::Sleeping => {
                let now = self.clock.now();
                let delay = self.settings.trigger.delay_from(&now);
                if let Some(next_run) = self.settings.trigger.next_fire(&now) {
                    info!(next_run = %next_run.format("%Y-%m-%d %H:%M"), "Sleeping until next run");
                }
                self.clock.sleep(delay).await;
                SchedulerState::RunningCycle
            }
            SchedulerState::RunningCycle => self.run_cycle().await,
            SchedulerState::Terminated => SchedulerState::Terminated,
        };
        self.state = next;
        next
    }

    async fn wait_for_config(&mut self) -> SchedulerState {
        let missing = self.runner.missing_config();
        if missing.is_empty() {
            info!("Configuration complete");
            return SchedulerState::Idle;
        }
        warn!(
            missing = %missing.join(", "),
            poll_secs = self.settings.config_poll.as_secs(),
            "Waiting for configuration"
        );
        self.clock.sleep(self.settings.config_poll).await;
        SchedulerState::WaitingForConfig
    }

    async fn run_cycle(&mut self) -> SchedulerState {
        match self.runner.run_cycle(&self.registry).await {
            Ok(report) => {
                self.retry.record_success();
                self.cycles_completed += 1;
                self.last_report = Some(report);
                if self.settings.trigger.is_one_shot() {
                    SchedulerState::Terminated
                } else {
                    SchedulerState::Sleeping
                }
            }
            Err(e) => {
                let message = redact_sensitive_data(&format!("{e:#}"));
                error!(error = %message, "Cycle failed");
                let delay = self.retry.record_failure(&self.settings.backoff, &message);
                self.clock.sleep(delay).await;
                SchedulerState::RunningCycle
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use chrono::{NaiveTime, TimeZone};
    use uuid::Uuid;

    #[derive(Clone)]
    struct FakeClock {
        now: DateTime<Local>,
        sleeps: Arc<Mutex<Vec<Duration>>>,
    }

    impl FakeClock {
        fn at(h: u32, m: u32) -> Self {
            Self {
                now: Local.with_ymd_and_hms(2026, 1, 15, h, m, 0).unwrap(),
                sleeps: Arc::default(),
            }
        }

        fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Clock for FakeClock {
        fn now(&self) -> DateTime<Local> {
            self.now
        }

        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    /// Pops one scripted result per call; succeeds once the script runs out.
    #[derive(Default)]
    struct ScriptedRunner {
        outcomes: Mutex<VecDeque<bool>>,
        missing: Mutex<VecDeque<Vec<String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedRunner {
        fn cycles(outcomes: &[bool]) -> Self {
            Self { outcomes: Mutex::new(outcomes.iter().copied().collect()), ..Default::default() }
        }
    }

    #[async_trait]
    impl CycleRunner for ScriptedRunner {
        fn missing_config(&self) -> Vec<String> {
            self.missing.lock().unwrap().pop_front().unwrap_or_default()
        }

        async fn run_cycle(&self, _registry: &TableRegistry) -> Result<CycleReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.outcomes.lock().unwrap().pop_front().unwrap_or(true) {
                Ok(CycleReport { cycle_id: Uuid::new_v4(), outcomes: Vec::new(), elapsed: Duration::ZERO })
            } else {
                anyhow::bail!("sheets unreachable with Bearer abc.def")
            }
        }
    }

    fn daily(h: u32, m: u32) -> SchedulerSettings {
        SchedulerSettings::new(Trigger::DailyAt(NaiveTime::from_hms_opt(h, m, 0).unwrap()))
    }

    #[tokio::test]
    async fn failing_cycle_backs_off_once_then_retries() {
        let clock = FakeClock::at(8, 0);
        let mut scheduler = Scheduler::with_clock(
            TableRegistry::default(),
            ScriptedRunner::cycles(&[false, true]),
            SchedulerSettings::new(Trigger::Now),
            clock.clone(),
        );
        scheduler.run().await;

        assert_eq!(clock.sleeps(), vec![Duration::from_secs(10)]);
        assert_eq!(scheduler.runner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.state(), SchedulerState::Terminated);
        assert_eq!(scheduler.cycles_completed(), 1);
        assert_eq!(scheduler.retry_state().consecutive_failures, 0);
    }

    #[tokio::test]
    async fn consecutive_failures_grow_the_backoff() {
        let clock = FakeClock::at(8, 0);
        let mut scheduler = Scheduler::with_clock(
            TableRegistry::default(),
            ScriptedRunner::cycles(&[false, false, false, true]),
            SchedulerSettings::new(Trigger::Now),
            clock.clone(),
        );
        scheduler.run().await;
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(10), Duration::from_secs(20), Duration::from_secs(40)]
        );
    }

    #[tokio::test]
    async fn waits_for_missing_config_before_running() {
        let clock = FakeClock::at(8, 0);
        let runner = ScriptedRunner::default();
        runner.missing.lock().unwrap().extend([vec!["GEMINI_API_KEY".to_string()], vec!["GEMINI_API_KEY".to_string()]]);

        let mut scheduler =
            Scheduler::with_clock(TableRegistry::default(), runner, SchedulerSettings::new(Trigger::Now), clock.clone());
        assert_eq!(scheduler.state(), SchedulerState::WaitingForConfig);

        assert_eq!(scheduler.step().await, SchedulerState::WaitingForConfig);
        assert_eq!(scheduler.runner.calls.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.step().await, SchedulerState::Idle);

        scheduler.run().await;
        assert_eq!(clock.sleeps(), vec![DEFAULT_CONFIG_POLL]);
        assert_eq!(scheduler.runner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn daily_trigger_sleeps_until_the_configured_time() {
        let clock = FakeClock::at(8, 0);
        let mut scheduler = Scheduler::with_clock(
            TableRegistry::default(),
            ScriptedRunner::default(),
            daily(9, 0),
            clock.clone(),
        );
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.step().await, SchedulerState::Sleeping);
        assert_eq!(scheduler.step().await, SchedulerState::RunningCycle);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(3600)]);
        assert_eq!(scheduler.step().await, SchedulerState::Sleeping);
        assert_eq!(scheduler.cycles_completed(), 1);
    }

    #[test]
    fn settings_from_config() {
        let schedule = ScheduleConfig {
            time: Some("07:15".into()),
            backoff_secs: Some(5),
            max_backoff_secs: Some(50),
            config_poll_secs: Some(30),
            ..Default::default()
        };
        let settings = SchedulerSettings::from_config(&schedule).unwrap();
        assert_eq!(settings.trigger, Trigger::DailyAt(NaiveTime::from_hms_opt(7, 15, 0).unwrap()));
        assert_eq!(settings.backoff.delay_for(1), Duration::from_secs(5));
        assert_eq!(settings.config_poll, Duration::from_secs(30));

        let bad = ScheduleConfig { time: Some("whenever".into()), ..Default::default() };
        assert!(SchedulerSettings::from_config(&bad).is_err());
    }
}
