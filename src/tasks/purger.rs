//! Purger Task
//!
//! Generic background loop that runs one fallible cleanup operation on a
//! fixed period.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::PurgerError;

type Operation<E> = Arc<dyn Fn() -> Result<usize, E> + Send + Sync + 'static>;

// == Purger Config ==
/// Sweep period and the number of consecutive failures tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgerConfig {
    pub period: Duration,
    /// Consecutive failures that end the loop; 0 is treated as 1
    pub error_budget: u32,
}

impl PurgerConfig {
    pub fn new(period: Duration, error_budget: u32) -> Self {
        Self {
            period,
            error_budget,
        }
    }
}

impl Default for PurgerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(60),
            error_budget: 5,
        }
    }
}

// == Purger State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgerState {
    /// Constructed, not started
    Idle,
    Running,
    /// Stopped on request
    Stopped,
    /// Gave up after exhausting its error budget
    Exhausted,
}

impl PurgerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PurgerState::Stopped | PurgerState::Exhausted)
    }
}

impl fmt::Display for PurgerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PurgerState::Idle => "idle",
            PurgerState::Running => "running",
            PurgerState::Stopped => "stopped",
            PurgerState::Exhausted => "exhausted",
        };
        f.write_str(s)
    }
}

// == Purger Status ==
/// Read-only view of a purger, cheap to clone into request handlers.
#[derive(Debug, Clone)]
pub struct PurgerStatus {
    name: Arc<str>,
    state: watch::Receiver<PurgerState>,
}

impl PurgerStatus {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PurgerState {
        *self.state.borrow()
    }
}

// == Purger ==
/// Runs an operation every `period` until stopped or until `error_budget`
/// consecutive invocations fail.
///
/// Lifecycle: `Idle -> Running -> {Stopped, Exhausted}`. Both end states are
/// final; a new purger has to be built to resume sweeping.
///
/// # Example
/// ```ignore
/// let store = Arc::new(MemoryNoteStore::new());
/// let sweeper = Arc::clone(&store);
/// let mut purger = Purger::new("notes", PurgerConfig::default(), move || {
///     sweeper.clear_expired()
/// });
/// purger.start()?;
/// // Later, during shutdown:
/// purger.stop();
/// purger.done().await;
/// ```
pub struct Purger<E> {
    name: Arc<str>,
    config: PurgerConfig,
    op: Option<Operation<E>>,
    stop: watch::Sender<bool>,
    state: Arc<watch::Sender<PurgerState>>,
    failures: Arc<AtomicU32>,
}

impl<E> Purger<E>
where
    E: fmt::Display + Send + 'static,
{
    // == Constructor ==
    /// Creates an idle purger wrapping `op`.
    pub fn new<F>(name: impl Into<String>, config: PurgerConfig, op: F) -> Self
    where
        F: Fn() -> Result<usize, E> + Send + Sync + 'static,
    {
        let (stop, _) = watch::channel(false);
        let (state, _) = watch::channel(PurgerState::Idle);
        Self {
            name: Arc::from(name.into()),
            config,
            op: Some(Arc::new(op)),
            stop,
            state: Arc::new(state),
            failures: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &PurgerConfig {
        &self.config
    }

    pub fn state(&self) -> PurgerState {
        *self.state.borrow()
    }

    /// Current run of consecutive failed sweeps.
    pub fn consecutive_failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> PurgerStatus {
        PurgerStatus {
            name: Arc::clone(&self.name),
            state: self.state.subscribe(),
        }
    }

    // == Start ==
    /// Spawns the sweep loop on the current tokio runtime.
    ///
    /// The first sweep happens one period after start. Fails if the period is
    /// zero or the purger already left the idle state.
    pub fn start(&mut self) -> Result<(), PurgerError> {
        if self.config.period.is_zero() {
            return Err(PurgerError::InvalidPeriod(self.name.to_string()));
        }
        let op = match self.op.take() {
            Some(op) if self.state() == PurgerState::Idle => op,
            _ => return Err(PurgerError::AlreadyStarted(self.name.to_string())),
        };

        self.state.send_replace(PurgerState::Running);

        let sweep = SweepLoop {
            name: Arc::clone(&self.name),
            config: self.config,
            op,
            stop: self.stop.subscribe(),
            state: Arc::clone(&self.state),
            failures: Arc::clone(&self.failures),
        };
        tokio::spawn(sweep.run());
        Ok(())
    }

    // == Stop ==
    /// Asks the loop to exit at the next tick boundary. A sweep already in
    /// flight is allowed to finish. Calling this more than once is harmless.
    pub fn stop(&self) {
        let never_started = self.state.send_if_modified(|state| {
            if *state == PurgerState::Idle {
                *state = PurgerState::Stopped;
                true
            } else {
                false
            }
        });
        if never_started {
            info!("Purger '{}' stopped before it was started", self.name);
            return;
        }
        self.stop.send_replace(true);
    }

    // == Done ==
    /// Resolves once the loop has fully exited, whether it was stopped or ran
    /// out of error budget. Resolves immediately for a purger that never
    /// started but was stopped; never resolves for one still idle.
    pub async fn done(&self) {
        let mut state = self.state.subscribe();
        // The sender lives in `self`, so `wait_for` can only return Ok here.
        let _ = state.wait_for(|s| s.is_terminal()).await;
    }
}

impl<E> Drop for Purger<E> {
    fn drop(&mut self) {
        self.stop.send_replace(true);
    }
}

impl<E> fmt::Debug for Purger<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Purger")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &*self.state.borrow())
            .field("failures", &self.failures.load(Ordering::SeqCst))
            .finish()
    }
}

// == Terminal Guard ==
struct TerminalGuard(Arc<watch::Sender<PurgerState>>);

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.0.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = PurgerState::Stopped;
            true
        });
    }
}

// == Sweep Loop ==
struct SweepLoop<E> {
    name: Arc<str>,
    config: PurgerConfig,
    op: Operation<E>,
    stop: watch::Receiver<bool>,
    state: Arc<watch::Sender<PurgerState>>,
    failures: Arc<AtomicU32>,
}

impl<E> SweepLoop<E>
where
    E: fmt::Display + Send + 'static,
{
    async fn run(mut self) {
        // Publishes a terminal state even if the loop unwinds, so `done` resolves.
        let _guard = TerminalGuard(Arc::clone(&self.state));

        let period = self.config.period;
        let budget = self.config.error_budget.max(1);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Purger '{}' started: period={:?}, error_budget={}",
            self.name, period, budget
        );

        let final_state = loop {
            if *self.stop.borrow() {
                break PurgerState::Stopped;
            }

            tokio::select! {
                biased;
                changed = self.stop.changed() => {
                    // Err means the owning Purger was dropped.
                    if changed.is_err() || *self.stop.borrow() {
                        break PurgerState::Stopped;
                    }
                }
                _ = ticker.tick() => {
                    if self.sweep().await >= budget {
                        break PurgerState::Exhausted;
                    }
                }
            }
        };

        match final_state {
            PurgerState::Exhausted => error!(
                "Purger '{}' exhausted its error budget after {} consecutive failures; sweeping has stopped",
                self.name, budget
            ),
            _ => info!("Purger '{}' stopped", self.name),
        }
        self.state.send_replace(final_state);
    }

    /// Runs the operation once and returns the updated failure streak.
    async fn sweep(&self) -> u32 {
        let op = Arc::clone(&self.op);
        let outcome = tokio::task::spawn_blocking(move || op())
            .await
            .map_err(|join_err| format!("sweep task panicked: {join_err}"))
            .and_then(|res| res.map_err(|e| e.to_string()));

        match outcome {
            Ok(removed) => {
                self.failures.store(0, Ordering::SeqCst);
                if removed > 0 {
                    info!("Purger '{}': removed {} entries", self.name, removed);
                } else {
                    debug!("Purger '{}': nothing to remove", self.name);
                }
                0
            }
            Err(msg) => {
                let streak = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
                warn!(
                    "Purger '{}': sweep failed ({} in a row): {}",
                    self.name, streak, msg
                );
                streak
            }
        }
    }
}
