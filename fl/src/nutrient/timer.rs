//! Nutrient countdown timers
//!
//! A timer is a spawned tokio task driven by `tokio::time::interval` that
//! calls a [`Tick`] step once per period. Ticks are strictly sequential: the
//! next period is only observed after the previous tick (and its write) has
//! returned. [`schedule`] hands back a [`TimerHandle`]; cancelling or dropping
//! the handle stops the timer.
//!
//! [`PlantFocus`] holds the timer for the currently viewed plant. Selecting a
//! plant cancels the previous timer first, so a focus never runs more than one.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::{ActiveNutrientEffect, PlantInstance};
use crate::error::EngineError;
use crate::state::StateManager;

use super::effects::{additions_since, decay};

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing changed since the last write; no write issued
    Unchanged,
    /// The new state was written
    Persisted,
    /// The write failed; the next tick retries
    PersistFailed,
}

/// A step executed once per timer period
#[async_trait]
pub trait Tick: Send + 'static {
    async fn tick(&mut self) -> TickOutcome;

    /// Re-read any externally changed state before the next tick
    async fn reload(&mut self) {}
}

#[derive(Debug)]
enum TimerControl {
    Reload,
    Stop,
}

/// Cancellation handle for a scheduled timer. Dropping it stops the timer.
#[derive(Debug)]
pub struct TimerHandle {
    task: Option<JoinHandle<()>>,
    control: mpsc::Sender<TimerControl>,
}

impl TimerHandle {
    /// Stop the timer between ticks, letting an in-flight write finish
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            if self.control.send(TimerControl::Stop).await.is_err() {
                task.abort();
            }
            let _ = task.await;
        }
    }

    /// Abort the timer immediately and wait until its task has exited
    pub async fn cancel(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // Cancelled is the expected outcome
            let _ = task.await;
        }
    }

    /// Ask the timer to reload its state before the next tick
    pub async fn reload(&self) {
        if self.control.send(TimerControl::Reload).await.is_err() {
            debug!("TimerHandle::reload: timer already stopped");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Keeps a live-timer count accurate for as long as the timer future exists
struct LiveGuard(Option<Arc<AtomicUsize>>);

impl LiveGuard {
    fn new(live: Option<Arc<AtomicUsize>>) -> Self {
        if let Some(counter) = &live {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        Self(live)
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        if let Some(counter) = &self.0 {
            counter.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Run `tick` every `period`, starting one period from now.
/// Must be called inside a tokio runtime.
pub fn schedule<T: Tick>(tick: T, period: Duration, live: Option<Arc<AtomicUsize>>) -> TimerHandle {
    debug!(?period, "schedule: called");
    let (control, control_rx) = mpsc::channel(8);
    let guard = LiveGuard::new(live);

    let task = tokio::spawn(async move {
        let _guard = guard;
        run_timer(tick, period, control_rx).await;
    });

    TimerHandle {
        task: Some(task),
        control,
    }
}

async fn run_timer<T: Tick>(mut tick: T, period: Duration, mut control_rx: mpsc::Receiver<TimerControl>) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    // A slow write delays the schedule rather than bursting to catch up
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let outcome = tick.tick().await;
                debug!(?outcome, "run_timer: tick");
            }

            control = control_rx.recv() => match control {
                Some(TimerControl::Reload) => tick.reload().await,
                Some(TimerControl::Stop) | None => {
                    debug!("run_timer: stopping");
                    break;
                }
            }
        }
    }
}

/// Counts down one plant's active nutrient effects and persists changes
pub struct NutrientTicker {
    state: StateManager,
    plant_id: String,
    local: Vec<ActiveNutrientEffect>,
    last_persisted: Vec<ActiveNutrientEffect>,
    tx: watch::Sender<Vec<ActiveNutrientEffect>>,
}

impl NutrientTicker {
    /// Read the plant and start from its stored effects
    pub async fn load(state: StateManager, plant_id: &str) -> Result<Self, EngineError> {
        debug!(%plant_id, "NutrientTicker::load: called");
        let plant: PlantInstance = state.get_required(plant_id).await?;
        Ok(Self::from_plant(state, &plant))
    }

    pub fn from_plant(state: StateManager, plant: &PlantInstance) -> Self {
        let (tx, _) = watch::channel(plant.active_nutrients.clone());
        Self {
            state,
            plant_id: plant.id.clone(),
            local: plant.active_nutrients.clone(),
            last_persisted: plant.active_nutrients.clone(),
            tx,
        }
    }

    /// Receive the local effect list after every tick
    pub fn subscribe(&self) -> watch::Receiver<Vec<ActiveNutrientEffect>> {
        self.tx.subscribe()
    }

    /// Current local effect list
    pub fn effects(&self) -> &[ActiveNutrientEffect] {
        &self.local
    }

    pub fn plant_id(&self) -> &str {
        &self.plant_id
    }

    /// Decay by one second, publish, then write only if the list changed.
    /// Effects applied to the stored plant since the last write are kept.
    pub async fn step(&mut self) -> TickOutcome {
        self.local = decay(&self.local, 1);

        if self.local == self.last_persisted {
            self.tx.send_replace(self.local.clone());
            return TickOutcome::Unchanged;
        }

        let stored = match self.state.get_required::<PlantInstance>(&self.plant_id).await {
            Ok(plant) => plant.active_nutrients,
            Err(e) => {
                self.tx.send_replace(self.local.clone());
                warn!(plant_id = %self.plant_id, error = %e, "Failed to read plant before countdown write");
                return TickOutcome::PersistFailed;
            }
        };
        let added = additions_since(&stored, &self.last_persisted);
        if !added.is_empty() {
            debug!(plant_id = %self.plant_id, count = added.len(), "NutrientTicker::step: merging applied effects");
            self.local.extend(added);
        }
        // Display updates before the write completes
        self.tx.send_replace(self.local.clone());

        let patch = json!({ "active_nutrients": self.local });
        match self
            .state
            .update_fields::<PlantInstance>(&self.plant_id, patch)
            .await
        {
            Ok(_) => {
                self.last_persisted = self.local.clone();
                if self.local.is_empty() {
                    info!(plant_id = %self.plant_id, "All nutrient effects expired");
                }
                TickOutcome::Persisted
            }
            Err(e) => {
                warn!(plant_id = %self.plant_id, error = %e, "Failed to persist nutrient countdown");
                TickOutcome::PersistFailed
            }
        }
    }

    /// Replace local state with what is stored
    pub async fn refresh(&mut self) -> Result<(), EngineError> {
        let plant: PlantInstance = self.state.get_required(&self.plant_id).await?;
        self.local = plant.active_nutrients.clone();
        self.last_persisted = plant.active_nutrients;
        self.tx.send_replace(self.local.clone());
        Ok(())
    }
}

#[async_trait]
impl Tick for NutrientTicker {
    async fn tick(&mut self) -> TickOutcome {
        self.step().await
    }

    async fn reload(&mut self) {
        if let Err(e) = self.refresh().await {
            warn!(plant_id = %self.plant_id, error = %e, "Failed to reload plant effects");
        }
    }
}

/// The currently viewed plant and its countdown timer
pub struct PlantFocus {
    state: StateManager,
    period: Duration,
    live: Arc<AtomicUsize>,
    current: Option<(String, TimerHandle)>,
}

impl PlantFocus {
    pub fn new(state: StateManager, period: Duration) -> Self {
        Self {
            state,
            period,
            live: Arc::new(AtomicUsize::new(0)),
            current: None,
        }
    }

    /// Focus a plant: stop the previous timer, then start one for `plant_id`
    pub async fn select(&mut self, plant_id: &str) -> Result<watch::Receiver<Vec<ActiveNutrientEffect>>, EngineError> {
        debug!(%plant_id, "PlantFocus::select: called");
        self.clear().await;

        let ticker = NutrientTicker::load(self.state.clone(), plant_id).await?;
        let rx = ticker.subscribe();
        let handle = schedule(ticker, self.period, Some(self.live.clone()));
        self.current = Some((plant_id.to_string(), handle));
        info!(%plant_id, "Plant focused");
        Ok(rx)
    }

    /// Stop the current timer, if any
    pub async fn clear(&mut self) {
        if let Some((plant_id, handle)) = self.current.take() {
            handle.stop().await;
            debug!(%plant_id, "PlantFocus::clear: timer stopped");
        }
    }

    /// Reload the focused plant's effects, e.g. after applying a nutrient to it
    pub async fn refresh(&self) {
        if let Some((_, handle)) = &self.current {
            handle.reload().await;
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.current.as_ref().map(|(id, _)| id.as_str())
    }

    /// Number of timers started by this focus that are still running
    pub fn active_timers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}
