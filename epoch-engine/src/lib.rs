//! GPS satellite epoch reassembly engine.
//!
//! Satellite measurements arrive one element per space vehicle, out of order
//! relative to their logical epoch. The engine correlates them by
//! `gps_unixtime`, waits for the satellite count announced by the first
//! arrival or for a configured grace window, then emits one raw binary frame
//! per epoch. Memory stays bounded through two buffer tiers: live epochs age
//! against wall clock, backlog epochs against their own timestamps, and a
//! debounced timer drains the backlog tier in batches.

mod error;
mod frame;
mod group;
mod metrics;
mod scheduler;
mod store;

pub use error::{ReassemblyError, Result};
pub use frame::{checksum, encode_frame, encode_output, FRAME_OVERHEAD_LEN, MEMBER_RECORD_LEN};
pub use group::{EpochGroup, MAX_GROUP_SIZE};
pub use metrics::{ReassemblyMetrics, ReassemblyMetricsSnapshot};
pub use scheduler::EvictionScheduler;
pub use store::{RecentSweep, Tier, WindowedGroupStore};

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::{error, info, warn};
use parking_lot::Mutex;
use sensor_api::{
    HealthStatus, SensorError, SensorHealth, SensorResult, StreamSink, VirtualSensor,
};
use stream_core::{
    config::ReassemblyConfig,
    element::{EpochKey, StreamElement},
    fields::{GENERATION_TIME_FIELD, GPS_TIME_FIELD},
};
use tokio::runtime::Runtime;

pub struct ReassemblyEngine {
    inner: Arc<ReassemblyInner>,
}

impl ReassemblyEngine {
    pub fn new(config: ReassemblyConfig, sink: Arc<dyn StreamSink>) -> Self {
        Self {
            inner: Arc::new(ReassemblyInner::new(config, sink)),
        }
    }

    pub fn metrics(&self) -> ReassemblyMetrics {
        self.inner.metrics.clone()
    }
}

impl VirtualSensor for ReassemblyEngine {
    fn initialize(&self) -> SensorResult<()> {
        self.inner.initialize()
    }

    fn on_element(&self, element: StreamElement) {
        ReassemblyInner::handle_element(&self.inner, element);
    }

    fn shutdown(&self) -> SensorResult<()> {
        self.inner.shutdown()
    }

    fn health(&self) -> SensorHealth {
        self.inner.health.lock().clone()
    }
}

enum EngineRuntimeState {
    Stopped,
    Running {
        runtime: Runtime,
        scheduler: Arc<EvictionScheduler>,
    },
}

struct ReassemblyInner {
    config: ReassemblyConfig,
    window_ms: i64,
    sink: Arc<dyn StreamSink>,
    store: Mutex<WindowedGroupStore>,
    state: Mutex<EngineRuntimeState>,
    health: Mutex<SensorHealth>,
    metrics: ReassemblyMetrics,
}

impl ReassemblyInner {
    fn new(config: ReassemblyConfig, sink: Arc<dyn StreamSink>) -> Self {
        let window_ms = config.window_ms();
        Self {
            config,
            window_ms,
            sink,
            store: Mutex::new(WindowedGroupStore::new(window_ms)),
            state: Mutex::new(EngineRuntimeState::Stopped),
            health: Mutex::new(SensorHealth::default()),
            metrics: ReassemblyMetrics::new(),
        }
    }

    fn initialize(&self) -> SensorResult<()> {
        let mut state = self.state.lock();
        if matches!(*state, EngineRuntimeState::Running { .. }) {
            return Err(SensorError::AlreadyRunning);
        }
        let runtime = Runtime::new().map_err(|err| SensorError::Failure { source: err.into() })?;
        let scheduler = Arc::new(EvictionScheduler::new(
            runtime.handle().clone(),
            Duration::from_millis(self.window_ms as u64),
        ));
        *state = EngineRuntimeState::Running { runtime, scheduler };
        drop(state);
        self.set_health(HealthStatus::Ready, Some("buffering".to_string()));
        info!(
            "[{}] reassembly engine started (window {} ms)",
            self.config.label, self.window_ms
        );
        Ok(())
    }

    fn handle_element(inner: &Arc<Self>, element: StreamElement) {
        inner.metrics.inc_elements();
        let key = match element.long(GPS_TIME_FIELD) {
            Ok(key) => key,
            Err(err) => {
                inner.metrics.inc_dropped_elements();
                warn!(
                    "[{}] dropping element without epoch key: {err}",
                    inner.config.label
                );
                return;
            }
        };
        let scheduler = {
            let state = inner.state.lock();
            match &*state {
                EngineRuntimeState::Running { scheduler, .. } => Arc::clone(scheduler),
                EngineRuntimeState::Stopped => {
                    inner.metrics.inc_dropped_elements();
                    warn!(
                        "[{}] dropping element for epoch {key}: engine not running",
                        inner.config.label
                    );
                    return;
                }
            }
        };
        let now_ms = current_time_ms();
        if key > now_ms - inner.window_ms {
            inner.ingest_recent(key, element, now_ms);
        } else {
            // Backlog epoch: every stale insertion pushes the batched flush
            // out by one full window.
            let flush_target = Arc::clone(inner);
            scheduler.rearm(move || flush_target.flush_stale_fired());
            let reference_ms = element.long(GENERATION_TIME_FIELD).unwrap_or(key);
            inner.ingest_stale(key, element, reference_ms);
        }
    }

    fn ingest_recent(&self, key: EpochKey, element: StreamElement, now_ms: i64) {
        let mut store = self.store.lock();
        match store.ingest(Tier::Recent, key, element) {
            Ok(Some(group)) => self.emit(&mut store, group),
            Ok(None) => {}
            Err(err) => self.drop_element(&err),
        }
        let sweep = store.sweep_recent(now_ms);
        self.apply_sweep(&mut store, sweep);
    }

    fn ingest_stale(&self, key: EpochKey, element: StreamElement, reference_ms: i64) {
        let mut store = self.store.lock();
        match store.ingest(Tier::Stale, key, element) {
            Ok(Some(group)) => self.emit(&mut store, group),
            Ok(None) => {}
            Err(err) => self.drop_element(&err),
        }
        let expired = store.sweep_stale(reference_ms);
        for group in expired {
            self.emit(&mut store, group);
        }
    }

    fn apply_sweep(&self, store: &mut WindowedGroupStore, sweep: RecentSweep) {
        self.metrics.add_demoted(sweep.demoted_members as u64);
        for err in &sweep.errors {
            self.drop_element(err);
        }
        for group in sweep.completed {
            self.emit(store, group);
        }
    }

    /// Timer-fired batched eviction: the whole stale tier goes out,
    /// complete or not.
    fn flush_stale_fired(&self) {
        let mut store = self.store.lock();
        self.metrics.inc_stale_flushes();
        let drained = store.flush_stale();
        if !drained.is_empty() {
            info!(
                "[{}] stale flush: emitting {} epoch(s)",
                self.config.label,
                drained.len()
            );
        }
        for group in drained {
            self.emit(&mut store, group);
        }
    }

    fn shutdown(&self) -> SensorResult<()> {
        let mut state = self.state.lock();
        let (runtime, scheduler) =
            match std::mem::replace(&mut *state, EngineRuntimeState::Stopped) {
                EngineRuntimeState::Running { runtime, scheduler } => (runtime, scheduler),
                EngineRuntimeState::Stopped => return Err(SensorError::NotRunning),
            };
        drop(state);
        {
            let mut store = self.store.lock();
            let recent = store.drain_recent();
            for group in recent {
                self.emit(&mut store, group);
            }
            let stale = store.flush_stale();
            for group in stale {
                self.emit(&mut store, group);
            }
        }
        scheduler.cancel();
        runtime.shutdown_background();
        self.set_health(HealthStatus::Stopped, Some("engine stopped".to_string()));
        info!("[{}] reassembly engine stopped", self.config.label);
        Ok(())
    }

    fn emit(&self, store: &mut WindowedGroupStore, group: EpochGroup) {
        match frame::encode_output(&group, store.recent_len(), store.stale_len()) {
            Ok(element) => {
                self.sink.publish(element);
                self.metrics.inc_frames();
            }
            Err(err) => {
                self.metrics.inc_dropped_groups();
                self.set_health(HealthStatus::Degraded, Some(err.to_string()));
                error!("[{}] dropping epoch {}: {err}", self.config.label, group.key());
            }
        }
    }

    fn drop_element(&self, err: &ReassemblyError) {
        self.metrics.inc_dropped_elements();
        self.set_health(HealthStatus::Degraded, Some(err.to_string()));
        warn!("[{}] {err}", self.config.label);
    }

    fn set_health(&self, status: HealthStatus, detail: Option<String>) {
        let mut guard = self.health.lock();
        guard.status = status;
        guard.detail = detail;
    }
}

fn current_time_ms() -> i64 {
    Utc::now().timestamp_millis()
}
