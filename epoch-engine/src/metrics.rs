use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

#[derive(Default)]
struct ReassemblyMetricsInner {
    elements_in: AtomicU64,
    frames_out: AtomicU64,
    elements_dropped: AtomicU64,
    groups_dropped: AtomicU64,
    members_demoted: AtomicU64,
    stale_flushes: AtomicU64,
}

#[derive(Clone, Default)]
pub struct ReassemblyMetrics {
    inner: Arc<ReassemblyMetricsInner>,
}

pub struct ReassemblyMetricsSnapshot {
    pub elements_in: u64,
    pub frames_out: u64,
    pub elements_dropped: u64,
    pub groups_dropped: u64,
    pub members_demoted: u64,
    pub stale_flushes: u64,
}

impl ReassemblyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_elements(&self) {
        self.inner.elements_in.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_frames(&self) {
        self.inner.frames_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dropped_elements(&self) {
        self.inner.elements_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dropped_groups(&self) {
        self.inner.groups_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_demoted(&self, delta: u64) {
        if delta > 0 {
            self.inner.members_demoted.fetch_add(delta, Ordering::Relaxed);
        }
    }

    pub fn inc_stale_flushes(&self) {
        self.inner.stale_flushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReassemblyMetricsSnapshot {
        ReassemblyMetricsSnapshot {
            elements_in: self.inner.elements_in.load(Ordering::Relaxed),
            frames_out: self.inner.frames_out.load(Ordering::Relaxed),
            elements_dropped: self.inner.elements_dropped.load(Ordering::Relaxed),
            groups_dropped: self.inner.groups_dropped.load(Ordering::Relaxed),
            members_demoted: self.inner.members_demoted.load(Ordering::Relaxed),
            stale_flushes: self.inner.stale_flushes.load(Ordering::Relaxed),
        }
    }
}
