//! Two-tier, time-windowed buffer for epochs under reassembly.
//!
//! The recent tier holds epochs collected from live data; its entries age
//! against wall clock from their first member's generation time. The stale
//! tier holds backlog epochs; its entries age against the epoch timestamp
//! itself and leave only through the batched eviction flush. Callers are
//! responsible for mutual exclusion; the store is plain data.

use std::collections::{btree_map::Entry, BTreeMap};

use stream_core::element::{EpochKey, StreamElement};
use stream_core::fields::GPS_NUM_SV_FIELD;

use crate::error::{ReassemblyError, Result};
use crate::group::EpochGroup;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    Recent,
    Stale,
}

/// Outcome of one recent-tier sweep. Demoted members re-enter through the
/// stale ingest path, so a demotion can complete a group; those groups are
/// handed back for emission alongside any per-member failures.
#[derive(Debug, Default)]
pub struct RecentSweep {
    pub completed: Vec<EpochGroup>,
    pub demoted_members: usize,
    pub errors: Vec<ReassemblyError>,
}

pub struct WindowedGroupStore {
    window_ms: i64,
    recent: BTreeMap<EpochKey, EpochGroup>,
    stale: BTreeMap<EpochKey, EpochGroup>,
}

impl WindowedGroupStore {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms,
            recent: BTreeMap::new(),
            stale: BTreeMap::new(),
        }
    }

    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    pub fn stale_len(&self) -> usize {
        self.stale.len()
    }

    /// Looks up or opens the epoch group for `key` in the given tier and
    /// appends the element. A group brought to its expected count is removed
    /// from the tier and returned for encoding.
    pub fn ingest(
        &mut self,
        tier: Tier,
        key: EpochKey,
        element: StreamElement,
    ) -> Result<Option<EpochGroup>> {
        let map = match tier {
            Tier::Recent => &mut self.recent,
            Tier::Stale => &mut self.stale,
        };
        match map.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get_mut().add(element)? {
                    Ok(Some(occupied.remove()))
                } else {
                    Ok(None)
                }
            }
            Entry::Vacant(vacant) => {
                let expected = element
                    .byte(GPS_NUM_SV_FIELD)
                    .map_err(|source| ReassemblyError::Encoding { key, source })?;
                let mut group = EpochGroup::open(key, element.stream_name(), expected)?;
                if group.add(element)? {
                    Ok(Some(group))
                } else {
                    vacant.insert(group);
                    Ok(None)
                }
            }
        }
    }

    /// Demotes every recent group older than the window: the group is
    /// dissolved and each member re-routed into the stale tier through the
    /// normal ingest path, re-grouped by key. Late arrivals in the stale
    /// tier can still complete such a group, so completion is not re-checked
    /// here. A work list keeps this a flat loop no matter how many groups
    /// age out in one pass.
    pub fn sweep_recent(&mut self, now_ms: i64) -> RecentSweep {
        let cutoff = now_ms - self.window_ms;
        let aged: Vec<EpochKey> = self
            .recent
            .iter()
            .filter(|(_, group)| group.first_generation_ms() < cutoff)
            .map(|(key, _)| *key)
            .collect();
        let mut sweep = RecentSweep::default();
        for key in aged {
            let Some(group) = self.recent.remove(&key) else {
                continue;
            };
            for member in group.into_members() {
                sweep.demoted_members += 1;
                match self.ingest(Tier::Stale, key, member) {
                    Ok(Some(completed)) => sweep.completed.push(completed),
                    Ok(None) => {}
                    Err(err) => sweep.errors.push(err),
                }
            }
        }
        sweep
    }

    /// Removes and returns every stale group whose epoch timestamp is older
    /// than the window relative to `reference_ms` (the generation time of
    /// the backlog element that triggered the sweep).
    pub fn sweep_stale(&mut self, reference_ms: i64) -> Vec<EpochGroup> {
        let cutoff = reference_ms - self.window_ms;
        let aged: Vec<EpochKey> = self
            .stale
            .range(..cutoff)
            .map(|(key, _)| *key)
            .collect();
        aged.into_iter()
            .filter_map(|key| self.stale.remove(&key))
            .collect()
    }

    /// Drains the entire stale tier, regardless of entry ages. Fired by the
    /// debounced eviction timer and by the shutdown drain.
    pub fn flush_stale(&mut self) -> Vec<EpochGroup> {
        std::mem::take(&mut self.stale).into_values().collect()
    }

    /// Empties the recent tier. Shutdown path.
    pub fn drain_recent(&mut self) -> Vec<EpochGroup> {
        std::mem::take(&mut self.recent).into_values().collect()
    }

    /// Empties both tiers, recent first; every remaining group is returned
    /// for forced emission.
    pub fn drain(&mut self) -> Vec<EpochGroup> {
        let mut remaining = self.drain_recent();
        remaining.extend(self.flush_stale());
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_core::element::FieldValue;
    use stream_core::fields::{GENERATION_TIME_FIELD, GPS_SPACE_VEHICLE_FIELD, GPS_TIME_FIELD};

    const WINDOW_MS: i64 = 1_000;

    fn member(key: i64, generation_ms: i64, num_sv: u8, sv: u8) -> StreamElement {
        StreamElement::builder("gps-feed")
            .field(GPS_TIME_FIELD, FieldValue::Long(key))
            .field(GENERATION_TIME_FIELD, FieldValue::Long(generation_ms))
            .field(GPS_NUM_SV_FIELD, FieldValue::Byte(num_sv))
            .field(GPS_SPACE_VEHICLE_FIELD, FieldValue::Byte(sv))
            .build()
    }

    fn store() -> WindowedGroupStore {
        WindowedGroupStore::new(WINDOW_MS)
    }

    #[test]
    fn ingest_completes_on_expected_count() {
        let mut store = store();
        assert!(store
            .ingest(Tier::Recent, 100, member(100, 100, 3, 1))
            .unwrap()
            .is_none());
        assert!(store
            .ingest(Tier::Recent, 100, member(100, 101, 3, 2))
            .unwrap()
            .is_none());
        let group = store
            .ingest(Tier::Recent, 100, member(100, 102, 3, 3))
            .unwrap()
            .expect("third member completes the group");
        assert_eq!(group.len(), 3);
        assert_eq!(store.recent_len(), 0);
    }

    #[test]
    fn single_member_group_completes_immediately() {
        let mut store = store();
        let group = store
            .ingest(Tier::Recent, 100, member(100, 100, 1, 1))
            .unwrap()
            .expect("count of one completes at once");
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn invalid_count_leaves_no_group_behind() {
        let mut store = store();
        let err = store
            .ingest(Tier::Recent, 100, member(100, 100, 0, 1))
            .unwrap_err();
        assert!(matches!(err, ReassemblyError::InvalidGroupSize { .. }));
        assert_eq!(store.recent_len(), 0);

        // A later member with a valid count opens a fresh group normally.
        assert!(store
            .ingest(Tier::Recent, 100, member(100, 101, 2, 1))
            .unwrap()
            .is_none());
        assert_eq!(store.recent_len(), 1);
    }

    #[test]
    fn sweep_demotes_members_regrouped_by_key() {
        let mut store = store();
        store
            .ingest(Tier::Recent, 100, member(100, 100, 3, 1))
            .unwrap();
        store
            .ingest(Tier::Recent, 100, member(100, 110, 3, 2))
            .unwrap();

        let sweep = store.sweep_recent(100 + WINDOW_MS + 1);
        assert_eq!(sweep.demoted_members, 2);
        assert!(sweep.completed.is_empty());
        assert!(sweep.errors.is_empty());
        assert_eq!(store.recent_len(), 0);
        assert_eq!(store.stale_len(), 1);

        // The straggler can still complete the re-grouped epoch in stale.
        let group = store
            .ingest(Tier::Stale, 100, member(100, 120, 3, 3))
            .unwrap()
            .expect("stale straggler completes the group");
        assert_eq!(group.len(), 3);
        assert_eq!(store.stale_len(), 0);
    }

    #[test]
    fn sweep_leaves_fresh_groups_alone() {
        let mut store = store();
        store
            .ingest(Tier::Recent, 100, member(100, 100, 3, 1))
            .unwrap();
        let sweep = store.sweep_recent(100 + WINDOW_MS);
        assert_eq!(sweep.demoted_members, 0);
        assert_eq!(store.recent_len(), 1);
    }

    #[test]
    fn demotion_can_complete_a_pending_stale_group() {
        let mut store = store();
        // Backlog members arrived straight into stale, one short.
        store
            .ingest(Tier::Stale, 100, member(100, 100, 2, 1))
            .unwrap();
        // The same epoch also opened in recent and aged out.
        store
            .ingest(Tier::Recent, 100, member(100, 200, 2, 2))
            .unwrap();

        let sweep = store.sweep_recent(200 + WINDOW_MS + 1);
        assert_eq!(sweep.demoted_members, 1);
        assert_eq!(sweep.completed.len(), 1);
        assert_eq!(sweep.completed[0].len(), 2);
        assert_eq!(store.stale_len(), 0);
    }

    #[test]
    fn sweep_stale_ages_by_epoch_key() {
        let mut store = store();
        store
            .ingest(Tier::Stale, 100, member(100, 100, 2, 1))
            .unwrap();
        store
            .ingest(Tier::Stale, 5_000, member(5_000, 5_000, 2, 1))
            .unwrap();

        let expired = store.sweep_stale(100 + WINDOW_MS + 1);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].key(), 100);
        assert_eq!(store.stale_len(), 1);
    }

    #[test]
    fn flush_stale_drains_everything() {
        let mut store = store();
        store
            .ingest(Tier::Stale, 100, member(100, 100, 2, 1))
            .unwrap();
        store
            .ingest(Tier::Stale, 5_000, member(5_000, 5_000, 4, 1))
            .unwrap();
        let drained = store.flush_stale();
        assert_eq!(drained.len(), 2);
        assert_eq!(store.stale_len(), 0);
    }

    #[test]
    fn drain_returns_recent_then_stale() {
        let mut store = store();
        store
            .ingest(Tier::Recent, 100, member(100, 100, 2, 1))
            .unwrap();
        store
            .ingest(Tier::Stale, 50, member(50, 50, 2, 1))
            .unwrap();
        let remaining = store.drain();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].key(), 100);
        assert_eq!(remaining[1].key(), 50);
        assert_eq!(store.recent_len(), 0);
        assert_eq!(store.stale_len(), 0);
    }
}
