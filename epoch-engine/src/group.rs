use stream_core::element::{EpochKey, StreamElement};
use stream_core::fields::GENERATION_TIME_FIELD;

use crate::error::{ReassemblyError, Result};

/// Upper bound on the satellite count announced by the first member.
pub const MAX_GROUP_SIZE: u8 = 127;

/// One GPS epoch under reassembly: the satellite measurements observed so
/// far for a shared `gps_unixtime`, capped at the count announced by the
/// first arrival. Members keep their arrival order; the encoder does not
/// sort them.
#[derive(Debug, Clone)]
pub struct EpochGroup {
    key: EpochKey,
    stream_name: String,
    expected: u8,
    first_generation_ms: i64,
    members: Vec<StreamElement>,
}

impl EpochGroup {
    pub fn open(key: EpochKey, stream_name: impl Into<String>, expected: u8) -> Result<Self> {
        if expected == 0 || expected > MAX_GROUP_SIZE {
            return Err(ReassemblyError::InvalidGroupSize {
                key,
                count: expected as i64,
            });
        }
        Ok(Self {
            key,
            stream_name: stream_name.into(),
            expected,
            first_generation_ms: key,
            members: Vec::with_capacity(expected as usize),
        })
    }

    /// Appends a member. `Ok(true)` exactly when this call completed the
    /// group; a full group rejects further members.
    pub fn add(&mut self, element: StreamElement) -> Result<bool> {
        if self.is_complete() {
            return Err(ReassemblyError::GroupAlreadyFull {
                key: self.key,
                expected: self.expected,
            });
        }
        if self.members.is_empty() {
            // Aging clock for the recent tier. Members replayed without a
            // generation stamp fall back to the epoch instant itself.
            self.first_generation_ms = element
                .long(GENERATION_TIME_FIELD)
                .unwrap_or(self.key);
        }
        self.members.push(element);
        Ok(self.is_complete())
    }

    pub fn is_complete(&self) -> bool {
        self.members.len() == self.expected as usize
    }

    pub fn key(&self) -> EpochKey {
        self.key
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    pub fn expected(&self) -> u8 {
        self.expected
    }

    /// Satellites still unaccounted for; non-zero on a forced emission.
    pub fn missing(&self) -> u8 {
        self.expected - self.members.len() as u8
    }

    pub fn first_generation_ms(&self) -> i64 {
        self.first_generation_ms
    }

    pub fn members(&self) -> &[StreamElement] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn into_members(self) -> Vec<StreamElement> {
        self.members
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_core::element::FieldValue;

    fn member(generation_ms: i64) -> StreamElement {
        StreamElement::builder("gps-feed")
            .field(GENERATION_TIME_FIELD, FieldValue::Long(generation_ms))
            .build()
    }

    #[test]
    fn completes_exactly_on_nth_add() {
        let mut group = EpochGroup::open(1_000, "gps-feed", 3).unwrap();
        assert!(!group.add(member(1)).unwrap());
        assert!(!group.add(member(2)).unwrap());
        assert!(group.add(member(3)).unwrap());
        assert!(group.is_complete());
        assert_eq!(group.missing(), 0);
    }

    #[test]
    fn rejects_member_when_full() {
        let mut group = EpochGroup::open(1_000, "gps-feed", 1).unwrap();
        assert!(group.add(member(1)).unwrap());
        let err = group.add(member(2)).unwrap_err();
        assert!(matches!(err, ReassemblyError::GroupAlreadyFull { .. }));
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn rejects_count_out_of_range() {
        assert!(matches!(
            EpochGroup::open(1_000, "gps-feed", 0),
            Err(ReassemblyError::InvalidGroupSize { count: 0, .. })
        ));
        assert!(matches!(
            EpochGroup::open(1_000, "gps-feed", 128),
            Err(ReassemblyError::InvalidGroupSize { count: 128, .. })
        ));
        assert!(EpochGroup::open(1_000, "gps-feed", 127).is_ok());
    }

    #[test]
    fn first_generation_time_is_captured_once() {
        let mut group = EpochGroup::open(1_000, "gps-feed", 2).unwrap();
        group.add(member(5_000)).unwrap();
        group.add(member(9_000)).unwrap();
        assert_eq!(group.first_generation_ms(), 5_000);
    }

    #[test]
    fn missing_generation_time_falls_back_to_epoch() {
        let mut group = EpochGroup::open(1_000, "gps-feed", 2).unwrap();
        group
            .add(StreamElement::builder("gps-feed").build())
            .unwrap();
        assert_eq!(group.first_generation_ms(), 1_000);
    }
}
