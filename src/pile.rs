//! Slot allocator for concurrently-live requests
//!
//! Gives each live request (e.g. an in-flight disk sector) the smallest free
//! integer slot under a parent attribute, so every slot can be rendered as
//! its own lane:
//!
//! ```text
//! disk/sda/000/status   ████████░░░░░░████
//! disk/sda/001/status      ██████████
//! disk/sda/002/status         ███
//! ```
//!
//! Released slots go to a min-heap, so the lowest one is reused first.
//! Removal nulls the slot's attributes before the slot is handed out again,
//! so a slot never carries two open intervals.

use crate::config::StateConfig;
use crate::state_system::{Quark, Result, StateHistoryBuilder, StateValue};
use fnv::FnvHashMap;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::warn;

#[derive(Debug, Clone)]
struct Occupant {
    slot: u64,
    /// Attributes written for this occupant, nulled on removal
    written: Vec<Quark>,
}

impl Occupant {
    fn note(&mut self, written: Vec<Quark>) {
        for quark in written {
            if !self.written.contains(&quark) {
                self.written.push(quark);
            }
        }
    }
}

/// Smallest-available slot allocator writing into a state history
///
/// # Example
/// ```
/// use estado::pile::Pile;
/// use estado::state_system::{StateHistoryBuilder, StateValue};
///
/// let mut builder = StateHistoryBuilder::new();
/// let disk = builder.quark_for_str("host/disk/sda")?;
/// let mut pile = Pile::new(disk, 3);
///
/// let slot = pile.insert(&mut builder, 738_877_456u64, 10, &[("status", StateValue::Long(1001))])?;
/// assert_eq!(slot, 0);
/// pile.remove(&mut builder, &738_877_456u64, 20)?;
/// # Ok::<(), estado::state_system::StateError>(())
/// ```
#[derive(Debug)]
pub struct Pile<K> {
    parent: Quark,
    slot_width: usize,
    occupants: FnvHashMap<K, Occupant>,
    free: BinaryHeap<Reverse<u64>>,
    next_slot: u64,
}

impl<K: Hash + Eq + Clone + Debug> Pile<K> {
    /// Allocator placing slot attributes under `parent`, named with
    /// `slot_width` zero-padded digits
    pub fn new(parent: Quark, slot_width: usize) -> Self {
        Pile {
            parent,
            slot_width,
            occupants: FnvHashMap::default(),
            free: BinaryHeap::new(),
            next_slot: 0,
        }
    }

    pub fn from_config(parent: Quark, config: &StateConfig) -> Self {
        Self::new(parent, config.slot_width)
    }

    /// Number of live keys
    pub fn occupancy(&self) -> usize {
        self.occupants.len()
    }

    pub fn slot_of(&self, key: &K) -> Option<u64> {
        self.occupants.get(key).map(|o| o.slot)
    }

    /// Attribute name of `slot` (e.g. `007`)
    pub fn slot_name(&self, slot: u64) -> String {
        format!("{:0width$}", slot, width = self.slot_width)
    }

    fn allocate(&mut self) -> u64 {
        match self.free.pop() {
            Some(Reverse(slot)) => slot,
            None => {
                let slot = self.next_slot;
                self.next_slot += 1;
                slot
            }
        }
    }

    /// Track `key` in the smallest free slot and write `payload` under it.
    ///
    /// Each payload entry is a sub-attribute name and its value; an empty
    /// name writes the slot attribute itself. Re-inserting a live key
    /// rewrites its payload in the slot it already holds.
    ///
    /// If a write fails partway, the entries already written for a new key
    /// are nulled at `time` and its slot is released, so no open attribute
    /// is left behind in a free slot. A live key keeps its slot and every
    /// attribute written so far is nulled on its removal.
    pub fn insert(
        &mut self,
        builder: &mut StateHistoryBuilder,
        key: K,
        time: u64,
        payload: &[(&str, StateValue)],
    ) -> Result<u64> {
        let (slot, fresh) = match self.occupants.get(&key) {
            Some(occupant) => (occupant.slot, false),
            None => (self.allocate(), true),
        };

        let mut written = Vec::with_capacity(payload.len());
        let outcome = self.write_payload(builder, slot, time, payload, &mut written);
        if let Err(err) = outcome {
            if fresh {
                for &quark in &written {
                    if let Err(cleanup) = builder.modify_attribute(time, quark, StateValue::Null) {
                        warn!(?quark, %cleanup, "could not null partially written slot attribute");
                    }
                }
                self.free.push(Reverse(slot));
            } else if let Some(occupant) = self.occupants.get_mut(&key) {
                occupant.note(written);
            }
            return Err(err);
        }

        self.occupants
            .entry(key)
            .or_insert(Occupant {
                slot,
                written: Vec::new(),
            })
            .note(written);
        Ok(slot)
    }

    fn write_payload(
        &self,
        builder: &mut StateHistoryBuilder,
        slot: u64,
        time: u64,
        payload: &[(&str, StateValue)],
        written: &mut Vec<Quark>,
    ) -> Result<()> {
        let slot_quark = builder.quark_relative_and_add(self.parent, &[self.slot_name(slot)])?;
        for (name, value) in payload {
            let quark = if name.is_empty() {
                slot_quark
            } else {
                builder.quark_relative_and_add(slot_quark, &[name])?
            };
            builder.modify_attribute(time, quark, value.clone())?;
            written.push(quark);
        }
        Ok(())
    }

    /// Close the slot held by `key` at `time` and free it.
    ///
    /// Unknown keys (e.g. a completion whose insert was never seen) are a
    /// no-op and return `Ok(None)`.
    pub fn remove(
        &mut self,
        builder: &mut StateHistoryBuilder,
        key: &K,
        time: u64,
    ) -> Result<Option<u64>> {
        let Some(occupant) = self.occupants.get(key) else {
            warn!(?key, time, "removal of untracked key ignored");
            return Ok(None);
        };
        for &quark in &occupant.written {
            builder.modify_attribute(time, quark, StateValue::Null)?;
        }

        let slot = occupant.slot;
        self.occupants.remove(key);
        self.free.push(Reverse(slot));
        Ok(Some(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (StateHistoryBuilder, Pile<u64>) {
        let mut builder = StateHistoryBuilder::new();
        let disk = builder.quark_for_str("host/disks/8388608").unwrap();
        (builder, Pile::new(disk, 3))
    }

    fn status(value: i64) -> [(&'static str, StateValue); 1] {
        [("status", StateValue::Long(value))]
    }

    #[test]
    fn test_slots_assigned_in_order() {
        let (mut builder, mut pile) = setup();
        assert_eq!(pile.insert(&mut builder, 100, 1, &status(1001)).unwrap(), 0);
        assert_eq!(pile.insert(&mut builder, 200, 2, &status(1002)).unwrap(), 1);
        assert_eq!(pile.insert(&mut builder, 300, 3, &status(1001)).unwrap(), 2);
        assert_eq!(pile.occupancy(), 3);
    }

    #[test]
    fn test_removed_slot_is_reused_first() {
        let (mut builder, mut pile) = setup();
        pile.insert(&mut builder, 100, 1, &status(1001)).unwrap();
        pile.insert(&mut builder, 200, 2, &status(1001)).unwrap();
        pile.insert(&mut builder, 300, 3, &status(1001)).unwrap();

        assert_eq!(pile.remove(&mut builder, &100, 4).unwrap(), Some(0));
        assert_eq!(pile.insert(&mut builder, 400, 5, &status(1002)).unwrap(), 0);
        assert_eq!(pile.slot_of(&400), Some(0));
    }

    #[test]
    fn test_lowest_free_slot_wins() {
        let (mut builder, mut pile) = setup();
        for key in 0..4u64 {
            pile.insert(&mut builder, key, key, &status(1)).unwrap();
        }
        pile.remove(&mut builder, &2, 10).unwrap();
        pile.remove(&mut builder, &1, 11).unwrap();

        assert_eq!(pile.insert(&mut builder, 9, 12, &status(1)).unwrap(), 1);
        assert_eq!(pile.insert(&mut builder, 8, 13, &status(1)).unwrap(), 2);
        assert_eq!(pile.insert(&mut builder, 7, 14, &status(1)).unwrap(), 4);
    }

    #[test]
    fn test_remove_unknown_key_is_noop() {
        let (mut builder, mut pile) = setup();
        assert_eq!(pile.remove(&mut builder, &42, 5).unwrap(), None);
        assert_eq!(pile.occupancy(), 0);
    }

    #[test]
    fn test_remove_closes_slot_interval() {
        let (mut builder, mut pile) = setup();
        let payload = [
            ("status", StateValue::Long(1001)),
            ("info", StateValue::from("update.py (4KB)")),
        ];
        pile.insert(&mut builder, 100, 10, &payload).unwrap();
        pile.remove(&mut builder, &100, 20).unwrap();

        let query = builder.query_engine();
        let status = query.lookup("host/disks/8388608/000/status").unwrap();
        let info = query.lookup("host/disks/8388608/000/info").unwrap();
        assert_eq!(query.intervals_of(status)[0].end, 19);
        assert_eq!(query.intervals_of(info)[0].value, StateValue::from("update.py (4KB)"));
        assert_eq!(query.query_at(status, 20).unwrap(), StateValue::Null);
    }

    #[test]
    fn test_reuse_at_same_instant_has_single_open_interval() {
        let (mut builder, mut pile) = setup();
        pile.insert(&mut builder, 100, 10, &status(1001)).unwrap();
        pile.remove(&mut builder, &100, 20).unwrap();
        pile.insert(&mut builder, 200, 20, &status(1002)).unwrap();

        let query = builder.query_engine();
        let q = query.lookup("host/disks/8388608/000/status").unwrap();
        assert_eq!(query.ongoing_of(q).unwrap().value, StateValue::Long(1002));
        assert_eq!(query.intervals_of(q).len(), 1);
    }

    #[test]
    fn test_reinsert_live_key_keeps_slot() {
        let (mut builder, mut pile) = setup();
        pile.insert(&mut builder, 100, 1, &status(1001)).unwrap();
        assert_eq!(pile.insert(&mut builder, 100, 2, &status(1002)).unwrap(), 0);
        assert_eq!(pile.occupancy(), 1);
    }

    #[test]
    fn test_empty_name_writes_slot_itself() {
        let (mut builder, mut pile) = setup();
        pile.insert(&mut builder, 5, 1, &[("", StateValue::Int(1))])
            .unwrap();
        let query = builder.query_engine();
        let slot = query.lookup("host/disks/8388608/000").unwrap();
        assert_eq!(query.query_at(slot, 1).unwrap(), StateValue::Int(1));
    }

    #[test]
    fn test_failed_insert_returns_slot() {
        let (mut builder, mut pile) = setup();
        pile.insert(&mut builder, 1, 10, &status(1)).unwrap();
        // Out-of-order timestamp is rejected and the slot goes back
        assert!(pile.insert(&mut builder, 2, 5, &status(1)).is_err());
        assert_eq!(pile.slot_of(&2), None);
        assert_eq!(pile.insert(&mut builder, 3, 11, &status(1)).unwrap(), 1);
    }

    #[test]
    fn test_failed_insert_leaves_no_open_attribute_in_free_slot() {
        let (mut builder, mut pile) = setup();
        let payload = [
            ("status", StateValue::Long(1001)),
            ("info", StateValue::from("a.txt")),
        ];
        pile.insert(&mut builder, 1, 10, &payload).unwrap();
        assert!(pile.insert(&mut builder, 2, 5, &payload).is_err());

        let query = builder.query_engine();
        let open: Vec<String> = query
            .all_ongoing()
            .keys()
            .filter_map(|&q| query.path_of(q))
            .collect();
        assert_eq!(
            open,
            vec![
                "host/disks/8388608/000/status".to_string(),
                "host/disks/8388608/000/info".to_string(),
            ]
        );

        pile.insert(&mut builder, 3, 11, &status(1002)).unwrap();
        let info = query.lookup("host/disks/8388608/001/info");
        assert_eq!(info, None);
        assert_eq!(pile.slot_of(&3), Some(1));
    }

    #[test]
    fn test_failed_reinsert_keeps_live_slot() {
        let (mut builder, mut pile) = setup();
        pile.insert(&mut builder, 1, 10, &status(1001)).unwrap();
        assert!(pile.insert(&mut builder, 1, 5, &status(1002)).is_err());
        assert_eq!(pile.slot_of(&1), Some(0));

        pile.remove(&mut builder, &1, 12).unwrap();
        let query = builder.query_engine();
        let q = query.lookup("host/disks/8388608/000/status").unwrap();
        assert_eq!(query.query_at(q, 12).unwrap(), StateValue::Null);
        assert_eq!(query.query_at(q, 11).unwrap(), StateValue::Long(1001));
    }

    #[test]
    fn test_slot_name_width() {
        let (_, pile) = setup();
        assert_eq!(pile.slot_name(7), "007");
        let wide: Pile<u64> = Pile::from_config(
            Quark::new(0),
            &StateConfig {
                slot_width: 5,
                ..StateConfig::default()
            },
        );
        assert_eq!(wide.slot_name(12), "00012");
    }
}
