//! Scheduled-activity state and its pure reducers.
//!
//! The schedule is the only persistent state in the engine: a map from
//! calendar date to at most one `day` and one `night` assignment. It is
//! keyed by date+slot, never by timeline identity, so it survives
//! re-derivation of the day-by-day plan. Every reducer returns a new
//! state; an unmet precondition returns the prior state unchanged and
//! never raises.

use crate::date::PlanDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One of the two fixed time-of-day buckets an activity can occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    Day,
    Night,
}

impl TimeSlot {
    /// Strict textual form used by the legacy command encoding.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Night => "night",
        }
    }

    /// Parse the textual form; anything but `day`/`night` is rejected.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "day" => Some(Self::Day),
            "night" => Some(Self::Night),
            _ => None,
        }
    }
}

/// A planning activity scheduled into one slot on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySlotAssignment {
    pub id: String,
    pub name: String,
    pub time_slot: TimeSlot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl ActivitySlotAssignment {
    #[must_use]
    pub fn new(id: &str, name: &str, time_slot: TimeSlot) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            time_slot,
            duration: None,
        }
    }

    /// The same assignment re-stamped for the slot it is being written
    /// into, keeping `time_slot` consistent with its actual position.
    #[must_use]
    fn placed_in(mut self, slot: TimeSlot) -> Self {
        self.time_slot = slot;
        self
    }
}

/// The two slots of one calendar date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySlots {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<ActivitySlotAssignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub night: Option<ActivitySlotAssignment>,
}

impl DaySlots {
    #[must_use]
    pub const fn get(&self, slot: TimeSlot) -> &Option<ActivitySlotAssignment> {
        match slot {
            TimeSlot::Day => &self.day,
            TimeSlot::Night => &self.night,
        }
    }

    const fn get_mut(&mut self, slot: TimeSlot) -> &mut Option<ActivitySlotAssignment> {
        match slot {
            TimeSlot::Day => &mut self.day,
            TimeSlot::Night => &mut self.night,
        }
    }

    /// Which slot currently holds the activity with `id`, if either does.
    #[must_use]
    pub fn slot_of(&self, id: &str) -> Option<TimeSlot> {
        if self.day.as_ref().is_some_and(|a| a.id == id) {
            return Some(TimeSlot::Day);
        }
        if self.night.as_ref().is_some_and(|a| a.id == id) {
            return Some(TimeSlot::Night);
        }
        None
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.day.is_none() && self.night.is_none()
    }
}

/// Date-keyed schedule of slot assignments; the persisted blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleState {
    days: BTreeMap<PlanDate, DaySlots>,
}

/// One relocation inside a `SmartReorder`. Field names match the
/// JSON-encoded `moves` payload of the legacy transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotMove {
    pub activity_id: String,
    pub from_date: PlanDate,
    pub from_slot: TimeSlot,
    pub to_date: PlanDate,
    pub to_slot: TimeSlot,
}

impl ScheduleState {
    /// Slot assignments for one date.
    #[must_use]
    pub fn slots_for(&self, date: PlanDate) -> Option<&DaySlots> {
        self.days.get(&date)
    }

    /// Which slot on `date` holds the activity with `id`.
    #[must_use]
    pub fn find(&self, date: PlanDate, id: &str) -> Option<TimeSlot> {
        self.days.get(&date).and_then(|slots| slots.slot_of(id))
    }

    /// All dates with at least one assignment, chronological.
    pub fn dates(&self) -> impl Iterator<Item = PlanDate> + '_ {
        self.days.keys().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Write `assignment` into `slot` on `date`. When `replace_id` is
    /// given, any assignment carrying that id is first removed from either
    /// slot of that date; the untouched slot is preserved.
    #[must_use]
    pub fn set_slot(
        &self,
        date: PlanDate,
        slot: TimeSlot,
        assignment: ActivitySlotAssignment,
        replace_id: Option<&str>,
    ) -> Self {
        let mut next = self.clone();
        let slots = next.days.entry(date).or_default();
        if let Some(replace_id) = replace_id {
            for held in [TimeSlot::Day, TimeSlot::Night] {
                if slots.get(held).as_ref().is_some_and(|a| a.id == replace_id) {
                    *slots.get_mut(held) = None;
                }
            }
        }
        *slots.get_mut(slot) = Some(assignment.placed_in(slot));
        next
    }

    /// Relocate the activity with `move_activity_id` (found in either slot
    /// of `date`) into `move_to_slot`, and separately write
    /// `new_assignment` into `add_to_slot` on the same date. Unchanged
    /// state when the activity is not found on that date.
    #[must_use]
    pub fn move_and_add(
        &self,
        date: PlanDate,
        move_activity_id: &str,
        move_to_slot: TimeSlot,
        new_assignment: ActivitySlotAssignment,
        add_to_slot: TimeSlot,
    ) -> Self {
        let Some(held) = self.find(date, move_activity_id) else {
            return self.clone();
        };
        let mut next = self.clone();
        let slots = next.days.entry(date).or_default();
        let moved = slots.get_mut(held).take();
        if let Some(moved) = moved {
            *slots.get_mut(move_to_slot) = Some(moved.placed_in(move_to_slot));
        }
        *slots.get_mut(add_to_slot) = Some(new_assignment.placed_in(add_to_slot));
        next
    }

    /// Place `new_activity` where `existing_activity_id` currently sits at
    /// `(existing_date, existing_slot)`, and move the displaced activity
    /// to `(new_date, new_slot)`. All other slots on both dates are
    /// preserved. Unchanged state when the existing activity cannot be
    /// located.
    #[must_use]
    pub fn swap_across_dates(
        &self,
        new_activity: ActivitySlotAssignment,
        new_date: PlanDate,
        new_slot: TimeSlot,
        existing_activity_id: &str,
        existing_date: PlanDate,
        existing_slot: TimeSlot,
    ) -> Self {
        let located = self
            .days
            .get(&existing_date)
            .and_then(|slots| slots.get(existing_slot).as_ref())
            .is_some_and(|held| held.id == existing_activity_id);
        if !located {
            return self.clone();
        }

        let mut next = self.clone();
        let displaced = next
            .days
            .entry(existing_date)
            .or_default()
            .get_mut(existing_slot)
            .replace(new_activity.placed_in(existing_slot));
        if let Some(displaced) = displaced {
            *next.days.entry(new_date).or_default().get_mut(new_slot) =
                Some(displaced.placed_in(new_slot));
        }
        next.prune();
        next
    }

    /// Apply `moves` strictly in list order — each relocating exactly one
    /// assignment, later moves free to target slots vacated by earlier
    /// ones, last writer winning on overlap — then write `new_assignment`
    /// at the target. The whole command is a no-op if any move's source
    /// cannot be located.
    #[must_use]
    pub fn smart_reorder(
        &self,
        target_date: PlanDate,
        target_slot: TimeSlot,
        new_assignment: ActivitySlotAssignment,
        moves: &[SlotMove],
    ) -> Self {
        let mut scratch = self.clone();
        for step in moves {
            let source = scratch
                .days
                .get_mut(&step.from_date)
                .map(|slots| slots.get_mut(step.from_slot));
            let taken = match source {
                Some(slot) if slot.as_ref().is_some_and(|a| a.id == step.activity_id) => {
                    slot.take()
                }
                _ => None,
            };
            let Some(taken) = taken else {
                log::warn!(
                    "schedule: reorder move source {}@{}/{} not found, dropping command",
                    step.activity_id,
                    step.from_date,
                    step.from_slot.as_str()
                );
                return self.clone();
            };
            *scratch
                .days
                .entry(step.to_date)
                .or_default()
                .get_mut(step.to_slot) = Some(taken.placed_in(step.to_slot));
        }
        let slots = scratch.days.entry(target_date).or_default();
        *slots.get_mut(target_slot) = Some(new_assignment.placed_in(target_slot));
        scratch.prune();
        scratch
    }

    /// Drop dates whose two slots are both empty, keeping the persisted
    /// blob free of husks left behind by relocations.
    fn prune(&mut self) {
        self.days.retain(|_, slots| !slots.is_empty());
    }
}
