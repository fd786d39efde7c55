//! The closed mutation-command protocol over the schedule state.
//!
//! One variant per schedule operation, one synchronous dispatch: a command
//! is fully applied (or fully a no-op) before the next one is accepted,
//! and no intermediate state is ever persisted. Besides the new state, the
//! only output is the affected date and assignment id, which a UI
//! collaborator uses to scroll and highlight.

use crate::SchedulePersistence;
use crate::date::PlanDate;
use crate::schedule::{ActivitySlotAssignment, ScheduleState, SlotMove, TimeSlot};
use serde::{Deserialize, Serialize};

/// A single schedule edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    SetSlot {
        date: PlanDate,
        slot: TimeSlot,
        assignment: ActivitySlotAssignment,
        replace_id: Option<String>,
    },
    MoveAndAdd {
        date: PlanDate,
        move_activity_id: String,
        move_to_slot: TimeSlot,
        new_assignment: ActivitySlotAssignment,
        add_to_slot: TimeSlot,
    },
    SwapAcrossDates {
        new_activity: ActivitySlotAssignment,
        new_date: PlanDate,
        new_slot: TimeSlot,
        existing_activity_id: String,
        existing_date: PlanDate,
        existing_slot: TimeSlot,
    },
    SmartReorder {
        target_date: PlanDate,
        target_slot: TimeSlot,
        new_assignment: ActivitySlotAssignment,
        moves: Vec<SlotMove>,
    },
}

impl Command {
    /// The date the UI should bring into view after this command.
    #[must_use]
    pub const fn affected_date(&self) -> PlanDate {
        match self {
            Self::SetSlot { date, .. } | Self::MoveAndAdd { date, .. } => *date,
            Self::SwapAcrossDates { existing_date, .. } => *existing_date,
            Self::SmartReorder { target_date, .. } => *target_date,
        }
    }

    /// The assignment id the UI should highlight after this command.
    #[must_use]
    pub fn affected_activity_id(&self) -> &str {
        match self {
            Self::SetSlot { assignment, .. } => &assignment.id,
            Self::MoveAndAdd { new_assignment, .. } => &new_assignment.id,
            Self::SwapAcrossDates { new_activity, .. } => &new_activity.id,
            Self::SmartReorder { new_assignment, .. } => &new_assignment.id,
        }
    }
}

/// What a dispatched command reports back, besides the new state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// False when a precondition failed and the state is unchanged.
    pub applied: bool,
    pub affected_date: PlanDate,
    pub affected_activity_id: String,
}

/// Apply one command to the state, returning the next state and the
/// scroll/highlight hand-off. Precondition failures come back as an
/// unchanged state with `applied: false`; nothing is ever raised.
#[must_use]
pub fn dispatch(state: &ScheduleState, command: &Command) -> (ScheduleState, CommandOutcome) {
    let next = match command {
        Command::SetSlot {
            date,
            slot,
            assignment,
            replace_id,
        } => state.set_slot(*date, *slot, assignment.clone(), replace_id.as_deref()),
        Command::MoveAndAdd {
            date,
            move_activity_id,
            move_to_slot,
            new_assignment,
            add_to_slot,
        } => state.move_and_add(
            *date,
            move_activity_id,
            *move_to_slot,
            new_assignment.clone(),
            *add_to_slot,
        ),
        Command::SwapAcrossDates {
            new_activity,
            new_date,
            new_slot,
            existing_activity_id,
            existing_date,
            existing_slot,
        } => state.swap_across_dates(
            new_activity.clone(),
            *new_date,
            *new_slot,
            existing_activity_id,
            *existing_date,
            *existing_slot,
        ),
        Command::SmartReorder {
            target_date,
            target_slot,
            new_assignment,
            moves,
        } => state.smart_reorder(*target_date, *target_slot, new_assignment.clone(), moves),
    };

    let applied = next != *state;
    let outcome = CommandOutcome {
        applied,
        affected_date: command.affected_date(),
        affected_activity_id: command.affected_activity_id().to_string(),
    };
    (next, outcome)
}

/// Session wrapper binding the schedule state to an injected persistence
/// port. Commands are applied strictly one at a time; the state is saved
/// only after a command has fully applied.
#[derive(Debug, Clone)]
pub struct ScheduleSession<P: SchedulePersistence> {
    state: ScheduleState,
    persistence: P,
}

impl<P: SchedulePersistence> ScheduleSession<P> {
    /// Open a session, restoring whatever the port has for this session
    /// or starting empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the port fails to load.
    pub fn open(persistence: P) -> Result<Self, P::Error> {
        let state = persistence.load()?.unwrap_or_default();
        Ok(Self { state, persistence })
    }

    /// Borrow the current schedule state.
    #[must_use]
    pub const fn state(&self) -> &ScheduleState {
        &self.state
    }

    /// Apply one command and persist the result when it changed anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the port fails to save; the in-memory state is
    /// left at its pre-command value in that case.
    pub fn apply(&mut self, command: &Command) -> Result<CommandOutcome, P::Error> {
        let (next, outcome) = dispatch(&self.state, command);
        if outcome.applied {
            self.persistence.save(&next)?;
            self.state = next;
        }
        log::debug!(
            "command {} on {}: applied={}",
            outcome.affected_activity_id,
            outcome.affected_date,
            outcome.applied
        );
        Ok(outcome)
    }

    /// Consume the session, returning the final state.
    #[must_use]
    pub fn into_state(self) -> ScheduleState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryPersistence;

    fn date(raw: &str) -> PlanDate {
        raw.parse().unwrap()
    }

    fn set(id: &str, name: &str, on: &str, slot: TimeSlot) -> Command {
        Command::SetSlot {
            date: date(on),
            slot,
            assignment: ActivitySlotAssignment::new(id, name, slot),
            replace_id: None,
        }
    }

    #[test]
    fn dispatch_reports_the_affected_assignment() {
        let state = ScheduleState::default();
        let (next, outcome) = dispatch(&state, &set("S", "Seine Cruise", "2025-01-11", TimeSlot::Day));
        assert!(outcome.applied);
        assert_eq!(outcome.affected_date, date("2025-01-11"));
        assert_eq!(outcome.affected_activity_id, "S");
        assert_eq!(next.find(date("2025-01-11"), "S"), Some(TimeSlot::Day));
    }

    #[test]
    fn dispatch_flags_precondition_no_ops() {
        let state = ScheduleState::default();
        let command = Command::MoveAndAdd {
            date: date("2025-01-11"),
            move_activity_id: "ABSENT".into(),
            move_to_slot: TimeSlot::Night,
            new_assignment: ActivitySlotAssignment::new("N", "New", TimeSlot::Day),
            add_to_slot: TimeSlot::Day,
        };
        let (next, outcome) = dispatch(&state, &command);
        assert!(!outcome.applied);
        assert_eq!(next, state);
    }

    #[test]
    fn session_persists_applied_commands_across_reopen() {
        let persistence = InMemoryPersistence::default();
        let mut session = ScheduleSession::open(persistence.clone()).unwrap();
        let outcome = session
            .apply(&set("S", "Seine Cruise", "2025-01-11", TimeSlot::Day))
            .unwrap();
        assert!(outcome.applied);

        let reopened = ScheduleSession::open(persistence).unwrap();
        assert_eq!(
            reopened.state().find(date("2025-01-11"), "S"),
            Some(TimeSlot::Day)
        );
    }

    #[test]
    fn session_skips_persistence_for_no_ops() {
        let persistence = InMemoryPersistence::default();
        let mut session = ScheduleSession::open(persistence.clone()).unwrap();
        let command = Command::SwapAcrossDates {
            new_activity: ActivitySlotAssignment::new("L", "Louvre", TimeSlot::Day),
            new_date: date("2025-01-10"),
            new_slot: TimeSlot::Night,
            existing_activity_id: "ABSENT".into(),
            existing_date: date("2025-01-11"),
            existing_slot: TimeSlot::Day,
        };
        let outcome = session.apply(&command).unwrap();
        assert!(!outcome.applied);
        assert!(ScheduleSession::open(persistence).unwrap().state().is_empty());
    }
}
