//! Boundary adapter for the legacy string-encoded command transport.
//!
//! Older hosts hand schedule edits over as single-shot query parameters.
//! This module translates that encoding into the typed [`Command`] and
//! nothing else; in-process callers construct commands directly.
//! Unparseable input yields `None` with a diagnostic — a malformed
//! command is dropped, never an error surfaced to the caller.

use crate::command::Command;
use crate::date::PlanDate;
use crate::schedule::{ActivitySlotAssignment, SlotMove, TimeSlot};
use std::collections::HashMap;

/// Translate query-parameter pairs into a typed command. Later duplicates
/// of a key win, matching single-shot navigation semantics. Returns
/// `None` both for parameter sets that carry no command at all and for
/// malformed ones (the latter with a warning).
#[must_use]
pub fn parse_query<'a, I>(pairs: I) -> Option<Command>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let params: HashMap<&str, &str> = pairs.into_iter().collect();
    match params.get("action").copied() {
        Some("MOVE_AND_ADD") => parse_move_and_add(&params),
        Some("SWAP_ACTIVITIES") => parse_swap(&params),
        Some("SMART_REORDER") => parse_smart_reorder(&params),
        Some(other) => {
            log::warn!("query: unknown action {other:?}, dropping");
            None
        }
        None => parse_set_slot(&params),
    }
}

fn parse_set_slot(params: &HashMap<&str, &str>) -> Option<Command> {
    // Absence of the whole family just means the navigation carried no
    // command; only a partial family is worth a diagnostic.
    let id = params.get("scheduledActivity").copied()?;
    let (Some(date), Some(slot)) = (
        date_param(params, "scheduledDate"),
        slot_param(params, "scheduledSlot"),
    ) else {
        log::warn!("query: incomplete set-slot parameters, dropping");
        return None;
    };
    let name = params.get("scheduledName").copied().unwrap_or(id);
    Some(Command::SetSlot {
        date,
        slot,
        assignment: assignment(id, name, slot, params.get("scheduledDuration").copied()),
        replace_id: params.get("removeActivity").map(ToString::to_string),
    })
}

fn parse_move_and_add(params: &HashMap<&str, &str>) -> Option<Command> {
    let (Some(date), Some(move_to_slot), Some(add_to_slot)) = (
        date_param(params, "scheduledDate"),
        slot_param(params, "moveToSlot"),
        slot_param(params, "addToSlot"),
    ) else {
        log::warn!("query: incomplete move-and-add parameters, dropping");
        return None;
    };
    let (Some(move_id), Some(add_id)) = (
        params.get("moveActivityId").copied(),
        params.get("addActivityId").copied(),
    ) else {
        log::warn!("query: move-and-add missing activity ids, dropping");
        return None;
    };
    let add_name = params.get("addActivityName").copied().unwrap_or(add_id);
    Some(Command::MoveAndAdd {
        date,
        move_activity_id: move_id.to_string(),
        move_to_slot,
        new_assignment: assignment(
            add_id,
            add_name,
            add_to_slot,
            params.get("addActivityDuration").copied(),
        ),
        add_to_slot,
    })
}

fn parse_swap(params: &HashMap<&str, &str>) -> Option<Command> {
    let (Some(new_date), Some(new_slot), Some(existing_date), Some(existing_slot)) = (
        date_param(params, "newDate"),
        slot_param(params, "newSlot"),
        date_param(params, "existingDate"),
        slot_param(params, "existingSlot"),
    ) else {
        log::warn!("query: incomplete swap parameters, dropping");
        return None;
    };
    let (Some(new_id), Some(existing_id)) = (
        params.get("newActivityId").copied(),
        params.get("existingActivityId").copied(),
    ) else {
        log::warn!("query: swap missing activity ids, dropping");
        return None;
    };
    let new_name = params.get("newActivityName").copied().unwrap_or(new_id);
    Some(Command::SwapAcrossDates {
        new_activity: assignment(
            new_id,
            new_name,
            new_slot,
            params.get("newActivityDuration").copied(),
        ),
        new_date,
        new_slot,
        existing_activity_id: existing_id.to_string(),
        existing_date,
        existing_slot,
    })
}

fn parse_smart_reorder(params: &HashMap<&str, &str>) -> Option<Command> {
    let (Some(target_date), Some(target_slot)) = (
        date_param(params, "targetDate"),
        slot_param(params, "targetSlot"),
    ) else {
        log::warn!("query: incomplete reorder parameters, dropping");
        return None;
    };
    let Some(id) = params.get("activityId").copied() else {
        log::warn!("query: reorder missing activityId, dropping");
        return None;
    };
    let moves = match params.get("moves").copied() {
        Some(raw) => match serde_json::from_str::<Vec<SlotMove>>(raw) {
            Ok(moves) => moves,
            Err(error) => {
                log::warn!("query: unparseable reorder moves payload, dropping: {error}");
                return None;
            }
        },
        None => Vec::new(),
    };
    let name = params.get("activityName").copied().unwrap_or(id);
    Some(Command::SmartReorder {
        target_date,
        target_slot,
        new_assignment: assignment(id, name, target_slot, params.get("activityDuration").copied()),
        moves,
    })
}

fn assignment(
    id: &str,
    name: &str,
    slot: TimeSlot,
    duration: Option<&str>,
) -> ActivitySlotAssignment {
    ActivitySlotAssignment {
        id: id.to_string(),
        name: name.to_string(),
        time_slot: slot,
        duration: duration.map(ToString::to_string),
    }
}

fn date_param(params: &HashMap<&str, &str>, key: &str) -> Option<PlanDate> {
    params.get(key).and_then(|raw| match raw.parse() {
        Ok(date) => Some(date),
        Err(error) => {
            log::warn!("query: bad date in {key}: {error}");
            None
        }
    })
}

fn slot_param(params: &HashMap<&str, &str>, key: &str) -> Option<TimeSlot> {
    params.get(key).and_then(|raw| {
        let slot = TimeSlot::parse(raw);
        if slot.is_none() {
            log::warn!("query: bad slot in {key}: {raw:?}");
        }
        slot
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> PlanDate {
        raw.parse().unwrap()
    }

    #[test]
    fn parses_the_set_slot_family() {
        let command = parse_query([
            ("scheduledActivity", "S"),
            ("scheduledDate", "2025-01-11"),
            ("scheduledSlot", "day"),
            ("scheduledName", "Seine Cruise"),
            ("removeActivity", "OLD"),
        ])
        .unwrap();
        let Command::SetSlot {
            date: d,
            slot,
            assignment,
            replace_id,
        } = command
        else {
            panic!("expected SetSlot");
        };
        assert_eq!(d, date("2025-01-11"));
        assert_eq!(slot, TimeSlot::Day);
        assert_eq!(assignment.id, "S");
        assert_eq!(assignment.name, "Seine Cruise");
        assert_eq!(replace_id.as_deref(), Some("OLD"));
    }

    #[test]
    fn parses_move_and_add() {
        let command = parse_query([
            ("action", "MOVE_AND_ADD"),
            ("scheduledDate", "2025-01-11"),
            ("moveActivityId", "M"),
            ("moveToSlot", "night"),
            ("addActivityId", "G"),
            ("addActivityName", "Gallery"),
            ("addToSlot", "day"),
        ])
        .unwrap();
        assert!(matches!(
            command,
            Command::MoveAndAdd {
                move_to_slot: TimeSlot::Night,
                add_to_slot: TimeSlot::Day,
                ..
            }
        ));
    }

    #[test]
    fn parses_swap_and_reorder_with_moves_payload() {
        let swap = parse_query([
            ("action", "SWAP_ACTIVITIES"),
            ("newActivityId", "L"),
            ("newActivityName", "Louvre"),
            ("newDate", "2025-01-10"),
            ("newSlot", "night"),
            ("existingActivityId", "S"),
            ("existingDate", "2025-01-11"),
            ("existingSlot", "day"),
        ])
        .unwrap();
        assert!(matches!(swap, Command::SwapAcrossDates { .. }));

        let moves = r#"[{"activityId":"X","fromDate":"2025-01-10","fromSlot":"day",
                         "toDate":"2025-01-11","toSlot":"night"}]"#;
        let reorder = parse_query([
            ("action", "SMART_REORDER"),
            ("activityId", "Y"),
            ("targetDate", "2025-01-10"),
            ("targetSlot", "day"),
            ("moves", moves),
        ])
        .unwrap();
        let Command::SmartReorder { moves, .. } = reorder else {
            panic!("expected SmartReorder");
        };
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].activity_id, "X");
    }

    #[test]
    fn drops_malformed_input_without_panicking() {
        // Unknown action.
        assert!(parse_query([("action", "EXPLODE")]).is_none());
        // Bad slot.
        assert!(
            parse_query([
                ("scheduledActivity", "S"),
                ("scheduledDate", "2025-01-11"),
                ("scheduledSlot", "noon"),
            ])
            .is_none()
        );
        // Bad date.
        assert!(
            parse_query([
                ("scheduledActivity", "S"),
                ("scheduledDate", "someday"),
                ("scheduledSlot", "day"),
            ])
            .is_none()
        );
        // Unparseable moves payload.
        assert!(
            parse_query([
                ("action", "SMART_REORDER"),
                ("activityId", "Y"),
                ("targetDate", "2025-01-10"),
                ("targetSlot", "day"),
                ("moves", "{not json"),
            ])
            .is_none()
        );
        // No command at all.
        assert!(parse_query([("tab", "itinerary")]).is_none());
    }

    #[test]
    fn timestamped_dates_are_normalized() {
        let command = parse_query([
            ("scheduledActivity", "S"),
            ("scheduledDate", "2025-01-11T14:00:00Z"),
            ("scheduledSlot", "day"),
        ])
        .unwrap();
        assert_eq!(command.affected_date(), date("2025-01-11"));
    }
}
