//! Wayplan Itinerary Engine
//!
//! Platform-agnostic core logic for the Wayplan travel planner. This crate
//! derives the calendar-accurate day-by-day timeline from an immutable
//! structural route and maintains the independently persisted activity
//! schedule, without UI or platform-specific dependencies. Derivation is
//! pure and recomputed on every read; the schedule changes only through
//! the closed command protocol.

use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

pub mod command;
pub mod date;
pub mod day_plan;
pub mod query;
pub mod route;
pub mod schedule;
pub mod timeline;

// Re-export commonly used types
pub use command::{Command, CommandOutcome, ScheduleSession, dispatch};
pub use date::{DateParseError, PlanDate};
pub use day_plan::{DayPlan, build_day_plans};
pub use query::parse_query;
pub use route::{
    DerivedDates, FlightAnchor, RouteStep, RouteStepReader, StayStep, StructuralRoute, TravelLeg,
    TravelMode,
};
pub use schedule::{ActivitySlotAssignment, DaySlots, ScheduleState, SlotMove, TimeSlot};
pub use timeline::{DayUnit, DayUnitList, FlightDirection, Timeline, expand_day_units};

/// Trait for abstracting schedule persistence.
/// The schedule must survive a reload within the same session; hosts pick
/// the backing (browser session storage, a temp file, memory).
pub trait SchedulePersistence {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the persisted schedule, `None` when this session has none yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted blob cannot be read or decoded.
    fn load(&self) -> Result<Option<ScheduleState>, Self::Error>;

    /// Persist the schedule as an opaque blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be encoded or written.
    fn save(&self, state: &ScheduleState) -> Result<(), Self::Error>;

    /// Forget the persisted schedule.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob cannot be removed.
    fn clear(&self) -> Result<(), Self::Error>;
}

/// Errors from the bundled in-memory persistence adapter.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("schedule blob could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("schedule blob could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Session-scoped in-memory persistence: the blob lives exactly as long
/// as whoever holds a clone of this adapter. Also the test double.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPersistence {
    blob: Rc<RefCell<Option<String>>>,
}

impl SchedulePersistence for InMemoryPersistence {
    type Error = PersistenceError;

    fn load(&self) -> Result<Option<ScheduleState>, Self::Error> {
        self.blob
            .borrow()
            .as_deref()
            .map(|raw| serde_json::from_str(raw).map_err(PersistenceError::Decode))
            .transpose()
    }

    fn save(&self, state: &ScheduleState) -> Result<(), Self::Error> {
        let raw = serde_json::to_string(state).map_err(PersistenceError::Encode)?;
        *self.blob.borrow_mut() = Some(raw);
        Ok(())
    }

    fn clear(&self) -> Result<(), Self::Error> {
        *self.blob.borrow_mut() = None;
        Ok(())
    }
}

/// Main engine facade binding timeline derivation to a schedule session.
pub struct ItineraryEngine<P>
where
    P: SchedulePersistence,
{
    session: ScheduleSession<P>,
}

impl<P> ItineraryEngine<P>
where
    P: SchedulePersistence,
{
    /// Open the engine over a persistence port, restoring any schedule
    /// the session already holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the port fails to load.
    pub fn open(persistence: P) -> Result<Self, anyhow::Error>
    where
        P::Error: Into<anyhow::Error>,
    {
        let session = ScheduleSession::open(persistence).map_err(Into::into)?;
        Ok(Self { session })
    }

    /// Bucket the route's steps by calendar date. Recomputed fresh on
    /// every call.
    pub fn day_plans(&self, route: &impl RouteStepReader) -> Vec<DayPlan> {
        build_day_plans(&route.steps())
    }

    /// Derive the full day-by-day timeline. Recomputed fresh on every
    /// call; never blocked by missing activity-catalog data.
    pub fn timeline(&self, route: &impl RouteStepReader) -> Timeline {
        expand_day_units(&self.day_plans(route))
    }

    /// The current activity schedule.
    #[must_use]
    pub const fn schedule(&self) -> &ScheduleState {
        self.session.state()
    }

    /// Apply one typed schedule command.
    ///
    /// # Errors
    ///
    /// Returns an error only when the persistence port fails to save.
    pub fn apply(&mut self, command: &Command) -> Result<CommandOutcome, P::Error> {
        self.session.apply(command)
    }

    /// Apply a command arriving through the legacy string transport.
    /// Malformed input is dropped (`Ok(None)`), per the boundary contract.
    ///
    /// # Errors
    ///
    /// Returns an error only when the persistence port fails to save.
    pub fn apply_query<'a, I>(&mut self, pairs: I) -> Result<Option<CommandOutcome>, P::Error>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        match parse_query(pairs) {
            Some(command) => self.apply(&command).map(Some),
            None => Ok(None),
        }
    }

    /// Consume the engine, returning the final schedule state.
    #[must_use]
    pub fn into_schedule(self) -> ScheduleState {
        self.session.into_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn date(raw: &str) -> PlanDate {
        raw.parse().unwrap()
    }

    fn sample_route() -> StructuralRoute {
        let mut arrival_dates = BTreeMap::new();
        let mut departure_dates = BTreeMap::new();
        arrival_dates.insert("Prague".to_string(), date("2025-01-13"));
        departure_dates.insert("Prague".to_string(), date("2025-01-16"));
        arrival_dates.insert("Vienna".to_string(), date("2025-01-16"));
        departure_dates.insert("Vienna".to_string(), date("2025-01-18"));

        StructuralRoute {
            outbound_flight: FlightAnchor {
                from_city: "London".into(),
                to_city: "Prague".into(),
                date: date("2025-01-13"),
            },
            inbound_flight: FlightAnchor {
                from_city: "Vienna".into(),
                to_city: "London".into(),
                date: date("2025-01-18"),
            },
            ground_route: vec![TravelLeg {
                mode: TravelMode::Train,
                from_city: "Prague".into(),
                to_city: "Vienna".into(),
            }],
            derived: DerivedDates {
                arrival_dates,
                departure_dates,
                draft_stay_cities: vec!["Prague".into(), "Vienna".into()],
                total_trip_days: 6,
                inbound_slack_days: 0,
            },
        }
    }

    #[test]
    fn engine_derives_and_schedules_through_the_port() {
        let persistence = InMemoryPersistence::default();
        let mut engine = ItineraryEngine::open(persistence.clone()).unwrap();
        let route = sample_route();

        let timeline = engine.timeline(&route);
        assert!(timeline.verify_coverage(date("2025-01-13"), date("2025-01-18")));

        let outcome = engine
            .apply(&Command::SetSlot {
                date: date("2025-01-14"),
                slot: TimeSlot::Day,
                assignment: ActivitySlotAssignment::new("C", "Castle Tour", TimeSlot::Day),
                replace_id: None,
            })
            .unwrap();
        assert!(outcome.applied);

        // Derivation is independent of the schedule and vice versa.
        assert_eq!(engine.timeline(&route), timeline);
        let reopened = ItineraryEngine::open(persistence).unwrap();
        assert_eq!(
            reopened.schedule().find(date("2025-01-14"), "C"),
            Some(TimeSlot::Day)
        );
    }

    #[test]
    fn engine_applies_legacy_query_commands() {
        let mut engine = ItineraryEngine::open(InMemoryPersistence::default()).unwrap();
        let outcome = engine
            .apply_query([
                ("scheduledActivity", "S"),
                ("scheduledDate", "2025-01-14"),
                ("scheduledSlot", "night"),
                ("scheduledName", "River Cruise"),
            ])
            .unwrap()
            .unwrap();
        assert!(outcome.applied);
        assert!(engine.apply_query([("action", "EXPLODE")]).unwrap().is_none());
        assert_eq!(
            engine.into_schedule().find(date("2025-01-14"), "S"),
            Some(TimeSlot::Night)
        );
    }
}
