//! Structural route input model and the ordered step reader.
//!
//! The structural route is produced upstream and is read-only here: flight
//! anchors at both ends, the ordered ground legs between stay cities, and
//! the derived per-city arrival/departure dates. Everything downstream is
//! recomputed from it on every read.

use crate::date::PlanDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mode of a ground transfer between two stay cities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Train,
    Bus,
    Car,
    Ferry,
}

/// One end of the trip: a booked flight pinned to a calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightAnchor {
    pub from_city: String,
    pub to_city: String,
    pub date: PlanDate,
}

/// A single ground leg of the route between two stay cities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelLeg {
    pub mode: TravelMode,
    pub from_city: String,
    pub to_city: String,
}

/// Dates and counters derived upstream from the route skeleton.
/// Consumed here, never computed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedDates {
    pub arrival_dates: BTreeMap<String, PlanDate>,
    pub departure_dates: BTreeMap<String, PlanDate>,
    pub draft_stay_cities: Vec<String>,
    pub total_trip_days: u32,
    /// Buffer days at trip end where the ground route finishes before the
    /// return flight.
    pub inbound_slack_days: u32,
}

/// The immutable skeleton of a trip from which the day-by-day plan is
/// derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralRoute {
    pub outbound_flight: FlightAnchor,
    pub inbound_flight: FlightAnchor,
    pub ground_route: Vec<TravelLeg>,
    pub derived: DerivedDates,
}

/// A multi-night stay in one city, as read from the structural route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayStep {
    pub city: String,
    pub arrival: PlanDate,
    pub departure: PlanDate,
    pub nights: u32,
}

/// One atomic travel fact in route order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteStep {
    OutboundFlight {
        date: PlanDate,
        from: String,
        to: String,
    },
    InboundFlight {
        date: PlanDate,
        from: String,
        to: String,
    },
    /// Ground transfer; carries no date of its own.
    Travel {
        mode: TravelMode,
        from: String,
        to: String,
    },
    Stay(StayStep),
}

impl RouteStep {
    /// The intrinsic date of the step, where one exists. Stays answer with
    /// their arrival date; travels have none.
    #[must_use]
    pub const fn intrinsic_date(&self) -> Option<PlanDate> {
        match self {
            Self::OutboundFlight { date, .. } | Self::InboundFlight { date, .. } => Some(*date),
            Self::Stay(stay) => Some(stay.arrival),
            Self::Travel { .. } => None,
        }
    }
}

/// Source of the ordered step sequence. Hosts with their own route
/// representation implement this; `StructuralRoute` is the bundled one.
pub trait RouteStepReader {
    fn steps(&self) -> Vec<RouteStep>;
}

impl RouteStepReader for StructuralRoute {
    /// Walk the route skeleton in travel order: outbound flight, then each
    /// draft stay city with the ground leg that reaches it, then the
    /// inbound flight. Cities without derived dates are skipped with a
    /// diagnostic; the rest of the sequence is unaffected.
    fn steps(&self) -> Vec<RouteStep> {
        let mut steps = vec![RouteStep::OutboundFlight {
            date: self.outbound_flight.date,
            from: self.outbound_flight.from_city.clone(),
            to: self.outbound_flight.to_city.clone(),
        }];

        let mut legs = self.ground_route.iter();
        let mut first_stay = true;
        for city in &self.derived.draft_stay_cities {
            let (Some(arrival), Some(departure)) = (
                self.derived.arrival_dates.get(city).copied(),
                self.derived.departure_dates.get(city).copied(),
            ) else {
                log::warn!("route: no derived dates for stay city {city:?}, skipping");
                continue;
            };
            if !first_stay
                && let Some(leg) = legs.next()
            {
                steps.push(RouteStep::Travel {
                    mode: leg.mode,
                    from: leg.from_city.clone(),
                    to: leg.to_city.clone(),
                });
            }
            let nights = arrival.days_until(departure).max(0);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            steps.push(RouteStep::Stay(StayStep {
                city: city.clone(),
                arrival,
                departure,
                nights: nights as u32,
            }));
            first_stay = false;
        }

        steps.push(RouteStep::InboundFlight {
            date: self.inbound_flight.date,
            from: self.inbound_flight.from_city.clone(),
            to: self.inbound_flight.to_city.clone(),
        });
        steps
    }
}
