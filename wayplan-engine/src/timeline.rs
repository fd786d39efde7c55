//! Expansion of day plans into a calendar-accurate, render-ready timeline.
//!
//! This is the second derivation stage: multi-night stays split into one
//! unit per night, travels are re-anchored to the date they actually
//! happen on, and every unit lands in a strictly chronological,
//! intra-day-ordered bucket. The whole pass is pure — identical input
//! always yields a deep-equal timeline, because it is re-run on every read
//! of the structural route.

use crate::date::PlanDate;
use crate::day_plan::DayPlan;
use crate::route::{RouteStep, StayStep, TravelMode};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Per-day unit capacity held inline without allocating.
pub type DayUnitList = SmallVec<[DayUnit; 4]>;

/// Which end of the trip a flight unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightDirection {
    Outbound,
    Inbound,
}

/// A per-calendar-day renderable fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayUnit {
    Flight {
        direction: FlightDirection,
        date: PlanDate,
        from: String,
        to: String,
    },
    Travel {
        mode: TravelMode,
        date: PlanDate,
        from: String,
        to: String,
    },
    StayDay {
        city: String,
        date: PlanDate,
        /// 1-based night counter within the stay.
        day_index_in_stay: u32,
        total_days_in_stay: u32,
        /// The stay this night was expanded from.
        stay: StayStep,
    },
}

impl DayUnit {
    /// The calendar date this unit is scheduled on.
    #[must_use]
    pub const fn date(&self) -> PlanDate {
        match self {
            Self::Flight { date, .. } | Self::Travel { date, .. } | Self::StayDay { date, .. } => {
                *date
            }
        }
    }

    /// Fixed intra-day ordering rank: outbound flight, then transfers,
    /// then stay days, then the inbound flight.
    #[must_use]
    pub const fn intra_day_priority(&self) -> u8 {
        match self {
            Self::Flight {
                direction: FlightDirection::Outbound,
                ..
            } => 1,
            Self::Travel { .. } => 2,
            Self::StayDay { .. } => 3,
            Self::Flight {
                direction: FlightDirection::Inbound,
                ..
            } => 4,
        }
    }
}

/// The derived day-by-day plan: one bucket of ordered units per calendar
/// date across the whole trip span. Buckets can be empty (inbound slack
/// days render as free days).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    days: BTreeMap<PlanDate, DayUnitList>,
}

impl Timeline {
    /// Units scheduled on `date`, if the date is part of the trip span.
    #[must_use]
    pub fn get(&self, date: PlanDate) -> Option<&[DayUnit]> {
        self.days.get(&date).map(SmallVec::as_slice)
    }

    /// All buckets in chronological order.
    pub fn days(&self) -> impl Iterator<Item = (PlanDate, &[DayUnit])> {
        self.days.iter().map(|(date, units)| (*date, units.as_slice()))
    }

    /// All covered dates in chronological order.
    pub fn dates(&self) -> impl Iterator<Item = PlanDate> + '_ {
        self.days.keys().copied()
    }

    #[must_use]
    pub fn first_date(&self) -> Option<PlanDate> {
        self.days.keys().next().copied()
    }

    #[must_use]
    pub fn last_date(&self) -> Option<PlanDate> {
        self.days.keys().next_back().copied()
    }

    /// Number of covered calendar dates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// True when the covered dates are exactly the inclusive
    /// `start..=end` span — no gaps, no strays.
    #[must_use]
    pub fn verify_coverage(&self, start: PlanDate, end: PlanDate) -> bool {
        self.dates().eq(start.span_through(end))
    }
}

/// A unit decorated with its full sort key. The explicit original index
/// preserves relative order among equal-priority units on the same date.
struct Decorated {
    date: PlanDate,
    priority: u8,
    original_index: usize,
    unit: DayUnit,
}

/// Expand day plans into the full per-date timeline.
///
/// Travels re-anchor by a fixed priority: the departure date of the most
/// recently preceding stay; failing that, the outbound flight date while
/// stays are still ahead in the sequence; failing that, the inbound flight
/// date. A travel none of the rules can place falls back to its
/// originating bucket date, which is a structural inconsistency and gets a
/// diagnostic rather than silence.
#[must_use]
pub fn expand_day_units(plans: &[DayPlan]) -> Timeline {
    let flat: Vec<(PlanDate, &RouteStep)> = plans
        .iter()
        .flat_map(|plan| plan.steps.iter().map(move |step| (plan.date, step)))
        .collect();

    let mut outbound_date = None;
    let mut inbound_date = None;
    for (_, step) in &flat {
        match step {
            RouteStep::OutboundFlight { date, .. } => outbound_date = Some(*date),
            RouteStep::InboundFlight { date, .. } => inbound_date = Some(*date),
            _ => {}
        }
    }

    // stays_ahead[i]: does any stay occur after position i?
    let mut stays_ahead = vec![false; flat.len()];
    let mut seen_stay = false;
    for (index, (_, step)) in flat.iter().enumerate().rev() {
        stays_ahead[index] = seen_stay;
        if matches!(step, RouteStep::Stay(_)) {
            seen_stay = true;
        }
    }

    let mut decorated = Vec::with_capacity(flat.len());
    let mut last_stay: Option<&StayStep> = None;
    for (index, (bucket_date, step)) in flat.iter().enumerate() {
        match step {
            RouteStep::OutboundFlight { date, from, to } => decorated.push(Decorated {
                date: *date,
                priority: 1,
                original_index: index,
                unit: DayUnit::Flight {
                    direction: FlightDirection::Outbound,
                    date: *date,
                    from: from.clone(),
                    to: to.clone(),
                },
            }),
            RouteStep::InboundFlight { date, from, to } => decorated.push(Decorated {
                date: *date,
                priority: 4,
                original_index: index,
                unit: DayUnit::Flight {
                    direction: FlightDirection::Inbound,
                    date: *date,
                    from: from.clone(),
                    to: to.clone(),
                },
            }),
            RouteStep::Travel { mode, from, to } => {
                let anchored = anchor_travel_date(
                    last_stay,
                    stays_ahead[index],
                    outbound_date,
                    inbound_date,
                );
                let date = anchored.unwrap_or_else(|| {
                    log::warn!(
                        "timeline: travel {from}->{to} has no resolvable anchor, \
                         falling back to bucket date {bucket_date}"
                    );
                    *bucket_date
                });
                decorated.push(Decorated {
                    date,
                    priority: 2,
                    original_index: index,
                    unit: DayUnit::Travel {
                        mode: *mode,
                        date,
                        from: from.clone(),
                        to: to.clone(),
                    },
                });
            }
            RouteStep::Stay(stay) => {
                for night in 0..stay.nights {
                    let date = stay.arrival.add_days(i64::from(night));
                    decorated.push(Decorated {
                        date,
                        priority: 3,
                        original_index: index,
                        unit: DayUnit::StayDay {
                            city: stay.city.clone(),
                            date,
                            day_index_in_stay: night + 1,
                            total_days_in_stay: stay.nights,
                            stay: stay.clone(),
                        },
                    });
                }
                last_stay = Some(stay);
            }
        }
    }

    decorated.sort_by_key(|entry| (entry.date, entry.priority, entry.original_index));

    let mut days: BTreeMap<PlanDate, DayUnitList> = BTreeMap::new();
    for entry in decorated {
        days.entry(entry.date).or_default().push(entry.unit);
    }

    if let (Some(start), Some(end)) = (outbound_date, inbound_date) {
        for date in start.span_through(end) {
            days.entry(date).or_default();
        }
        for date in days.keys() {
            if *date < start || *date > end {
                log::warn!("timeline: unit bucket {date} falls outside the flight span");
            }
        }
    }

    Timeline { days }
}

/// Anchor-date resolution for a travel step, in strict priority order.
const fn anchor_travel_date(
    last_stay: Option<&StayStep>,
    stays_ahead: bool,
    outbound_date: Option<PlanDate>,
    inbound_date: Option<PlanDate>,
) -> Option<PlanDate> {
    if let Some(stay) = last_stay {
        return Some(stay.departure);
    }
    if stays_ahead {
        return outbound_date;
    }
    inbound_date
}
