//! Bucketing of route steps by the calendar date they first attach to.
//!
//! This is the first derivation stage: multi-night stays are still whole
//! (filed under their arrival date); splitting into per-night units is the
//! expander's job.

use crate::date::PlanDate;
use crate::route::RouteStep;
use std::collections::BTreeMap;

/// Route steps grouped under one calendar date, in original step order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayPlan {
    /// 1-based position of this date within the plan.
    pub day_index: u32,
    pub date: PlanDate,
    /// Human-readable heading for the rendering collaborator; never
    /// load-bearing.
    pub label: String,
    pub steps: Vec<RouteStep>,
}

/// Group the ordered step sequence into per-date buckets.
///
/// A date cursor walks the sequence: flights set it to their own date,
/// stays set it to their arrival date, and travels (which carry no date)
/// file under whatever the cursor currently holds. A travel reached before
/// any cursor exists has nowhere defensible to go and is dropped with a
/// diagnostic.
#[must_use]
pub fn build_day_plans(steps: &[RouteStep]) -> Vec<DayPlan> {
    let mut buckets: BTreeMap<PlanDate, Vec<RouteStep>> = BTreeMap::new();
    let mut cursor: Option<PlanDate> = None;

    for step in steps {
        let date = match step.intrinsic_date() {
            Some(date) => {
                cursor = Some(date);
                date
            }
            None => match cursor {
                Some(date) => date,
                None => {
                    log::warn!("day_plan: travel step before any dated step, dropping: {step:?}");
                    continue;
                }
            },
        };
        buckets.entry(date).or_default().push(step.clone());
    }

    buckets
        .into_iter()
        .enumerate()
        .map(|(index, (date, steps))| {
            #[allow(clippy::cast_possible_truncation)]
            let day_index = index as u32 + 1;
            DayPlan {
                day_index,
                date,
                label: format!("Day {day_index} · {}", date.short_label()),
                steps,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{StayStep, TravelMode};

    fn date(raw: &str) -> PlanDate {
        raw.parse().unwrap()
    }

    fn stay(city: &str, arrival: &str, departure: &str, nights: u32) -> RouteStep {
        RouteStep::Stay(StayStep {
            city: city.into(),
            arrival: date(arrival),
            departure: date(departure),
            nights,
        })
    }

    fn travel(from: &str, to: &str) -> RouteStep {
        RouteStep::Travel {
            mode: TravelMode::Train,
            from: from.into(),
            to: to.into(),
        }
    }

    fn sample_steps() -> Vec<RouteStep> {
        vec![
            RouteStep::OutboundFlight {
                date: date("2025-01-13"),
                from: "London".into(),
                to: "Prague".into(),
            },
            stay("Prague", "2025-01-13", "2025-01-16", 3),
            travel("Prague", "Vienna"),
            stay("Vienna", "2025-01-16", "2025-01-18", 2),
            RouteStep::InboundFlight {
                date: date("2025-01-18"),
                from: "Vienna".into(),
                to: "London".into(),
            },
        ]
    }

    #[test]
    fn buckets_by_cursor_date_in_ascending_order() {
        let plans = build_day_plans(&sample_steps());
        assert_eq!(plans.len(), 3);

        assert_eq!(plans[0].date, date("2025-01-13"));
        // Flight, whole Prague stay, and the cursor-dated travel all land
        // on the arrival day at this stage.
        assert_eq!(plans[0].steps.len(), 3);
        assert!(matches!(plans[0].steps[0], RouteStep::OutboundFlight { .. }));
        assert!(matches!(plans[0].steps[2], RouteStep::Travel { .. }));

        assert_eq!(plans[1].date, date("2025-01-16"));
        assert!(matches!(&plans[1].steps[0], RouteStep::Stay(s) if s.city == "Vienna"));

        assert_eq!(plans[2].date, date("2025-01-18"));
        assert!(matches!(plans[2].steps[0], RouteStep::InboundFlight { .. }));
    }

    #[test]
    fn day_indices_and_labels_are_sequential() {
        let plans = build_day_plans(&sample_steps());
        let indices: Vec<u32> = plans.iter().map(|p| p.day_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(plans[0].label, "Day 1 · Jan 13");
    }

    #[test]
    fn travel_before_any_dated_step_is_dropped() {
        let steps = vec![
            travel("Nowhere", "Prague"),
            stay("Prague", "2025-01-13", "2025-01-16", 3),
        ];
        let plans = build_day_plans(&steps);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].steps.len(), 1);
        assert!(matches!(plans[0].steps[0], RouteStep::Stay(_)));
    }

    #[test]
    fn empty_input_yields_empty_plan() {
        assert!(build_day_plans(&[]).is_empty());
    }
}
