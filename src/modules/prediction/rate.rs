use std::collections::BTreeMap;

use tracing::trace;

use crate::modules::catalog::{Event, EventCatalog};

/// Final-score multipliers recorded for a finished event, per tier.
///
/// A rate is the actual final score divided by what the mid-event trend line
/// projected, so it captures how hard the last day pushes the cutoff.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EventRates {
    pub(crate) event_id: u32,
    pub(crate) event_type: String,
    pub(crate) rates: BTreeMap<u32, f64>,
}

pub(crate) const DEFAULT_RATE: f64 = 1.0;

/// Rate to apply to `event` at `tier`, learned from earlier events of the same
/// type. Each earlier event is weighted by roster overlap and by how recent it
/// is (`past id / current id`).
pub(crate) fn derive_rate(
    event: &Event,
    tier: u32,
    history: &[EventRates],
    catalog: &EventCatalog,
) -> f64 {
    let candidates: Vec<(u32, f64)> = history
        .iter()
        .filter(|h| h.event_type == event.event_type && h.event_id < event.id)
        .filter_map(|h| h.rates.get(&tier).map(|rate| (h.event_id, *rate)))
        .collect();

    if candidates.is_empty() {
        return DEFAULT_RATE;
    }

    let (weighted, weights) =
        candidates
            .iter()
            .fold((0.0, 0.0), |(weighted, weights), (id, rate)| {
                let similarity = catalog
                    .get(*id)
                    .map_or(0.0, |past| event.roster_similarity(past));
                let recency = f64::from(*id) / f64::from(event.id);
                let weight = similarity * recency;

                (weighted + weight * rate, weights + weight)
            });

    let rate = if weights > 0.0 {
        weighted / weights
    } else {
        candidates.iter().map(|(_, rate)| rate).sum::<f64>() / candidates.len() as f64
    };

    trace!(
        event_id = event.id,
        tier,
        candidates = candidates.len(),
        rate,
        "derived final rate"
    );
    rate
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn event(id: u32, event_type: &str, characters: &[u32]) -> Event {
        Event {
            id,
            event_type: event_type.into(),
            name: String::new(),
            start_at: 0,
            aggregate_at: 1,
            closed_at: 2,
            characters: characters.iter().copied().collect::<BTreeSet<u32>>(),
        }
    }

    fn rates(event_id: u32, event_type: &str, tier: u32, rate: f64) -> EventRates {
        EventRates {
            event_id,
            event_type: event_type.into(),
            rates: BTreeMap::from([(tier, rate)]),
        }
    }

    #[test]
    fn test_no_history_defaults_to_one() {
        let current = event(10, "marathon", &[1, 2]);
        let catalog = EventCatalog::new(vec![current.clone()]);
        assert_eq!(derive_rate(&current, 100, &[], &catalog), DEFAULT_RATE);

        // other types and other tiers don't count
        let history = vec![
            rates(5, "cheerful_carnival", 100, 2.0),
            rates(6, "marathon", 50, 2.0),
        ];
        assert_eq!(derive_rate(&current, 100, &history, &catalog), DEFAULT_RATE);
    }

    #[test]
    fn test_weighted_by_similarity_and_recency() {
        let current = event(10, "marathon", &[1, 2]);
        let same_roster = event(5, "marathon", &[1, 2]);
        let half_roster = event(8, "marathon", &[1, 3]);
        let catalog = EventCatalog::new(vec![current.clone(), same_roster, half_roster]);

        let history = vec![rates(5, "marathon", 100, 1.2), rates(8, "marathon", 100, 1.5)];
        let rate = derive_rate(&current, 100, &history, &catalog);

        // weights: 1.0 * 0.5 = 0.5 and (1/3) * 0.8 = 0.2666..
        let w1 = 0.5;
        let w2 = 0.8 / 3.0;
        let expected = (w1 * 1.2 + w2 * 1.5) / (w1 + w2);
        assert!((rate - expected).abs() < 1e-12);
    }

    #[test]
    fn test_unmatched_rosters_fall_back_to_plain_average() {
        let current = event(10, "marathon", &[1, 2]);
        let other = event(5, "marathon", &[7]);
        let catalog = EventCatalog::new(vec![current.clone(), other]);

        // event 4 isn't in the catalog at all
        let history = vec![rates(5, "marathon", 100, 1.2), rates(4, "marathon", 100, 1.4)];
        let rate = derive_rate(&current, 100, &history, &catalog);
        assert!((rate - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_future_events_are_ignored() {
        let current = event(10, "marathon", &[1]);
        let later = event(11, "marathon", &[1]);
        let catalog = EventCatalog::new(vec![current.clone(), later]);

        let history = vec![rates(11, "marathon", 100, 3.0)];
        assert_eq!(derive_rate(&current, 100, &history, &catalog), DEFAULT_RATE);
    }
}
