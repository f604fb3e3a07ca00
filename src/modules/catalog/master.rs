use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MasterEvent {
    pub(crate) id: u32,
    pub(crate) event_type: String,
    #[serde(default)]
    pub(crate) name: String,
    pub(crate) start_at: i64,
    pub(crate) aggregate_at: i64,
    pub(crate) closed_at: i64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MasterEventCard {
    pub(crate) event_id: u32,
    pub(crate) card_id: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MasterCard {
    pub(crate) id: u32,
    pub(crate) character_id: u32,
}

/// A ranking period with its featured characters.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Event {
    pub(crate) id: u32,
    pub(crate) event_type: String,
    pub(crate) name: String,
    pub(crate) start_at: i64,
    pub(crate) aggregate_at: i64,
    pub(crate) closed_at: i64,
    pub(crate) characters: BTreeSet<u32>,
}

impl Event {
    /// Length of the scoring period in ms.
    pub(crate) fn duration(&self) -> i64 {
        self.aggregate_at - self.start_at
    }

    pub(crate) fn is_open(&self, now: i64) -> bool {
        self.start_at <= now && now < self.closed_at
    }

    pub(crate) fn is_aggregating(&self, now: i64) -> bool {
        self.start_at <= now && now < self.aggregate_at
    }

    /// Jaccard similarity of the two character rosters.
    pub(crate) fn roster_similarity(&self, other: &Event) -> f64 {
        let union = self.characters.union(&other.characters).count();
        if union == 0 {
            return 0.0;
        }
        self.characters.intersection(&other.characters).count() as f64 / union as f64
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct EventCatalog {
    events: Vec<Event>,
}

impl EventCatalog {
    pub(crate) fn new(mut events: Vec<Event>) -> Self {
        events.sort_by_key(|e| e.id);
        Self { events }
    }

    pub(crate) fn from_master(
        events: Vec<MasterEvent>,
        event_cards: Vec<MasterEventCard>,
        cards: Vec<MasterCard>,
    ) -> Self {
        let card_characters: HashMap<u32, u32> =
            cards.into_iter().map(|c| (c.id, c.character_id)).collect();

        let mut rosters: HashMap<u32, BTreeSet<u32>> = HashMap::new();
        for ec in event_cards {
            if let Some(character) = card_characters.get(&ec.card_id) {
                rosters.entry(ec.event_id).or_default().insert(*character);
            }
        }

        Self::new(
            events
                .into_iter()
                .map(|e| Event {
                    characters: rosters.remove(&e.id).unwrap_or_default(),
                    id: e.id,
                    event_type: e.event_type,
                    name: e.name,
                    start_at: e.start_at,
                    aggregate_at: e.aggregate_at,
                    closed_at: e.closed_at,
                })
                .collect(),
        )
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn get(&self, id: u32) -> Option<&Event> {
        self.events
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|idx| &self.events[idx])
    }

    pub(crate) fn current_event(&self, now: i64) -> Option<&Event> {
        self.events.iter().rev().find(|e| e.is_open(now))
    }

    /// Events whose ranking has stopped moving, in id order.
    pub(crate) fn finished_events(&self, now: i64) -> Vec<&Event> {
        self.events.iter().filter(|e| e.aggregate_at <= now).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn master_event(id: u32, start_at: i64) -> MasterEvent {
        MasterEvent {
            id,
            event_type: "marathon".into(),
            name: format!("event {}", id),
            start_at,
            aggregate_at: start_at + 100,
            closed_at: start_at + 150,
        }
    }

    #[test]
    fn test_from_master_builds_rosters() {
        let catalog = EventCatalog::from_master(
            vec![master_event(2, 1000), master_event(1, 0)],
            vec![
                MasterEventCard { event_id: 1, card_id: 10 },
                MasterEventCard { event_id: 1, card_id: 11 },
                MasterEventCard { event_id: 2, card_id: 11 },
                MasterEventCard { event_id: 2, card_id: 99 },
            ],
            vec![
                MasterCard { id: 10, character_id: 3 },
                MasterCard { id: 11, character_id: 4 },
            ],
        );

        assert_eq!(catalog.len(), 2);
        let first = catalog.get(1).unwrap();
        let second = catalog.get(2).unwrap();
        assert_eq!(first.characters, BTreeSet::from([3, 4]));
        assert_eq!(second.characters, BTreeSet::from([4]));
        assert_eq!(first.roster_similarity(second), 0.5);
        assert!(catalog.get(3).is_none());
    }

    #[test]
    fn test_current_and_finished_events() {
        let catalog = EventCatalog::from_master(
            vec![master_event(1, 0), master_event(2, 1000)],
            vec![],
            vec![],
        );

        assert_eq!(catalog.current_event(50).map(|e| e.id), Some(1));
        // between aggregation and close the event is still open
        assert_eq!(catalog.current_event(120).map(|e| e.id), Some(1));
        assert!(!catalog.get(1).unwrap().is_aggregating(120));
        assert!(catalog.current_event(500).is_none());
        let ids = |now| catalog.finished_events(now).iter().map(|e| e.id).collect::<Vec<_>>();
        assert_eq!(ids(500), vec![1]);
        assert!(ids(50).is_empty());
        assert_eq!(ids(5000), vec![1, 2]);
    }

    #[test]
    fn test_empty_rosters_are_dissimilar() {
        let catalog =
            EventCatalog::from_master(vec![master_event(1, 0), master_event(2, 10)], vec![], vec![]);
        let a = catalog.get(1).unwrap();
        let b = catalog.get(2).unwrap();
        assert_eq!(a.roster_similarity(b), 0.0);
    }
}
