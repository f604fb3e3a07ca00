use std::fmt;

use crate::util::format_score;

pub(crate) const MAX_TRACKERS_PER_CHANNEL: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TrackTarget {
    Tier(u32),
    Player(String),
}

impl fmt::Display for TrackTarget {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tier(tier) => write!(fmt, "T{}", tier),
            Self::Player(id) => write!(fmt, "player `{}`", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TrackCondition {
    /// One-shot: fires once the score reaches the cutoff.
    Cutoff(i64),
    /// Repeating: fires on every positive gain inside the bounds.
    Gain { min: Option<i64>, max: Option<i64> },
}

impl TrackCondition {
    fn matches_gain(&self, gain: i64) -> bool {
        match self {
            Self::Cutoff(_) => false,
            Self::Gain { min, max } => {
                gain > 0 && min.map_or(true, |min| gain >= min) && max.map_or(true, |max| gain <= max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TrackerState {
    Armed,
    Fired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewTracker {
    pub(crate) owner_id: u64,
    pub(crate) channel_id: u64,
    pub(crate) target: TrackTarget,
    pub(crate) condition: TrackCondition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TrackedThreshold {
    pub(crate) id: i64,
    pub(crate) owner_id: u64,
    pub(crate) channel_id: u64,
    pub(crate) target: TrackTarget,
    pub(crate) condition: TrackCondition,
    pub(crate) last_observed_score: Option<i64>,
    /// timestamp of the sample behind `last_observed_score`
    pub(crate) last_observed_at: Option<i64>,
    pub(crate) state: TrackerState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Notification {
    pub(crate) owner_id: u64,
    pub(crate) channel_id: u64,
    pub(crate) target: TrackTarget,
    pub(crate) score: i64,
    pub(crate) gain: Option<i64>,
}

impl Notification {
    pub(crate) fn message(&self) -> String {
        match self.gain {
            Some(gain) => format!(
                "<@{}> {} gained {} points (now {})",
                self.owner_id,
                self.target,
                format_score(gain),
                format_score(self.score)
            ),
            None => format!(
                "<@{}> {} reached {} points",
                self.owner_id,
                self.target,
                format_score(self.score)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Observation {
    pub(crate) notification: Option<Notification>,
    /// tracker is finished and should be removed
    pub(crate) retire: bool,
}

impl TrackedThreshold {
    pub(crate) fn from_new(id: i64, new: NewTracker) -> Self {
        Self {
            id,
            owner_id: new.owner_id,
            channel_id: new.channel_id,
            target: new.target,
            condition: new.condition,
            last_observed_score: None,
            last_observed_at: None,
            state: TrackerState::Armed,
        }
    }

    fn notify(&self, score: i64, gain: Option<i64>) -> Notification {
        Notification {
            owner_id: self.owner_id,
            channel_id: self.channel_id,
            target: self.target.clone(),
            score,
            gain,
        }
    }

    /// Feeds the newest score for the tracked target.
    pub(crate) fn observe(&mut self, score: i64) -> Observation {
        if self.state == TrackerState::Fired {
            return Observation {
                notification: None,
                retire: true,
            };
        }

        let previous = self.last_observed_score.replace(score);

        match self.condition {
            TrackCondition::Cutoff(cutoff) if score >= cutoff => {
                self.state = TrackerState::Fired;
                Observation {
                    notification: Some(self.notify(score, None)),
                    retire: true,
                }
            }
            TrackCondition::Cutoff(_) => Observation::default(),
            TrackCondition::Gain { .. } => {
                let notification = previous
                    .map(|prev| score - prev)
                    .filter(|gain| self.condition.matches_gain(*gain))
                    .map(|gain| self.notify(score, Some(gain)));

                Observation {
                    notification,
                    retire: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(condition: TrackCondition) -> TrackedThreshold {
        TrackedThreshold::from_new(
            1,
            NewTracker {
                owner_id: 42,
                channel_id: 7,
                target: TrackTarget::Tier(100),
                condition,
            },
        )
    }

    #[test]
    fn test_cutoff_fires_exactly_once() {
        let mut t = tracker(TrackCondition::Cutoff(1_000_000));

        assert_eq!(t.observe(900_000), Observation::default());
        assert_eq!(t.observe(999_999), Observation::default());

        let fired = t.observe(1_000_000);
        assert!(fired.retire);
        let notification = fired.notification.unwrap();
        assert_eq!(notification.score, 1_000_000);
        assert_eq!(
            notification.message(),
            "<@42> T100 reached 1,000,000 points"
        );

        for score in [1_000_000, 1_200_000] {
            let after = t.observe(score);
            assert!(after.notification.is_none());
            assert!(after.retire);
        }
        assert_eq!(t.state, TrackerState::Fired);
    }

    #[test]
    fn test_gain_tracker_stays_armed() {
        let mut t = tracker(TrackCondition::Gain {
            min: Some(20_000),
            max: Some(30_000),
        });

        // first sample only sets the baseline
        assert_eq!(t.observe(100_000), Observation::default());

        let hit = t.observe(125_000);
        assert!(!hit.retire);
        assert_eq!(hit.notification.as_ref().and_then(|n| n.gain), Some(25_000));

        // too small, too large, unchanged
        assert!(t.observe(130_000).notification.is_none());
        assert!(t.observe(170_000).notification.is_none());
        assert!(t.observe(170_000).notification.is_none());

        let again = t.observe(190_000);
        assert_eq!(again.notification.map(|n| n.gain), Some(Some(20_000)));
        assert_eq!(t.state, TrackerState::Armed);
        assert_eq!(t.last_observed_score, Some(190_000));
    }

    #[test]
    fn test_open_ended_gain_bounds() {
        let mut t = tracker(TrackCondition::Gain {
            min: None,
            max: Some(500),
        });
        t.observe(0);
        assert!(t.observe(0).notification.is_none());
        assert!(t.observe(400).notification.is_some());
        assert!(t.observe(1_000).notification.is_none());
    }

    #[test]
    fn test_score_drop_is_not_a_gain() {
        // the tier changed hands to a lower scorer
        let mut t = tracker(TrackCondition::Gain {
            min: None,
            max: None,
        });
        t.observe(50_000);
        assert!(t.observe(42_000).notification.is_none());
        assert_eq!(t.last_observed_score, Some(42_000));

        let gain = t.observe(43_000).notification.and_then(|n| n.gain);
        assert_eq!(gain, Some(1_000));
    }

    #[test]
    fn test_player_target_message() {
        let notification = Notification {
            owner_id: 1,
            channel_id: 2,
            target: TrackTarget::Player("123".into()),
            score: 50_000,
            gain: Some(1_500),
        };
        assert_eq!(
            notification.message(),
            "<@1> player `123` gained 1,500 points (now 50,000)"
        );
    }
}
