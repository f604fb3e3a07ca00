use super::sample::RankSample;
use crate::util::HOUR_MS;

pub(crate) const MIN_GAME_GAIN: i64 = 100;
pub(crate) const MAX_GAME_GAIN: i64 = 75000;

/// Range of score gains counted as a single play, `min_gain <= gain < max_gain`.
///
/// Anything outside it is either noise or several plays merged between two
/// polls. The defaults match the data already stored, so retune with care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GameBounds {
    pub(crate) min_gain: i64,
    pub(crate) max_gain: i64,
}

impl Default for GameBounds {
    fn default() -> Self {
        Self {
            min_gain: MIN_GAME_GAIN,
            max_gain: MAX_GAME_GAIN,
        }
    }
}

impl GameBounds {
    pub(crate) fn is_game(&self, gain: i64) -> bool {
        gain >= self.min_gain && gain < self.max_gain
    }
}

/// Game counter for a new sample given the player's latest stored one.
pub(crate) fn next_game_num(previous: Option<&RankSample>, score: i64, bounds: &GameBounds) -> u32 {
    match previous {
        None => 0,
        Some(prev) if score > prev.score && bounds.is_game(score - prev.score) => {
            prev.game_num + 1
        }
        Some(prev) => prev.game_num,
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct GamesSummary {
    /// gain of every classified game, in play order
    pub(crate) points_per_game: Vec<i64>,
    /// classified games per hour since the bucket origin
    pub(crate) hourly: Vec<u32>,
    /// input samples with `game_num` restamped
    pub(crate) annotated: Vec<RankSample>,
}

impl GamesSummary {
    pub(crate) fn game_count(&self) -> usize {
        self.points_per_game.len()
    }

    pub(crate) fn has_games(&self) -> bool {
        !self.points_per_game.is_empty()
    }

    pub(crate) fn average_points(&self) -> Option<f64> {
        if !self.has_games() {
            return None;
        }
        Some(self.points_per_game.iter().sum::<i64>() as f64 / self.game_count() as f64)
    }

    /// Hourly counts split into days of 24 hours, last day zero padded.
    pub(crate) fn heatmap(&self) -> Vec<[u32; 24]> {
        self.hourly
            .chunks(24)
            .map(|day| {
                let mut row = [0; 24];
                row[..day.len()].copy_from_slice(day);
                row
            })
            .collect()
    }

    /// Hour index (since origin) with the most games.
    pub(crate) fn busiest_hour(&self) -> Option<(usize, u32)> {
        self.hourly
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, count)| *count > 0)
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
    }
}

/// Walks a player's samples in timestamp order and infers discrete games from
/// score gains. Samples before `origin` are not bucketed.
pub(crate) fn infer_games(samples: &[RankSample], origin: i64, bounds: &GameBounds) -> GamesSummary {
    let mut summary = GamesSummary::default();
    let Some(first) = samples.first() else {
        return summary;
    };

    let mut last_score = first.score;
    let mut game_num = 0;

    for sample in samples {
        if sample.score > last_score {
            let gain = sample.score - last_score;
            if bounds.is_game(gain) {
                game_num += 1;
                summary.points_per_game.push(gain);

                if sample.timestamp >= origin {
                    let bucket = ((sample.timestamp - origin) / HOUR_MS) as usize;
                    if summary.hourly.len() <= bucket {
                        summary.hourly.resize(bucket + 1, 0);
                    }
                    summary.hourly[bucket] += 1;
                }
            }
            last_score = sample.score;
        }

        summary.annotated.push(RankSample {
            game_num,
            ..sample.clone()
        });
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(scores: &[i64], step_ms: i64) -> Vec<RankSample> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| RankSample {
                event_id: 1,
                tier: 100,
                timestamp: i as i64 * step_ms,
                score,
                player_id: "p".into(),
                game_num: 0,
            })
            .collect()
    }

    #[test]
    fn test_only_plausible_gains_count_as_games() {
        // gains of 50, 150, 76000, 200
        let samples = series(&[0, 50, 200, 76200, 76400], 60_000);
        let summary = infer_games(&samples, 0, &GameBounds::default());

        assert_eq!(summary.points_per_game, vec![150, 200]);
        assert_eq!(summary.game_count(), 2);
        assert_eq!(summary.average_points(), Some(175.0));
        assert_eq!(
            summary
                .annotated
                .iter()
                .map(|s| s.game_num)
                .collect::<Vec<_>>(),
            vec![0, 0, 1, 1, 2]
        );
    }

    #[test]
    fn test_bounds_are_half_open() {
        let bounds = GameBounds::default();
        assert!(!bounds.is_game(99));
        assert!(bounds.is_game(100));
        assert!(bounds.is_game(74_999));
        assert!(!bounds.is_game(75_000));
    }

    #[test]
    fn test_no_games_is_reported_empty() {
        let samples = series(&[1000, 1000, 1010, 200_000], 60_000);
        let summary = infer_games(&samples, 0, &GameBounds::default());
        assert!(!summary.has_games());
        assert_eq!(summary.average_points(), None);
        assert_eq!(summary.busiest_hour(), None);
        assert_eq!(summary.annotated.len(), 4);

        assert!(!infer_games(&[], 0, &GameBounds::default()).has_games());
    }

    #[test]
    fn test_hourly_buckets_and_heatmap() {
        // one sample every 20 minutes, each a 1000 point game
        let scores: Vec<i64> = (0..=9).map(|i| i * 1000).collect();
        let samples = series(&scores, 20 * 60_000);
        let summary = infer_games(&samples, 0, &GameBounds::default());

        // samples at 20,40 min -> hour 0; 60,80,100 -> hour 1; ...
        assert_eq!(summary.hourly, vec![2, 3, 3, 1]);
        assert_eq!(summary.busiest_hour(), Some((1, 3)));

        let heatmap = summary.heatmap();
        assert_eq!(heatmap.len(), 1);
        assert_eq!(&heatmap[0][..5], &[2, 3, 3, 1, 0]);
    }

    #[test]
    fn test_next_game_num() {
        let bounds = GameBounds::default();
        let prev = RankSample {
            event_id: 1,
            tier: 1,
            timestamp: 0,
            score: 10_000,
            player_id: "p".into(),
            game_num: 4,
        };

        assert_eq!(next_game_num(None, 10_000, &bounds), 0);
        assert_eq!(next_game_num(Some(&prev), 10_000, &bounds), 4);
        assert_eq!(next_game_num(Some(&prev), 12_000, &bounds), 5);
        assert_eq!(next_game_num(Some(&prev), 200_000, &bounds), 4);
    }
}
