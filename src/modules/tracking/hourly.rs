use super::sample::{RankSample, ScorePoint};
use crate::util::HOUR_MS;

/// First index whose timestamp is at or after `threshold`. Timestamps must be
/// sorted. Falls back to 0 when every timestamp is older than the threshold.
pub(crate) fn last_hour_index(timestamps: &[i64], threshold: i64) -> usize {
    let idx = timestamps.partition_point(|&t| t < threshold);
    if idx == timestamps.len() {
        0
    } else {
        idx
    }
}

pub(crate) fn delta(values: &[i64], idx: usize) -> i64 {
    match (values.last(), values.get(idx)) {
        (Some(last), Some(start)) => last - start,
        _ => 0,
    }
}

/// Score gained over the hour before `now`.
pub(crate) fn last_hour_gain<T: ScorePoint>(samples: &[T], now: i64) -> i64 {
    let timestamps: Vec<i64> = samples.iter().map(ScorePoint::timestamp).collect();
    let scores: Vec<i64> = samples.iter().map(ScorePoint::score).collect();

    delta(&scores, last_hour_index(&timestamps, now - HOUR_MS))
}

/// Games counted over the hour before `now`, from stored game numbers.
pub(crate) fn last_hour_games(samples: &[RankSample], now: i64) -> i64 {
    let timestamps: Vec<i64> = samples.iter().map(|s| s.timestamp).collect();
    let games: Vec<i64> = samples.iter().map(|s| i64::from(s.game_num)).collect();

    delta(&games, last_hour_index(&timestamps, now - HOUR_MS))
}

/// Largest score gain across any window of at most one hour.
pub(crate) fn peak_hourly_gain<T: ScorePoint>(samples: &[T]) -> i64 {
    let mut peak = 0;
    let mut left = 0;

    for right in 0..samples.len() {
        while samples[right].timestamp() - samples[left].timestamp() > HOUR_MS {
            left += 1;
        }
        peak = peak.max(samples[right].score() - samples[left].score());
    }

    peak
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(timestamp: i64, score: i64, game_num: u32) -> RankSample {
        RankSample {
            event_id: 1,
            tier: 1,
            timestamp,
            score,
            player_id: "p".into(),
            game_num,
        }
    }

    #[test]
    fn test_last_hour_index() {
        assert_eq!(last_hour_index(&[0, 3_600_001, 7_200_001], 3_600_001), 1);
        assert_eq!(last_hour_index(&[0, 1000, 3_700_000, 3_800_000], 100_000), 2);
        // all older than the threshold
        assert_eq!(last_hour_index(&[0, 10, 20], 1_000), 0);
        // series shorter than an hour
        assert_eq!(last_hour_index(&[5_000, 6_000], 1_000), 0);
        assert_eq!(last_hour_index(&[], 1_000), 0);
    }

    #[test]
    fn test_delta() {
        assert_eq!(delta(&[10, 20, 45], 1), 25);
        assert_eq!(delta(&[10, 20, 45], 0), 35);
        assert_eq!(delta(&[], 0), 0);
    }

    #[test]
    fn test_last_hour_gain_and_games() {
        let samples = vec![
            sample(0, 0, 0),
            sample(30 * 60_000, 1_000, 1),
            sample(HOUR_MS, 2_000, 2),
            sample(90 * 60_000, 5_000, 4),
        ];
        let now = 90 * 60_000;

        // window starts at 30 minutes
        assert_eq!(last_hour_gain(&samples, now), 4_000);
        assert_eq!(last_hour_games(&samples, now), 3);
    }

    #[test]
    fn test_peak_hourly_gain() {
        let samples = vec![
            sample(0, 0, 0),
            sample(HOUR_MS / 2, 100, 0),
            sample(HOUR_MS, 200, 0),
            // burst: 5000 between the 60 and 100 minute marks
            sample(HOUR_MS + 20 * 60_000, 3_200, 0),
            sample(HOUR_MS + 40 * 60_000, 5_200, 0),
            sample(3 * HOUR_MS, 5_300, 0),
        ];

        assert_eq!(peak_hourly_gain(&samples), 5_000);
        assert_eq!(peak_hourly_gain::<RankSample>(&[]), 0);
    }
}
