/// Snapshot of the score held at a leaderboard position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RankSample {
    pub(crate) event_id: u32,
    pub(crate) tier: u32,
    /// ms since epoch
    pub(crate) timestamp: i64,
    pub(crate) score: i64,
    pub(crate) player_id: String,
    pub(crate) game_num: u32,
}

/// Snapshot of a specific game account's rank and score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UserRankSample {
    pub(crate) user_id: String,
    pub(crate) tier: u32,
    pub(crate) event_id: u32,
    pub(crate) timestamp: i64,
    pub(crate) score: i64,
}

/// Anything with a timestamp and a cumulative score.
pub(crate) trait ScorePoint {
    fn timestamp(&self) -> i64;
    fn score(&self) -> i64;
}

impl ScorePoint for RankSample {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn score(&self) -> i64 {
        self.score
    }
}

impl ScorePoint for UserRankSample {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn score(&self) -> i64 {
        self.score
    }
}
