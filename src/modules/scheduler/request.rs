use serde::{Deserialize, Deserializer};

/// One outbound call to the game API.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ApiRequest {
    Profile { user_id: String },
    Ranking { event_id: u32, params: RankingParams },
    Master { resource: String },
}

impl ApiRequest {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Profile { .. } => "profile",
            Self::Ranking { .. } => "ranking",
            Self::Master { .. } => "master",
        }
    }
}

/// Selects a window of the event ranking, either around a rank or around a player.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct RankingParams {
    pub(crate) target_rank: Option<u32>,
    pub(crate) target_user_id: Option<String>,
    pub(crate) lower_limit: Option<u32>,
    pub(crate) higher_limit: Option<u32>,
}

impl RankingParams {
    pub(crate) fn for_rank(rank: u32) -> Self {
        Self {
            target_rank: Some(rank),
            lower_limit: Some(0),
            ..Default::default()
        }
    }

    pub(crate) fn for_user(user_id: &str) -> Self {
        Self {
            target_user_id: Some(user_id.to_owned()),
            lower_limit: Some(0),
            ..Default::default()
        }
    }

    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(rank) = self.target_rank {
            query.push(("targetRank", rank.to_string()));
        }
        if let Some(user_id) = &self.target_user_id {
            query.push(("targetUserId", user_id.clone()));
        }
        if let Some(lower) = self.lower_limit {
            query.push(("lowerLimit", lower.to_string()));
        }
        if let Some(higher) = self.higher_limit {
            query.push(("higherLimit", higher.to_string()));
        }
        query
    }
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct RankingResponse {
    #[serde(default)]
    pub(crate) rankings: Vec<RankingEntry>,
}

impl RankingResponse {
    pub(crate) fn at_rank(&self, rank: u32) -> Option<&RankingEntry> {
        self.rankings.iter().find(|e| e.rank == rank)
    }

    pub(crate) fn for_user(&self, user_id: &str) -> Option<&RankingEntry> {
        self.rankings.iter().find(|e| e.user_id == user_id)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RankingEntry {
    pub(crate) rank: u32,
    pub(crate) score: i64,
    #[serde(deserialize_with = "player_id")]
    pub(crate) user_id: String,
    #[serde(default)]
    pub(crate) name: String,
}

// player ids overflow f64 precision so the API sends them as either numbers or strings
fn player_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(u64),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Text(id) => id,
        Repr::Number(id) => id.to_string(),
    })
}
