//! Leaderboard records as they are stored and exchanged with score stores.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most entries a leaderboard read returns.
pub const LEADERBOARD_LIMIT: usize = 10;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameId {
    Memory,
    Minesweeper,
    Snake,
}

impl GameId {
    pub const ALL: [GameId; 3] = [GameId::Memory, GameId::Minesweeper, GameId::Snake];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Minesweeper => "minesweeper",
            Self::Snake => "snake",
        }
    }

    /// Ordering used by the result modal of each game.
    pub const fn default_sort_rules(self) -> &'static [SortRule] {
        const FASTEST: &[SortRule] = &[SortRule::asc(SortField::TimeMs)];
        const LONGEST: &[SortRule] = &[
            SortRule::desc(SortField::Score),
            SortRule::asc(SortField::TimeMs),
        ];
        match self {
            Self::Memory | Self::Minesweeper => FASTEST,
            Self::Snake => LONGEST,
        }
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("Unknown game id {0:?}")]
pub struct UnknownGame(pub String);

impl FromStr for GameId {
    type Err = UnknownGame;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameId::ALL
            .into_iter()
            .find(|game| game.as_str() == s)
            .ok_or_else(|| UnknownGame(s.to_owned()))
    }
}

/// A single finished run as kept by a score store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub name: String,
    pub time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

impl ScoreRecord {
    pub fn new(name: impl Into<String>, time_ms: u64, score: Option<u32>) -> Self {
        Self {
            name: name.into(),
            time_ms,
            score,
        }
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    TimeMs,
    Score,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRule {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortRule {
    pub const fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Asc,
        }
    }

    pub const fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Desc,
        }
    }

    fn compare(&self, a: &ScoreRecord, b: &ScoreRecord) -> Ordering {
        let ordering = match self.field {
            SortField::TimeMs => a.time_ms.cmp(&b.time_ms),
            SortField::Score => a.score.cmp(&b.score),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Compares two records by each rule in turn, the first non-equal rule wins.
pub fn compare_records(a: &ScoreRecord, b: &ScoreRecord, rules: &[SortRule]) -> Ordering {
    rules
        .iter()
        .map(|rule| rule.compare(a, b))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Sorts by `rules` keeping insertion order for ties, then keeps the first `limit`.
pub fn top_records(
    records: impl IntoIterator<Item = ScoreRecord>,
    rules: &[SortRule],
    limit: usize,
) -> Vec<ScoreRecord> {
    let mut records: Vec<_> = records.into_iter().collect();
    records.sort_by(|a, b| compare_records(a, b, rules));
    records.truncate(limit);
    records
}
