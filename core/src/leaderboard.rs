//! Score stores behind the result modal.
//!
//! A [`Leaderboard`] keeps finished runs per game id and hands back the best few in a requested
//! order. Failures never reach the player: [`fetch_top_or_empty`] and [`submit_score_or_log`]
//! log them and carry on.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use minigames_protocol::{top_records, ScoreRecord, SortRule, LEADERBOARD_LIMIT};

use crate::{LeaderboardConfig, LeaderboardError};

pub trait Leaderboard {
    /// Best records of `game_id` ordered by `rules`, at most the store's limit.
    fn fetch_top(
        &self,
        game_id: &str,
        rules: &[SortRule],
    ) -> Result<Vec<ScoreRecord>, LeaderboardError>;

    fn submit_score(&mut self, game_id: &str, record: &ScoreRecord)
        -> Result<(), LeaderboardError>;
}

pub fn fetch_top_or_empty<L: Leaderboard + ?Sized>(
    leaderboard: &L,
    game_id: &str,
    rules: &[SortRule],
) -> Vec<ScoreRecord> {
    leaderboard
        .fetch_top(game_id, rules)
        .unwrap_or_else(|err| {
            log::warn!("Error getting {} leaderboard: {}", game_id, err);
            Vec::new()
        })
}

/// Returns whether the record was stored.
pub fn submit_score_or_log<L: Leaderboard + ?Sized>(
    leaderboard: &mut L,
    game_id: &str,
    record: &ScoreRecord,
) -> bool {
    match leaderboard.submit_score(game_id, record) {
        Ok(()) => {
            log::debug!("Saved {} score for {}", game_id, record.name);
            true
        }
        Err(err) => {
            log::warn!("Error saving {} score: {}", game_id, err);
            false
        }
    }
}

#[derive(Clone, Debug)]
pub struct MemoryLeaderboard {
    limit: usize,
    games: HashMap<String, Vec<ScoreRecord>>,
}

impl MemoryLeaderboard {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            games: HashMap::new(),
        }
    }

    pub fn from_config(config: &LeaderboardConfig) -> Self {
        Self::with_limit(config.limit)
    }

    /// Every stored record of `game_id` in submission order.
    pub fn records(&self, game_id: &str) -> &[ScoreRecord] {
        self.games.get(game_id).map(Vec::as_slice).unwrap_or_default()
    }
}

impl Default for MemoryLeaderboard {
    fn default() -> Self {
        Self::with_limit(LEADERBOARD_LIMIT)
    }
}

impl Leaderboard for MemoryLeaderboard {
    fn fetch_top(
        &self,
        game_id: &str,
        rules: &[SortRule],
    ) -> Result<Vec<ScoreRecord>, LeaderboardError> {
        Ok(top_records(
            self.records(game_id).iter().cloned(),
            rules,
            self.limit,
        ))
    }

    fn submit_score(
        &mut self,
        game_id: &str,
        record: &ScoreRecord,
    ) -> Result<(), LeaderboardError> {
        self.games
            .entry(game_id.to_owned())
            .or_default()
            .push(record.clone());
        Ok(())
    }
}

/// One `<game_id>.jsonl` file per game inside a directory, one record per line.
#[derive(Clone, Debug)]
pub struct JsonLinesLeaderboard {
    dir: PathBuf,
    limit: usize,
}

impl JsonLinesLeaderboard {
    /// Uses `dir`, creating it when missing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LeaderboardError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            limit: LEADERBOARD_LIMIT,
        })
    }

    pub fn open_with_config(
        dir: impl Into<PathBuf>,
        config: &LeaderboardConfig,
    ) -> Result<Self, LeaderboardError> {
        Ok(Self::open(dir)?.with_limit(config.limit))
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, game_id: &str) -> Result<PathBuf, LeaderboardError> {
        let valid = !game_id.is_empty()
            && game_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(LeaderboardError::Unavailable(format!(
                "invalid game id {:?}",
                game_id
            )));
        }
        Ok(self.dir.join(format!("{}.jsonl", game_id)))
    }
}

impl Leaderboard for JsonLinesLeaderboard {
    fn fetch_top(
        &self,
        game_id: &str,
        rules: &[SortRule],
    ) -> Result<Vec<ScoreRecord>, LeaderboardError> {
        let path = self.path_for(game_id)?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match ScoreRecord::from_json_line(line) {
                Ok(record) => records.push(record),
                Err(err) => {
                    log::warn!("Skipping line {} of {}: {}", index + 1, path.display(), err)
                }
            }
        }
        Ok(top_records(records, rules, self.limit))
    }

    fn submit_score(
        &mut self,
        game_id: &str,
        record: &ScoreRecord,
    ) -> Result<(), LeaderboardError> {
        let path = self.path_for(game_id)?;
        let line = record.to_json_line()?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}
