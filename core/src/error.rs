use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Too many mines")]
    TooManyMines,
    #[error("Too many pairs, only {max} symbols exist")]
    TooManyPairs { max: usize },
    #[error("Every symbol must appear exactly twice")]
    UnpairedSymbol,
    #[error("Board too small")]
    BoardTooSmall,
    #[error("Speed ramp must keep the tick interval positive and never grow it")]
    InvalidSpeed,
    #[error("Snake segments must be distinct, adjacent and clear of the food")]
    InvalidSnake,
}

pub type Result<T> = core::result::Result<T, GameError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(#[from] GameError),
}

#[derive(Error, Debug)]
pub enum LeaderboardError {
    #[error("Leaderboard storage failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed score record: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("Leaderboard unavailable: {0}")]
    Unavailable(String),
}
