use minigames_protocol::GameId;

use super::{Delayed, Engine, Outcome};
use crate::memory::{Board, TileId};
use crate::minefield::{FieldState, Grid, MinefieldIntent};
use crate::snake::{Direction, SnakeGame};

impl Engine for Board {
    type Intent = TileId;

    const GAME: GameId = GameId::Memory;

    fn apply(&self, intent: &TileId) -> Self {
        self.pick(*intent)
    }

    fn outcome(&self) -> Option<Outcome> {
        self.is_won().then_some(Outcome::Won)
    }

    fn delayed(&self) -> Option<Delayed> {
        self.pending_mismatch().map(|epoch| Delayed {
            epoch,
            delay_ms: self.mismatch_delay_ms(),
        })
    }

    fn resolve_delayed(&self, epoch: u64) -> Self {
        self.resolve_mismatch(epoch)
    }
}

impl Engine for Grid {
    type Intent = MinefieldIntent;

    const GAME: GameId = GameId::Minesweeper;

    fn apply(&self, intent: &MinefieldIntent) -> Self {
        Grid::apply(self, *intent)
    }

    fn outcome(&self) -> Option<Outcome> {
        match self.state() {
            FieldState::Playing => None,
            FieldState::Won => Some(Outcome::Won),
            FieldState::Lost => Some(Outcome::Lost),
        }
    }
}

impl Engine for SnakeGame {
    type Intent = Direction;

    const GAME: GameId = GameId::Snake;

    fn apply(&self, intent: &Direction) -> Self {
        self.enqueue_intent(*intent)
    }

    fn outcome(&self) -> Option<Outcome> {
        if self.is_won() {
            Some(Outcome::Won)
        } else {
            self.is_over().then_some(Outcome::Over)
        }
    }

    fn score(&self) -> Option<u32> {
        Some(u32::try_from(SnakeGame::score(self)).unwrap_or(u32::MAX))
    }

    fn tick_interval_ms(&self) -> Option<u64> {
        if self.is_over() {
            return None;
        }
        Some(self.speed().round().max(1.0) as u64)
    }

    fn tick(&self) -> Self {
        SnakeGame::tick(self)
    }
}
