//! Matching-pairs engine.
//!
//! A [`Board`] is a shuffled deck where every [`Symbol`] appears exactly twice. Picks go through
//! [`Board::pick`], which never mutates in place: each transition returns the next board.

use rand::prelude::*;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::*;

/// Delay before a mismatched pair is turned face down again.
pub const MISMATCH_DELAY_MS: u64 = 1000;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    Pink,
    Red,
    Orange,
    Yellow,
    Teal,
    Green,
    Blue,
    Purple,
}

impl Symbol {
    pub const ALL: [Symbol; 8] = [
        Symbol::Pink,
        Symbol::Red,
        Symbol::Orange,
        Symbol::Yellow,
        Symbol::Teal,
        Symbol::Green,
        Symbol::Blue,
        Symbol::Purple,
    ];
}

pub type TileId = u16;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: TileId,
    pub symbol: Symbol,
    pub face_up: bool,
    pub locked: bool,
}

impl Tile {
    const fn face_down(id: TileId, symbol: Symbol) -> Self {
        Self {
            id,
            symbol,
            face_up: false,
            locked: false,
        }
    }
}

/// Selection phase of the board.
///
/// Valid transitions:
/// - Idle -> FirstPicked
/// - FirstPicked -> Idle (pair matched)
/// - FirstPicked -> Resolving (pair mismatched)
/// - Resolving -> Idle (mismatch timeout)
/// - Resolving -> FirstPicked (third pick hides the pair right away)
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    FirstPicked { first: TileId },
    Resolving {
        first: TileId,
        second: TileId,
        epoch: u64,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub pairs: usize,
    pub mismatch_delay_ms: u64,
}

impl MemoryConfig {
    pub fn new(pairs: usize) -> Self {
        Self {
            pairs: pairs.clamp(1, Symbol::ALL.len()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.pairs == 0 {
            Err(GameError::BoardTooSmall)
        } else if self.pairs > Symbol::ALL.len() {
            Err(GameError::TooManyPairs {
                max: Symbol::ALL.len(),
            })
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            pairs: Symbol::ALL.len(),
            mismatch_delay_ms: MISMATCH_DELAY_MS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    tiles: Vec<Tile>,
    phase: Phase,
    epoch: u64,
    mismatch_delay_ms: u64,
}

impl Board {
    /// Deals a fresh board from `seed`.
    pub fn generate(config: MemoryConfig, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        Self::generate_with_rng(config, &mut rng)
    }

    pub fn generate_with_rng<R: Rng + ?Sized>(config: MemoryConfig, rng: &mut R) -> Self {
        let pairs = if config.validate().is_err() {
            let clamped = MemoryConfig::new(config.pairs).pairs;
            log::warn!(
                "Cannot deal {} pairs, dealing {} instead",
                config.pairs,
                clamped
            );
            clamped
        } else {
            config.pairs
        };

        let mut symbols: Vec<Symbol> = Symbol::ALL[..pairs]
            .iter()
            .flat_map(|&symbol| [symbol, symbol])
            .collect();
        // Fisher-Yates, unbiased unlike sorting with a random comparator
        symbols.shuffle(rng);

        let mut board = Self::deal(&symbols);
        board.mismatch_delay_ms = config.mismatch_delay_ms;
        board
    }

    /// Builds a board in the given render order, tile ids follow the slice positions.
    pub fn from_symbols(symbols: &[Symbol]) -> Result<Self> {
        if symbols.is_empty() {
            return Err(GameError::BoardTooSmall);
        }
        if symbols.len() > Symbol::ALL.len() * 2 {
            return Err(GameError::TooManyPairs {
                max: Symbol::ALL.len(),
            });
        }
        for symbol in symbols {
            let copies = symbols.iter().filter(|&other| other == symbol).count();
            if copies != 2 {
                return Err(GameError::UnpairedSymbol);
            }
        }
        Ok(Self::deal(symbols))
    }

    fn deal(symbols: &[Symbol]) -> Self {
        let tiles = symbols
            .iter()
            .zip(0..)
            .map(|(&symbol, id)| Tile::face_down(id, symbol))
            .collect();
        Self {
            tiles,
            phase: Phase::Idle,
            epoch: 0,
            mismatch_delay_ms: MISMATCH_DELAY_MS,
        }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.iter().find(|tile| tile.id == id)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pair_count(&self) -> usize {
        self.tiles.len() / 2
    }

    pub fn locked_count(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.locked).count()
    }

    pub fn matched_pairs(&self) -> usize {
        self.locked_count() / 2
    }

    pub fn is_won(&self) -> bool {
        self.tiles.iter().all(|tile| tile.locked)
    }

    pub fn mismatch_delay_ms(&self) -> u64 {
        self.mismatch_delay_ms
    }

    /// Epoch of the mismatched pair waiting to be hidden, if any.
    pub fn pending_mismatch(&self) -> Option<u64> {
        match self.phase {
            Phase::Resolving { epoch, .. } => Some(epoch),
            _ => None,
        }
    }

    /// Flips the picked tile. Unknown, face-up and locked tiles are ignored.
    pub fn pick(&self, id: TileId) -> Self {
        let Some(index) = self.index_of(id) else {
            log::trace!("pick of unknown tile {}", id);
            return self.clone();
        };
        let picked = self.tiles[index];
        if picked.face_up || picked.locked {
            return self.clone();
        }

        let mut next = self.clone();
        if let Phase::Resolving { first, second, .. } = next.phase {
            log::trace!("third pick hides mismatched {} and {}", first, second);
            next.set_face_up(first, false);
            next.set_face_up(second, false);
            next.phase = Phase::Idle;
        }
        next.tiles[index].face_up = true;

        next.phase = match next.phase {
            Phase::Idle | Phase::Resolving { .. } => Phase::FirstPicked { first: id },
            Phase::FirstPicked { first } => {
                let first_symbol = next.tile(first).map(|tile| tile.symbol);
                if first_symbol == Some(picked.symbol) {
                    next.set_locked(first);
                    next.set_locked(id);
                    log::debug!("matched {:?} ({} and {})", picked.symbol, first, id);
                    Phase::Idle
                } else {
                    next.epoch += 1;
                    log::debug!("mismatch {} and {}, epoch {}", first, id, next.epoch);
                    Phase::Resolving {
                        first,
                        second: id,
                        epoch: next.epoch,
                    }
                }
            }
        };
        next
    }

    /// Hides the mismatched pair of `epoch`; a stale epoch leaves the board unchanged.
    pub fn resolve_mismatch(&self, epoch: u64) -> Self {
        match self.phase {
            Phase::Resolving {
                first,
                second,
                epoch: pending,
            } if pending == epoch => {
                let mut next = self.clone();
                next.set_face_up(first, false);
                next.set_face_up(second, false);
                next.phase = Phase::Idle;
                next
            }
            _ => {
                log::trace!("ignoring stale mismatch epoch {}", epoch);
                self.clone()
            }
        }
    }

    fn index_of(&self, id: TileId) -> Option<usize> {
        self.tiles.iter().position(|tile| tile.id == id)
    }

    fn set_face_up(&mut self, id: TileId, face_up: bool) {
        if let Some(index) = self.index_of(id) {
            self.tiles[index].face_up = face_up;
        }
    }

    fn set_locked(&mut self, id: TileId) {
        if let Some(index) = self.index_of(id) {
            self.tiles[index].face_up = true;
            self.tiles[index].locked = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Symbol::*;

    fn board(symbols: &[Symbol]) -> Board {
        Board::from_symbols(symbols).unwrap()
    }

    fn assert_invariants(board: &Board) {
        assert_eq!(board.locked_count() % 2, 0);
        assert!(board.tiles().iter().all(|tile| !tile.locked || tile.face_up));
    }

    #[test]
    fn generate_deals_two_of_each_symbol_face_down() {
        let board = Board::generate(MemoryConfig::default(), 7);

        assert_eq!(board.tiles().len(), 16);
        for symbol in Symbol::ALL {
            let count = board.tiles().iter().filter(|t| t.symbol == symbol).count();
            assert_eq!(count, 2);
        }
        assert!(board.tiles().iter().all(|t| !t.face_up && !t.locked));
        assert_eq!(board.phase(), Phase::Idle);
    }

    #[test]
    fn generate_is_deterministic_per_seed() {
        let config = MemoryConfig::default();
        assert_eq!(Board::generate(config, 42), Board::generate(config, 42));
    }

    #[test]
    fn generate_clamps_pair_count() {
        let config = MemoryConfig {
            pairs: 20,
            ..MemoryConfig::default()
        };
        assert_eq!(Board::generate(config, 1).pair_count(), Symbol::ALL.len());
    }

    #[test]
    fn shuffle_moves_tiles_around() {
        // identity order for every seed would mean no shuffle at all
        let config = MemoryConfig::default();
        let shuffled = (0..8).any(|seed| {
            Board::generate(config, seed)
                .tiles()
                .iter()
                .zip(0..)
                .any(|(tile, position)| tile.id != position)
        });
        assert!(shuffled);
    }

    #[test]
    fn from_symbols_rejects_unpaired_symbols() {
        assert_eq!(
            Board::from_symbols(&[Pink, Red]),
            Err(GameError::UnpairedSymbol)
        );
        assert_eq!(
            Board::from_symbols(&[Pink, Pink, Pink]),
            Err(GameError::UnpairedSymbol)
        );
        assert_eq!(Board::from_symbols(&[]), Err(GameError::BoardTooSmall));
    }

    #[test]
    fn matching_pair_locks_both_tiles() {
        let board = board(&[Pink, Red, Pink, Red]);

        let first = board.pick(0);
        assert_eq!(first.phase(), Phase::FirstPicked { first: 0 });
        assert!(first.tile(0).unwrap().face_up);

        let matched = first.pick(2);
        assert_eq!(matched.phase(), Phase::Idle);
        assert!(matched.tile(0).unwrap().locked);
        assert!(matched.tile(2).unwrap().locked);
        assert_eq!(matched.matched_pairs(), 1);
        assert!(!matched.is_won());
        assert_invariants(&matched);
    }

    #[test]
    fn mismatch_waits_for_resolution() {
        let board = board(&[Pink, Red, Pink, Red]);

        let shown = board.pick(0).pick(1);
        assert_eq!(
            shown.phase(),
            Phase::Resolving {
                first: 0,
                second: 1,
                epoch: 1
            }
        );
        assert!(shown.tile(0).unwrap().face_up);
        assert!(shown.tile(1).unwrap().face_up);

        let hidden = shown.resolve_mismatch(1);
        assert_eq!(hidden.phase(), Phase::Idle);
        assert!(hidden.tiles().iter().all(|t| !t.face_up));
    }

    #[test]
    fn third_pick_hides_mismatched_pair_immediately() {
        let board = board(&[Pink, Red, Pink, Red]);

        let shown = board.pick(0).pick(1);
        let third = shown.pick(2);

        assert_eq!(third.phase(), Phase::FirstPicked { first: 2 });
        assert!(!third.tile(0).unwrap().face_up);
        assert!(!third.tile(1).unwrap().face_up);
        assert!(third.tile(2).unwrap().face_up);
        assert_eq!(third.pending_mismatch(), None);
    }

    #[test]
    fn stale_epoch_does_not_touch_newer_board() {
        let board = board(&[Pink, Red, Pink, Red]);

        let stale_epoch = board.pick(0).pick(1).pending_mismatch().unwrap();
        let newer = board.pick(0).pick(1).pick(2).pick(3);
        let newer_epoch = newer.pending_mismatch().unwrap();
        assert_ne!(stale_epoch, newer_epoch);

        assert_eq!(newer.resolve_mismatch(stale_epoch), newer);
    }

    #[test]
    fn picks_on_face_up_locked_or_unknown_tiles_are_ignored() {
        let board = board(&[Pink, Red, Pink, Red]);

        let first = board.pick(0);
        assert_eq!(first.pick(0), first);
        assert_eq!(first.pick(99), first);

        let matched = first.pick(2);
        assert_eq!(matched.pick(2), matched);

        let shown = matched.pick(1).pick(3);
        assert_eq!(shown.phase(), Phase::Idle);
        assert!(shown.is_won());
    }

    #[test]
    fn all_tiles_locked_wins() {
        let symbols: Vec<_> = Symbol::ALL.iter().flat_map(|&s| [s, s]).collect();
        let mut board = board(&symbols);

        for id in (0..symbols.len() as TileId).step_by(2) {
            board = board.pick(id).pick(id + 1);
            assert_invariants(&board);
        }

        assert!(board.is_won());
        assert_eq!(board.locked_count(), board.tiles().len());
    }
}
