//! Minefield engine.
//!
//! [`Grid`] holds mine placement and player-visible cell state together. Transitions take `&self`
//! and return the next grid, moves on a finished grid are ignored.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;
pub use generator::*;
pub use input::*;

mod generator;
mod input;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinefieldConfig {
    pub size: Coord2,
    pub mines: CellCount,
}

impl MinefieldConfig {
    pub const fn new_unchecked(size: Coord2, mines: CellCount) -> Self {
        Self { size, mines }
    }

    pub fn new((size_x, size_y): Coord2, mines: CellCount) -> Self {
        let size_x = size_x.clamp(1, Coord::MAX);
        let size_y = size_y.clamp(1, Coord::MAX);
        let mines = mines.clamp(1, mult(size_x, size_y));
        Self::new_unchecked((size_x, size_y), mines)
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.size.0, self.size.1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.size.0 == 0 || self.size.1 == 0 {
            Err(GameError::BoardTooSmall)
        } else if self.mines > self.total_cells() {
            Err(GameError::TooManyMines)
        } else {
            Ok(())
        }
    }
}

impl Default for MinefieldConfig {
    fn default() -> Self {
        Self::new_unchecked((10, 10), 15)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub is_mine: bool,
    pub is_open: bool,
    pub is_flagged: bool,
}

/// Valid transitions:
/// - Playing -> Won
/// - Playing -> Lost
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldState {
    #[default]
    Playing,
    Won,
    Lost,
}

impl FieldState {
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MinefieldIntent {
    Reveal(Coord2),
    ToggleFlag(Coord2),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    cells: Array2<Cell>,
    mine_count: CellCount,
    state: FieldState,
    triggered_mine: Option<Coord2>,
}

impl Grid {
    pub fn from_mine_mask(mine_mask: &Array2<bool>) -> Self {
        let cells = mine_mask.map(|&is_mine| Cell {
            is_mine,
            ..Cell::default()
        });
        let mine_count = mine_mask
            .iter()
            .filter(|&&is_mine| is_mine)
            .count()
            .try_into()
            .unwrap_or(CellCount::MAX);
        Self {
            cells,
            mine_count,
            state: FieldState::Playing,
            triggered_mine: None,
        }
    }

    pub fn from_mine_coords(size: Coord2, mine_coords: &[Coord2]) -> Result<Self> {
        let mut mine_mask: Array2<bool> = Array2::default(size.to_nd_index());
        for &coords in mine_coords {
            if !in_bounds(coords, size) {
                return Err(GameError::InvalidCoords);
            }
            mine_mask[coords.to_nd_index()] = true;
        }
        Ok(Self::from_mine_mask(&mine_mask))
    }

    pub fn size(&self) -> Coord2 {
        grid_size(&self.cells)
    }

    pub fn state(&self) -> FieldState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn cell_at(&self, coords: Coord2) -> Option<Cell> {
        self.cells.get(coords.to_nd_index()).copied()
    }

    pub fn cells(&self) -> &Array2<Cell> {
        &self.cells
    }

    pub fn triggered_mine(&self) -> Option<Coord2> {
        self.triggered_mine
    }

    pub fn open_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_open).count()
    }

    pub fn flag_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_flagged).count()
    }

    /// How many mines have not been flagged yet, negative with too many flags.
    pub fn mines_left(&self) -> isize {
        (self.mine_count as isize) - (self.flag_count() as isize)
    }

    /// Mines among the up to eight cells around `coords`.
    pub fn neighbor_mine_count(&self, coords: Coord2) -> u8 {
        if !self.contains(coords) {
            return 0;
        }
        let count = self
            .cells
            .iter_neighbors(coords)
            .filter(|&pos| self.cells[pos.to_nd_index()].is_mine)
            .count();
        // at most eight neighbors
        count as u8
    }

    pub fn apply(&self, intent: MinefieldIntent) -> Self {
        match intent {
            MinefieldIntent::Reveal(coords) => self.reveal(coords),
            MinefieldIntent::ToggleFlag(coords) => self.toggle_flag(coords),
        }
    }

    /// Opens a cell, flooding outwards from cells without neighboring mines. Opening a mine loses.
    pub fn reveal(&self, coords: Coord2) -> Self {
        let Some(cell) = self.playable_cell(coords) else {
            return self.clone();
        };
        if cell.is_open {
            return self.clone();
        }

        let mut next = self.clone();
        if cell.is_mine {
            log::debug!("Hit mine at {:?}", coords);
            next.open_single(coords);
            next.lose(coords);
            return next;
        }

        next.flood_open(coords);
        next.check_won();
        next
    }

    /// Flags or unflags a closed cell.
    pub fn toggle_flag(&self, coords: Coord2) -> Self {
        let Some(cell) = self.playable_cell(coords) else {
            return self.clone();
        };
        if cell.is_open {
            return self.clone();
        }

        let mut next = self.clone();
        let target = &mut next.cells[coords.to_nd_index()];
        target.is_flagged = !target.is_flagged;
        log::trace!("Flag at {:?}: {}", coords, target.is_flagged);
        next.check_won();
        next
    }

    /// Ends the game after the mine at `coords` was opened. Unflagged mines and wrong flags are
    /// opened, correct flags stay. Coordinates without a mine change nothing.
    pub fn trigger_loss(&self, coords: Coord2) -> Self {
        let Some(cell) = self.playable_cell(coords) else {
            return self.clone();
        };
        if !cell.is_mine {
            log::trace!("No mine to trigger at {:?}", coords);
            return self.clone();
        }
        let mut next = self.clone();
        next.lose(coords);
        next
    }

    /// Every cell is either open or a flagged mine.
    pub fn check_win(&self) -> bool {
        self.cells
            .iter()
            .all(|cell| cell.is_open || (cell.is_flagged && cell.is_mine))
    }

    fn contains(&self, coords: Coord2) -> bool {
        in_bounds(coords, self.size())
    }

    fn playable_cell(&self, coords: Coord2) -> Option<Cell> {
        if self.is_finished() {
            return None;
        }
        self.cell_at(coords)
    }

    fn open_single(&mut self, coords: Coord2) {
        let cell = &mut self.cells[coords.to_nd_index()];
        cell.is_open = true;
        cell.is_flagged = false;
    }

    fn flood_open(&mut self, start: Coord2) {
        let mut to_visit = vec![start];
        while let Some(coords) = to_visit.pop() {
            if self.cells[coords.to_nd_index()].is_open {
                continue;
            }
            self.open_single(coords);

            let count = self.neighbor_mine_count(coords);
            log::trace!("Opened {:?}, mine count: {}", coords, count);
            if count == 0 {
                to_visit.extend(
                    self.cells
                        .iter_neighbors(coords)
                        .filter(|&pos| !self.cells[pos.to_nd_index()].is_open),
                );
            }
        }
    }

    fn check_won(&mut self) {
        if self.check_win() {
            log::debug!("Minefield cleared");
            self.state = FieldState::Won;
        }
    }

    fn lose(&mut self, coords: Coord2) {
        for cell in self.cells.iter_mut() {
            cell.is_open = cell.is_open || (cell.is_flagged != cell.is_mine);
            cell.is_flagged = cell.is_flagged && cell.is_mine;
        }
        self.state = FieldState::Lost;
        self.triggered_mine = Some(coords);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(size: Coord2, mines: &[Coord2]) -> Grid {
        Grid::from_mine_coords(size, mines).unwrap()
    }

    fn all_coords(size: Coord2) -> impl Iterator<Item = Coord2> {
        (0..size.0).flat_map(move |x| (0..size.1).map(move |y| (x, y)))
    }

    /// 10x10 with 15 mines: the right column, two cells above it and a pocket that walls off
    /// the safe corner (0, 9).
    fn fixture() -> Grid {
        let mut mines: Vec<Coord2> = (0..10).map(|y| (9, y)).collect();
        mines.extend([(8, 0), (8, 1), (0, 8), (1, 8), (1, 9)]);
        grid((10, 10), &mines)
    }

    #[test]
    fn neighbor_counts() {
        let grid = grid((3, 3), &[(0, 0), (2, 2)]);

        assert_eq!(grid.neighbor_mine_count((1, 1)), 2);
        assert_eq!(grid.neighbor_mine_count((2, 0)), 0);
        assert_eq!(grid.neighbor_mine_count((0, 1)), 1);
        assert_eq!(grid.neighbor_mine_count((7, 7)), 0);
    }

    #[test]
    fn from_mine_coords_rejects_out_of_bounds() {
        assert_eq!(
            Grid::from_mine_coords((2, 2), &[(2, 0)]),
            Err(GameError::InvalidCoords)
        );
    }

    #[test]
    fn reveal_numbered_cell_opens_only_that_cell() {
        let start = grid((3, 3), &[(0, 0)]);
        let next = start.reveal((1, 1));

        assert_eq!(next.open_count(), 1);
        assert!(next.cell_at((1, 1)).unwrap().is_open);
        assert_eq!(next.state(), FieldState::Playing);
    }

    #[test]
    fn reveal_flood_fills_fixture() {
        let start = fixture();
        let next = start.reveal((0, 0));

        assert_eq!(next.open_count(), 84);
        for coords in all_coords(next.size()) {
            let cell = next.cell_at(coords).unwrap();
            let expected = !cell.is_mine && coords != (0, 9);
            assert_eq!(cell.is_open, expected, "cell {:?}", coords);
        }
        assert_eq!(next.state(), FieldState::Playing);
        // the original grid value is untouched
        assert_eq!(start.open_count(), 0);
    }

    /// Rows top to bottom: `*` mine, a digit for an open cell, `#` for a closed safe cell.
    fn render(grid: &Grid) -> Vec<String> {
        let (size_x, size_y) = grid.size();
        (0..size_y)
            .map(|y| {
                (0..size_x)
                    .map(|x| {
                        let cell = grid.cell_at((x, y)).unwrap();
                        if cell.is_mine {
                            '*'
                        } else if cell.is_open {
                            char::from(b'0' + grid.neighbor_mine_count((x, y)))
                        } else {
                            '#'
                        }
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn seeded_board_reveal_matches_recorded_open_set() {
        let grid = RandomMinefieldGenerator::new(1).generate(MinefieldConfig::new((10, 10), 15));
        assert_eq!(grid.mine_count(), 15);
        assert_eq!(
            render(&grid),
            [
                "##########",
                "########*#",
                "#**##*##**",
                "####*#####",
                "##########",
                "#*########",
                "#########*",
                "##**######",
                "######*##*",
                "#*###*####",
            ]
        );

        assert_eq!(grid.neighbor_mine_count((6, 5)), 0);
        let next = grid.reveal((6, 5));
        assert_eq!(next.open_count(), 33);
        assert_eq!(
            render(&next),
            [
                "##########",
                "########*#",
                "#**##*##**",
                "####*21122",
                "##11110000",
                "#*10000011",
                "##3210001*",
                "##**11112#",
                "######*##*",
                "#*###*####",
            ]
        );
        assert_eq!(next.state(), FieldState::Playing);
    }

    #[test]
    fn flood_region_is_maximal_and_bordered() {
        let grid = RandomMinefieldGenerator::new(1).generate(MinefieldConfig::default());
        let zero = all_coords(grid.size())
            .find(|&c| !grid.cell_at(c).unwrap().is_mine && grid.neighbor_mine_count(c) == 0)
            .expect("seeded board has a zero cell");
        let next = grid.reveal(zero);

        for coords in all_coords(next.size()) {
            let cell = next.cell_at(coords).unwrap();
            assert!(!(cell.is_open && cell.is_mine));
            if cell.is_open && next.neighbor_mine_count(coords) == 0 {
                for pos in next.cells().iter_neighbors(coords) {
                    assert!(next.cell_at(pos).unwrap().is_open, "{:?} left closed", pos);
                }
            }
            if cell.is_open && coords != zero {
                let touches_zero = next.cells().iter_neighbors(coords).any(|pos| {
                    next.cell_at(pos).unwrap().is_open && next.neighbor_mine_count(pos) == 0
                });
                assert!(touches_zero, "{:?} opened without an open zero neighbor", coords);
            }
        }
    }

    #[test]
    fn reveal_on_open_cell_is_noop() {
        let once = fixture().reveal((0, 0));
        assert_eq!(once.reveal((0, 0)), once);
        assert_eq!(once.reveal((3, 3)), once);
    }

    #[test]
    fn reveal_clears_flag_on_safe_cell() {
        let start = grid((3, 1), &[(0, 0)]);
        let next = start.toggle_flag((2, 0)).reveal((2, 0));

        let cell = next.cell_at((2, 0)).unwrap();
        assert!(cell.is_open);
        assert!(!cell.is_flagged);
    }

    #[test]
    fn flood_opens_flagged_neighbors() {
        let start = grid((3, 3), &[]).toggle_flag((2, 2));
        let next = start.reveal((0, 0));

        assert_eq!(next.open_count(), 9);
        assert_eq!(next.flag_count(), 0);
        assert_eq!(next.state(), FieldState::Won);
    }

    #[test]
    fn toggle_flag_is_noop_on_open_cell() {
        let start = grid((3, 1), &[(0, 0)]).reveal((2, 0));
        assert_eq!(start.toggle_flag((2, 0)), start);
    }

    #[test]
    fn toggle_flag_twice_restores_cell() {
        let start = grid((3, 1), &[(0, 0)]);
        let flagged = start.toggle_flag((1, 0));
        assert!(flagged.cell_at((1, 0)).unwrap().is_flagged);
        assert_eq!(flagged.mines_left(), 0);
        assert_eq!(flagged.toggle_flag((1, 0)), start);
    }

    #[test]
    fn wrong_flag_blocks_win() {
        let start = grid((4, 1), &[(0, 0), (2, 0)]);
        let next = start
            .toggle_flag((0, 0))
            .toggle_flag((2, 0))
            .toggle_flag((1, 0))
            .reveal((3, 0));

        assert!(!next.check_win());
        assert_eq!(next.state(), FieldState::Playing);

        let fixed = next.toggle_flag((1, 0)).reveal((1, 0));
        assert!(fixed.check_win());
        assert_eq!(fixed.state(), FieldState::Won);
    }

    #[test]
    fn flagging_last_mine_wins() {
        let start = fixture().reveal((0, 0)).reveal((0, 9));
        assert_eq!(start.state(), FieldState::Playing);

        let mut grid = start;
        let mines: Vec<_> = all_coords(grid.size())
            .filter(|&c| grid.cell_at(c).unwrap().is_mine)
            .collect();
        for &coords in &mines {
            grid = grid.toggle_flag(coords);
        }
        assert_eq!(grid.state(), FieldState::Won);
        assert_eq!(grid.mines_left(), 0);

        // finished grids ignore moves
        assert_eq!(grid.toggle_flag(mines[0]), grid);
    }

    #[test]
    fn hitting_mine_reveals_board() {
        let start = grid((3, 3), &[(0, 0), (2, 2)])
            .toggle_flag((2, 2))
            .toggle_flag((1, 0));
        let lost = start.reveal((0, 0));

        assert_eq!(lost.state(), FieldState::Lost);
        assert_eq!(lost.triggered_mine(), Some((0, 0)));

        let triggered = lost.cell_at((0, 0)).unwrap();
        assert!(triggered.is_open);

        let correct_flag = lost.cell_at((2, 2)).unwrap();
        assert!(correct_flag.is_flagged && !correct_flag.is_open);

        let wrong_flag = lost.cell_at((1, 0)).unwrap();
        assert!(wrong_flag.is_open && !wrong_flag.is_flagged);

        let untouched = lost.cell_at((1, 1)).unwrap();
        assert!(!untouched.is_open && !untouched.is_flagged);

        assert_eq!(lost.reveal((1, 1)), lost);
        assert_eq!(lost.toggle_flag((1, 1)), lost);
    }

    #[test]
    fn trigger_loss_opens_every_unflagged_mine() {
        let start = fixture().toggle_flag((9, 0)).toggle_flag((4, 4));
        let lost = start.trigger_loss((9, 5));

        for coords in all_coords(lost.size()) {
            let cell = lost.cell_at(coords).unwrap();
            if cell.is_mine {
                assert!(cell.is_open || cell.is_flagged);
            }
        }
        let wrong = lost.cell_at((4, 4)).unwrap();
        assert!(wrong.is_open && !wrong.is_flagged);
        assert_eq!(lost.state(), FieldState::Lost);
        assert_eq!(lost.triggered_mine(), Some((9, 5)));
        assert_eq!(lost.trigger_loss((9, 6)), lost);
    }

    #[test]
    fn trigger_loss_ignores_cells_without_mine() {
        let start = fixture();
        assert_eq!(start.trigger_loss((0, 0)), start);
        assert_eq!(start.trigger_loss((10, 3)), start);
        assert_eq!(start.triggered_mine(), None);
    }

    #[test]
    fn out_of_bounds_moves_are_ignored() {
        let start = fixture();
        assert_eq!(start.reveal((10, 0)), start);
        assert_eq!(start.toggle_flag((0, 10)), start);
    }
}
