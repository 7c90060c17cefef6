use ndarray::Array2;
use rand::prelude::*;
use rand::rngs::SmallRng;

use super::{Grid, MinefieldConfig};
use crate::ToNdIndex;

pub trait MinefieldGenerator {
    fn generate(self, config: MinefieldConfig) -> Grid;
}

/// Places every mine uniformly at random, without replacement, from a seed.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomMinefieldGenerator {
    seed: u64,
}

impl RandomMinefieldGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl MinefieldGenerator for RandomMinefieldGenerator {
    fn generate(self, config: MinefieldConfig) -> Grid {
        let total_cells = usize::from(config.total_cells());
        let mines = usize::from(config.mines);
        let height = usize::from(config.size.1);

        // optimize for full boards
        if mines >= total_cells {
            if mines > total_cells {
                log::warn!(
                    "Minefield already full, generated anyway, requested {} but only fits {}",
                    mines,
                    total_cells
                );
            }
            let mine_mask = Array2::from_elem(config.size.to_nd_index(), true);
            return Grid::from_mine_mask(&mine_mask);
        }

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut mine_mask: Array2<bool> = Array2::default(config.size.to_nd_index());
        for index in rand::seq::index::sample(&mut rng, total_cells, mines) {
            mine_mask[[index / height, index % height]] = true;
        }
        log::debug!(
            "Generated {}x{} minefield with {} mines",
            config.size.0,
            config.size.1,
            mines
        );
        Grid::from_mine_mask(&mine_mask)
    }
}
