use serde::{Deserialize, Serialize};

use super::MinefieldIntent;
use crate::Coord2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Click {
    Primary,
    Secondary,
}

/// The mark/reveal switch under the board, for devices without a secondary click.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMode {
    #[default]
    Reveal,
    Mark,
}

impl InputMode {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Reveal => Self::Mark,
            Self::Mark => Self::Reveal,
        }
    }

    /// Secondary clicks always flag, primary clicks follow the mode.
    pub const fn route(self, coords: Coord2, click: Click) -> MinefieldIntent {
        match (self, click) {
            (Self::Reveal, Click::Primary) => MinefieldIntent::Reveal(coords),
            (Self::Mark, Click::Primary) | (_, Click::Secondary) => {
                MinefieldIntent::ToggleFlag(coords)
            }
        }
    }
}
