//! Snake engine.
//!
//! The board does not wrap: leaving it ends the run, as does running into the body. Direction
//! changes are queued by [`SnakeGame::enqueue_intent`] and filtered one per [`SnakeGame::tick`].

use std::collections::VecDeque;

use rand::prelude::*;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::*;

/// Head plus one body segment.
pub const INITIAL_LENGTH: usize = 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i16,
    pub y: i16,
}

impl Point {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    fn is_adjacent(self, other: Point) -> bool {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) == 1
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Screen coordinates, `y` grows downwards.
    const fn delta(self) -> (i16, i16) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// Whether turning from `self` to `next` changes anything and is not a reversal.
    pub fn is_turn_to(self, next: Direction) -> bool {
        next != self && next != self.opposite()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnakeConfig {
    pub size: Coord2,
    pub base_interval_ms: u64,
    pub speedup_every: u32,
    pub speedup_factor: f64,
}

impl SnakeConfig {
    pub fn validate(&self) -> Result<()> {
        self.validate_board()?;
        self.validate_speed()
    }

    fn validate_board(&self) -> Result<()> {
        let (width, height) = self.size;
        // room for the starting snake and one food cell
        if width < 2 || mult(width, height) <= INITIAL_LENGTH as CellCount {
            return Err(GameError::BoardTooSmall);
        }
        Ok(())
    }

    /// Factor in `(0, 1]`, NaN rejected.
    fn validate_speed(&self) -> Result<()> {
        let factor = self.speedup_factor;
        if self.base_interval_ms == 0 || !(factor > 0.0 && factor <= 1.0) {
            return Err(GameError::InvalidSpeed);
        }
        Ok(())
    }

    /// Tick period in milliseconds for a snake of `snake_length` cells. Shrinks by
    /// `speedup_factor` every `speedup_every` points and never reaches zero.
    pub fn speed(&self, snake_length: usize) -> f64 {
        let score = snake_length.saturating_sub(INITIAL_LENGTH);
        let steps = score / self.speedup_every.max(1) as usize;
        let steps = i32::try_from(steps).unwrap_or(i32::MAX);
        self.base_interval_ms as f64 * self.speedup_factor.powi(steps)
    }
}

impl Default for SnakeConfig {
    fn default() -> Self {
        Self {
            size: (20, 12),
            base_interval_ms: 400,
            speedup_every: 3,
            speedup_factor: 0.95,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snake {
    pub head: Point,
    /// Segments behind the head, ordered head to tail.
    pub body: VecDeque<Point>,
    pub direction: Direction,
}

impl Snake {
    pub fn len(&self) -> usize {
        self.body.len() + 1
    }

    pub fn occupies(&self, point: Point) -> bool {
        self.head == point || self.body.contains(&point)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnakeGame {
    config: SnakeConfig,
    snake: Snake,
    /// `None` only once the snake covers the whole board.
    food: Option<Point>,
    pending_intents: SmallVec<[Direction; 4]>,
    is_over: bool,
    rng_seed: u64,
}

impl SnakeGame {
    /// Centered snake heading right, food on a random free cell.
    pub fn generate(config: SnakeConfig, seed: u64) -> Self {
        let mut config = config;
        let defaults = SnakeConfig::default();
        if config.validate_board().is_err() {
            log::warn!("Snake board {:?} too small, using default size", config.size);
            config.size = defaults.size;
        }
        if config.validate_speed().is_err() {
            log::warn!(
                "Snake speed {} ms x {} invalid, using default ramp",
                config.base_interval_ms,
                config.speedup_factor
            );
            config.base_interval_ms = defaults.base_interval_ms;
            config.speedup_factor = defaults.speedup_factor;
        }
        let (width, height) = config.size;
        let head = Point::new(i16::from(width / 2), i16::from(height / 2));
        let snake = Snake {
            head,
            body: VecDeque::from([Point::new(head.x - 1, head.y)]),
            direction: Direction::Right,
        };
        let mut rng = SmallRng::seed_from_u64(seed);
        let food = place_food(&snake, config.size, &mut rng);
        Self {
            config,
            snake,
            food,
            pending_intents: SmallVec::new(),
            is_over: food.is_none(),
            rng_seed: rng.gen(),
        }
    }

    /// Game in an exact position, used to replay or test specific situations.
    pub fn from_parts(config: SnakeConfig, snake: Snake, food: Point, seed: u64) -> Result<Self> {
        config.validate()?;
        let game = Self {
            config,
            snake,
            food: Some(food),
            pending_intents: SmallVec::new(),
            is_over: false,
            rng_seed: seed,
        };

        let segments: Vec<Point> = std::iter::once(game.snake.head)
            .chain(game.snake.body.iter().copied())
            .collect();
        if !game.contains(food) || !segments.iter().all(|&point| game.contains(point)) {
            return Err(GameError::InvalidCoords);
        }
        let contiguous = segments.windows(2).all(|pair| pair[0].is_adjacent(pair[1]));
        let distinct = segments
            .iter()
            .enumerate()
            .all(|(index, point)| !segments[..index].contains(point));
        if !contiguous || !distinct || game.snake.occupies(food) {
            return Err(GameError::InvalidSnake);
        }
        Ok(game)
    }

    pub fn config(&self) -> &SnakeConfig {
        &self.config
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    pub fn food(&self) -> Option<Point> {
        self.food
    }

    pub fn pending_intents(&self) -> &[Direction] {
        &self.pending_intents
    }

    pub fn is_over(&self) -> bool {
        self.is_over
    }

    /// Over because the snake covers the whole board.
    pub fn is_won(&self) -> bool {
        self.is_over && self.food.is_none()
    }

    pub fn score(&self) -> usize {
        self.snake.len().saturating_sub(INITIAL_LENGTH)
    }

    /// Current tick period in milliseconds.
    pub fn speed(&self) -> f64 {
        self.config.speed(self.snake.len())
    }

    pub fn contains(&self, point: Point) -> bool {
        let (width, height) = self.config.size;
        (0..i16::from(width)).contains(&point.x) && (0..i16::from(height)).contains(&point.y)
    }

    /// Queues a direction change; filtering happens when the next tick consumes it.
    pub fn enqueue_intent(&self, direction: Direction) -> Self {
        let mut next = self.clone();
        next.pending_intents.push(direction);
        next
    }

    pub fn tick(&self) -> Self {
        if self.is_over {
            return self.clone();
        }

        let current = self.snake.direction;
        let mut intents = self.pending_intents.clone();
        let mut direction = current;
        while !intents.is_empty() {
            let queued = intents.remove(0);
            if current.is_turn_to(queued) {
                direction = queued;
                break;
            }
            log::trace!("dropping queued {:?} while heading {:?}", queued, current);
        }

        let head = self.snake.head.step(direction);
        if !self.contains(head) || self.snake.body.contains(&head) {
            log::debug!("snake crashed at {:?}, score {}", head, self.score());
            let mut over = self.clone();
            over.is_over = true;
            return over;
        }

        let mut next = self.clone();
        next.pending_intents = intents;
        next.snake.direction = direction;
        next.snake.body.push_front(self.snake.head);
        next.snake.head = head;

        if self.food == Some(head) {
            let mut rng = SmallRng::seed_from_u64(self.rng_seed);
            next.food = place_food(&next.snake, self.config.size, &mut rng);
            next.rng_seed = rng.gen();
            if next.food.is_none() {
                log::debug!("snake filled the board");
                next.is_over = true;
            }
            log::trace!("ate food, length {}", next.snake.len());
        } else {
            next.snake.body.pop_back();
        }
        next
    }
}

/// Uniform pick among the cells the snake does not cover.
fn place_food<R: Rng + ?Sized>(snake: &Snake, size: Coord2, rng: &mut R) -> Option<Point> {
    let (width, height) = size;
    let free: Vec<Point> = (0..i16::from(height))
        .flat_map(|y| (0..i16::from(width)).map(move |x| Point::new(x, y)))
        .filter(|&point| !snake.occupies(point))
        .collect();
    free.choose(rng).copied()
}
