//! Session controller: drives one engine from input and timers.
//!
//! A [`GameSession`] owns the engine value, the elapsed-time bookkeeping and every timer of the
//! game in a [`TimerQueue`]. Time comes in as plain millisecond timestamps, so the host only
//! needs to call [`GameSession::advance_to`] when [`GameSession::next_wakeup_ms`] passes.
//! [`SessionController`] binds a session to a [`Clock`] and to the leaderboard.

use minigames_protocol::{GameId, ScoreRecord};

use crate::config::SessionConfig;
use crate::display::format_elapsed;
use crate::leaderboard::{fetch_top_or_empty, submit_score_or_log, Leaderboard};

pub use clock::*;
pub use timer::*;

mod clock;
mod engines;
mod timer;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
    /// Runs without a winner, like a crashed snake.
    Over,
}

impl Outcome {
    /// Whether the run belongs on a leaderboard.
    pub const fn is_rankable(self) -> bool {
        !matches!(self, Self::Lost)
    }
}

/// A transition the engine wants applied after a delay, identified by its epoch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Delayed {
    pub epoch: u64,
    pub delay_ms: u64,
}

/// Pure state-transition core of a game as seen by its session.
pub trait Engine: Clone + PartialEq {
    type Intent;

    const GAME: GameId;

    fn apply(&self, intent: &Self::Intent) -> Self;

    /// `Some` once the state is terminal.
    fn outcome(&self) -> Option<Outcome>;

    fn score(&self) -> Option<u32> {
        None
    }

    /// Period of the autonomous advance tick, `None` for event-driven games.
    fn tick_interval_ms(&self) -> Option<u64> {
        None
    }

    fn tick(&self) -> Self {
        self.clone()
    }

    fn delayed(&self) -> Option<Delayed> {
        None
    }

    /// Applies the delayed transition of `epoch`, stale epochs change nothing.
    fn resolve_delayed(&self, _epoch: u64) -> Self {
        self.clone()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TimerKind {
    Clock,
    Advance,
    Delayed { epoch: u64 },
}

#[derive(Clone, Debug)]
pub struct GameSession<E: Engine> {
    state: E,
    started_at: Option<u64>,
    elapsed_ms: u64,
    is_terminal: bool,
    clock_tick_ms: u64,
    timers: TimerQueue<TimerKind>,
    delayed: Option<(TimerHandle, u64)>,
}

impl<E: Engine> GameSession<E> {
    pub fn new(state: E, now_ms: u64) -> Self {
        Self::with_config(state, now_ms, SessionConfig::default())
    }

    /// Games with an advance tick start right away, the others on their first move.
    pub fn with_config(state: E, now_ms: u64, config: SessionConfig) -> Self {
        let mut session = Self {
            state,
            started_at: None,
            elapsed_ms: 0,
            is_terminal: false,
            clock_tick_ms: config.clock_tick_ms.max(1),
            timers: TimerQueue::new(),
            delayed: None,
        };
        if session.state.tick_interval_ms().is_some() {
            session.start(now_ms);
        }
        session.after_transition(now_ms);
        session
    }

    pub fn state(&self) -> &E {
        &self.state
    }

    pub fn started_at(&self) -> Option<u64> {
        self.started_at
    }

    /// Elapsed time as of the last clock tick, exact once terminal.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn elapsed_display(&self) -> String {
        format_elapsed(self.elapsed_ms)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.state.outcome()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// When the next timer is due, `None` when nothing is scheduled.
    pub fn next_wakeup_ms(&self) -> Option<u64> {
        self.timers.next_due()
    }

    /// Fires every timer due by `now_ms`, each at its own due time. Returns whether anything
    /// visible changed.
    pub fn advance_to(&mut self, now_ms: u64) -> bool {
        let mut changed = false;
        while !self.is_terminal {
            let Some((_, due_ms, kind)) = self.timers.pop_due(now_ms) else {
                break;
            };
            changed |= self.fire(kind, due_ms);
        }
        changed
    }

    /// Feeds one input event to the engine after catching up on due timers.
    pub fn handle(&mut self, intent: &E::Intent, now_ms: u64) -> bool {
        let changed = self.advance_to(now_ms);
        if self.is_terminal {
            return changed;
        }

        let next = self.state.apply(intent);
        if next == self.state {
            return changed;
        }
        if self.started_at.is_none() {
            self.start(now_ms);
        }
        self.state = next;
        self.after_transition(now_ms);
        true
    }

    /// Leaderboard entry for a finished, rankable run.
    pub fn record(&self, name: &str) -> Option<ScoreRecord> {
        let outcome = self.outcome()?;
        if !self.is_terminal || !outcome.is_rankable() {
            return None;
        }
        Some(ScoreRecord::new(name, self.elapsed_ms, self.state.score()))
    }

    fn start(&mut self, now_ms: u64) {
        self.started_at = Some(now_ms);
        self.timers
            .schedule(now_ms + self.clock_tick_ms, TimerKind::Clock);
        if let Some(interval) = self.state.tick_interval_ms() {
            self.timers.schedule(now_ms + interval, TimerKind::Advance);
        }
        log::debug!("{} session started at {}", E::GAME, now_ms);
    }

    fn fire(&mut self, kind: TimerKind, at_ms: u64) -> bool {
        match kind {
            TimerKind::Clock => {
                self.elapsed_ms = self.elapsed_since_start(at_ms);
                self.timers
                    .schedule(at_ms + self.clock_tick_ms, TimerKind::Clock);
                true
            }
            TimerKind::Advance => {
                let next = self.state.tick();
                let changed = self.transition(next, at_ms);
                if !self.is_terminal {
                    if let Some(interval) = self.state.tick_interval_ms() {
                        self.timers.schedule(at_ms + interval, TimerKind::Advance);
                    }
                }
                changed
            }
            TimerKind::Delayed { epoch } => {
                self.delayed = None;
                let next = self.state.resolve_delayed(epoch);
                self.transition(next, at_ms)
            }
        }
    }

    fn transition(&mut self, next: E, at_ms: u64) -> bool {
        if next == self.state {
            return false;
        }
        self.state = next;
        self.after_transition(at_ms);
        true
    }

    fn after_transition(&mut self, at_ms: u64) {
        if let Some(outcome) = self.state.outcome() {
            self.finish(outcome, at_ms);
            return;
        }

        let wanted = self.state.delayed();
        if self.delayed.map(|(_, epoch)| epoch) == wanted.map(|delayed| delayed.epoch) {
            return;
        }
        if let Some((handle, epoch)) = self.delayed.take() {
            self.timers.cancel(handle);
            log::debug!("cancelled delayed transition of epoch {}", epoch);
        }
        if let Some(delayed) = wanted {
            let handle = self.timers.schedule(
                at_ms + delayed.delay_ms,
                TimerKind::Delayed {
                    epoch: delayed.epoch,
                },
            );
            self.delayed = Some((handle, delayed.epoch));
        }
    }

    fn finish(&mut self, outcome: Outcome, at_ms: u64) {
        self.is_terminal = true;
        self.elapsed_ms = self.elapsed_since_start(at_ms);
        self.timers.clear();
        self.delayed = None;
        log::debug!(
            "{} session ended {:?} after {} ms",
            E::GAME,
            outcome,
            self.elapsed_ms
        );
    }

    fn elapsed_since_start(&self, at_ms: u64) -> u64 {
        self.started_at
            .map_or(0, |started_at| at_ms.saturating_sub(started_at))
    }
}

/// One game's session bound to a clock; restarting replaces the whole session.
#[derive(Debug)]
pub struct SessionController<E: Engine, C: Clock> {
    clock: C,
    config: SessionConfig,
    session: GameSession<E>,
    submitted: bool,
}

impl<E: Engine, C: Clock> SessionController<E, C> {
    pub fn new(clock: C, state: E) -> Self {
        Self::with_config(clock, state, SessionConfig::default())
    }

    pub fn with_config(clock: C, state: E, config: SessionConfig) -> Self {
        let session = GameSession::with_config(state, clock.now_ms(), config);
        Self {
            clock,
            config,
            session,
            submitted: false,
        }
    }

    pub fn session(&self) -> &GameSession<E> {
        &self.session
    }

    pub fn state(&self) -> &E {
        self.session.state()
    }

    pub fn handle(&mut self, intent: E::Intent) -> bool {
        let now_ms = self.clock.now_ms();
        self.session.handle(&intent, now_ms)
    }

    /// Runs the timers due by now.
    pub fn poll(&mut self) -> bool {
        let now_ms = self.clock.now_ms();
        self.session.advance_to(now_ms)
    }

    pub fn next_wakeup_ms(&self) -> Option<u64> {
        self.session.next_wakeup_ms()
    }

    /// Drops the current session, timers included, and starts over with `state`.
    pub fn restart(&mut self, state: E) {
        log::debug!("restarting {} session", E::GAME);
        self.session = GameSession::with_config(state, self.clock.now_ms(), self.config);
        self.submitted = false;
    }

    /// Sends the finished run to the leaderboard once. Failures are logged and not retried.
    pub fn submit_result<L: Leaderboard + ?Sized>(
        &mut self,
        leaderboard: &mut L,
        name: &str,
    ) -> bool {
        if self.submitted {
            return false;
        }
        let Some(record) = self.session.record(name) else {
            return false;
        };
        self.submitted = true;
        submit_score_or_log(leaderboard, E::GAME.as_str(), &record)
    }

    /// Top entries for this game in its usual order, empty when the store is unavailable.
    pub fn leaderboard<L: Leaderboard + ?Sized>(&self, leaderboard: &L) -> Vec<ScoreRecord> {
        fetch_top_or_empty(leaderboard, E::GAME.as_str(), E::GAME.default_sort_rules())
    }
}
