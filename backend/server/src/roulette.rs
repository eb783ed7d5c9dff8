//! # Roulette
//!
//! Spin state machine. Picks a winner up front, then walks the highlight across the markers one step at a time,
//! slowing down over the last few steps, and finally lands on the winner.
//!
//! ## Flow
//! 1. `start`: close the open callout, drop every marker to the baseline, draw the winner from `[0, N)` and the
//!    step count from `[min_steps, max_steps)`, publish `Spinning`.
//!
//! 2. `step`: lower the current marker, advance by one (wrapping), raise and center on the new one. Inside the
//!    tail window (the last `tail_steps` steps) the interval grows by `interval_step` every step.
//!
//! 3. Once `target_steps` steps ran, every marker goes back to the baseline, the winner is raised and centered,
//!    and `Settled` is published.
//!
//! 4. `settle_delay` later the winner's callout opens.
//!
//! The engine never sleeps. Each step returns the delay before the next one and the driver
//! ([`crate::controller`]) owns the timer, which is what lets the interval change between steps.
//!
//! Every spin carries a [`SpinId`]. Steps and callouts for a spin that was cancelled or replaced are ignored.
use std::{ops::Range, time::Duration};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{map::MapSurface, projection::MapBoard};

#[derive(Debug, Clone, PartialEq)]
pub struct RouletteConfig {
    pub min_steps: u32,
    pub max_steps: u32,
    pub base_interval: Duration,
    pub interval_step: Duration,
    pub tail_steps: u32,
    pub settle_delay: Duration,
}

impl Default for RouletteConfig {
    fn default() -> Self {
        Self {
            min_steps: 20,
            max_steps: 30,
            base_interval: Duration::from_millis(50),
            interval_step: Duration::from_millis(15),
            tail_steps: 8,
            settle_delay: Duration::from_millis(500),
        }
    }
}

impl RouletteConfig {
    /// At least one step, and a non-empty step range.
    pub fn normalized(mut self) -> Self {
        self.min_steps = self.min_steps.clamp(1, u32::MAX - 1);
        self.max_steps = self.max_steps.max(self.min_steps + 1);
        self
    }

    pub fn steps(&self) -> Range<u32> {
        self.min_steps..self.max_steps
    }
}

/// Where the randomness of a spin comes from.
pub trait SpinSource: Send {
    /// Uniform over `[0, candidates)`.
    fn winner(&mut self, candidates: usize) -> usize;

    /// Uniform over `steps`.
    fn target_steps(&mut self, steps: Range<u32>) -> u32;
}

pub struct RandomDraw<R>(pub R);

impl RandomDraw<StdRng> {
    pub fn from_os() -> Self {
        Self(StdRng::from_os_rng())
    }

    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> SpinSource for RandomDraw<R> {
    fn winner(&mut self, candidates: usize) -> usize {
        self.0.random_range(0..candidates)
    }

    fn target_steps(&mut self, steps: Range<u32>) -> u32 {
        self.0.random_range(steps)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SpinStatus {
    Idle,
    Spinning,
    Settled { winner: usize },
}

impl SpinStatus {
    pub fn is_spinning(&self) -> bool {
        matches!(self, SpinStatus::Spinning)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Run the next step after this long.
    Next(Duration),
    /// Landed. Open the winner's callout after `settle_delay`.
    Settled { winner: usize, settle_delay: Duration },
    /// The spin was cancelled or replaced.
    Stale,
}

struct RouletteState {
    spin: SpinId,
    current_index: usize,
    target_steps: u32,
    steps_taken: u32,
    step_interval: Duration,
    winner: usize,
}

pub struct RouletteEngine {
    config: RouletteConfig,
    source: Box<dyn SpinSource>,
    state: Option<RouletteState>,
    settling: Option<(SpinId, usize)>,
    next_spin: u64,
    status: watch::Sender<SpinStatus>,
}

impl RouletteEngine {
    pub fn new(config: RouletteConfig, source: impl SpinSource + 'static) -> Self {
        let (status, _) = watch::channel(SpinStatus::Idle);

        Self {
            config: config.normalized(),
            source: Box::new(source),
            state: None,
            settling: None,
            next_spin: 0,
            status,
        }
    }

    pub fn config(&self) -> &RouletteConfig {
        &self.config
    }

    pub fn subscribe(&self) -> watch::Receiver<SpinStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> SpinStatus {
        *self.status.borrow()
    }

    pub fn is_spinning(&self) -> bool {
        self.state.is_some()
    }

    pub fn can_start<S: MapSurface>(&self, board: &MapBoard<S>) -> bool {
        !board.pins().is_empty() && !self.is_spinning()
    }

    /// Begins a spin and returns its id with the delay before the first step, or `None` when there is nothing to
    /// spin over or a spin is already running.
    pub fn start<S: MapSurface>(&mut self, board: &mut MapBoard<S>) -> Option<(SpinId, Duration)> {
        if !self.can_start(board) {
            debug!("Roulette not ready, ignoring start");
            return None;
        }

        self.settling = None;
        board.dismiss_callout();
        board.lower_all();

        let candidates = board.pins().len();
        let winner = self.source.winner(candidates).min(candidates - 1);
        let target_steps = self.source.target_steps(self.config.steps());

        self.next_spin += 1;
        let spin = SpinId(self.next_spin);

        self.state = Some(RouletteState {
            spin,
            current_index: 0,
            target_steps,
            steps_taken: 0,
            step_interval: self.config.base_interval,
            winner,
        });
        self.status.send_replace(SpinStatus::Spinning);

        info!("Spinning over {candidates} places for {target_steps} steps");

        Some((spin, Duration::ZERO))
    }

    pub fn step<S: MapSurface>(&mut self, spin: SpinId, board: &mut MapBoard<S>) -> Step {
        let Some(state) = self.state.as_mut().filter(|state| state.spin == spin) else {
            return Step::Stale;
        };

        let candidates = board.pins().len();
        if candidates == 0 {
            self.state = None;
            self.status.send_replace(SpinStatus::Idle);
            return Step::Stale;
        }

        board.lower(state.current_index);
        state.current_index = (state.current_index + 1) % candidates;
        state.steps_taken += 1;
        board.focus(state.current_index);

        if state.steps_taken > state.target_steps.saturating_sub(self.config.tail_steps) {
            state.step_interval += self.config.interval_step;
        }

        if state.steps_taken < state.target_steps {
            return Step::Next(state.step_interval);
        }

        let winner = state.winner;
        self.state = None;

        board.lower_all();
        board.focus(winner);

        self.settling = Some((spin, winner));
        self.status.send_replace(SpinStatus::Settled { winner });

        info!("Roulette landed on {}", board.pins()[winner].place.name);

        Step::Settled {
            winner,
            settle_delay: self.config.settle_delay,
        }
    }

    /// Opens the callout for a settled spin. Does nothing if another spin started since.
    pub fn open_winner_callout<S: MapSurface>(&mut self, spin: SpinId, board: &mut MapBoard<S>) -> bool {
        match self.settling {
            Some((settled, winner)) if settled == spin => {
                self.settling = None;
                board.open_callout(winner)
            }
            _ => false,
        }
    }

    /// Stops a running spin (markers back to baseline, status `Idle`) or a pending settle callout.
    pub fn cancel<S: MapSurface>(&mut self, board: &mut MapBoard<S>) -> bool {
        let pending_callout = self.settling.take().is_some();

        if self.state.take().is_none() {
            return pending_callout;
        }

        board.lower_all();
        self.status.send_replace(SpinStatus::Idle);
        info!("Roulette cancelled");

        true
    }

    /// Drops a settled result. The winner is an index into the pins it was drawn from, so it means nothing once
    /// those pins are replaced.
    pub fn forget_winner(&mut self) -> bool {
        self.settling = None;

        self.status.send_if_modified(|status| {
            if matches!(status, SpinStatus::Settled { .. }) {
                *status = SpinStatus::Idle;
                return true;
            }
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        ops::Range,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use places::{Coordinate, Place};

    use super::{RandomDraw, RouletteConfig, RouletteEngine, SpinSource, SpinStatus, Step};
    use crate::{
        map::{MapOptions, MapSurface},
        projection::MapBoard,
        scene::SceneMap,
    };

    /// Fixed draws, recording what it was asked.
    struct Scripted {
        winner: usize,
        steps: u32,
        asked: Arc<Mutex<Vec<Range<u32>>>>,
    }

    impl Scripted {
        fn new(winner: usize, steps: u32) -> Self {
            Self {
                winner,
                steps,
                asked: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl SpinSource for Scripted {
        fn winner(&mut self, _candidates: usize) -> usize {
            self.winner
        }

        fn target_steps(&mut self, steps: Range<u32>) -> u32 {
            self.asked.lock().unwrap().push(steps);
            self.steps
        }
    }

    /// Random draws, remembering the winner it handed out.
    struct Recording {
        inner: RandomDraw<rand::rngs::StdRng>,
        winners: Arc<Mutex<Vec<usize>>>,
    }

    impl SpinSource for Recording {
        fn winner(&mut self, candidates: usize) -> usize {
            let winner = self.inner.winner(candidates);
            self.winners.lock().unwrap().push(winner);
            winner
        }

        fn target_steps(&mut self, steps: Range<u32>) -> u32 {
            self.inner.target_steps(steps)
        }
    }

    fn board(count: usize) -> MapBoard<SceneMap> {
        let mut board = MapBoard::new(SceneMap::new(Coordinate::default(), MapOptions::default()));
        board.project(
            (0..count)
                .map(|n| Place {
                    id: n.to_string(),
                    name: format!("place {n}"),
                    x: 127.0 + n as f64 * 0.001,
                    y: 37.0 + n as f64 * 0.001,
                    category: "음식점 > 일식 > 초밥".to_string(),
                })
                .collect(),
        );
        board
    }

    /// Runs a started spin to the end, returning every delay it asked for and how it ended.
    fn run(engine: &mut RouletteEngine, board: &mut MapBoard<SceneMap>) -> (Vec<Duration>, Step) {
        let (spin, first) = engine.start(board).unwrap();
        let mut delays = vec![first];

        loop {
            match engine.step(spin, board) {
                Step::Next(delay) => delays.push(delay),
                other => return (delays, other),
            }
        }
    }

    fn chi_square(counts: &[u64]) -> f64 {
        let total: u64 = counts.iter().sum();
        let expected = total as f64 / counts.len() as f64;

        counts
            .iter()
            .map(|&observed| (observed as f64 - expected).powi(2) / expected)
            .sum()
    }

    #[test]
    fn test_settles_on_winner() {
        let mut board = board(3);
        let mut engine = RouletteEngine::new(RouletteConfig::default(), Scripted::new(1, 20));

        let (delays, end) = run(&mut engine, &mut board);

        // First step runs immediately, then one delay per remaining step.
        assert_eq!(delays.len(), 20);
        assert_eq!(
            end,
            Step::Settled {
                winner: 1,
                settle_delay: Duration::from_millis(500)
            }
        );
        assert_eq!(engine.status(), SpinStatus::Settled { winner: 1 });
        assert!(!engine.is_spinning());

        let winner_marker = board.pins()[1].marker;
        assert_eq!(board.surface().raised(), vec![winner_marker]);
        assert_eq!(board.surface().center(), board.pins()[1].place.coordinate());
        assert!(!board.has_callout());
    }

    #[test]
    fn test_step_range() {
        let mut board = board(2);
        let source = Scripted::new(0, 25);
        let asked = source.asked.clone();
        let mut engine = RouletteEngine::new(RouletteConfig::default(), source);

        engine.start(&mut board).unwrap();
        assert_eq!(*asked.lock().unwrap(), vec![20..30]);
    }

    #[test]
    fn test_deceleration() {
        let mut board = board(4);
        let mut engine = RouletteEngine::new(RouletteConfig::default(), Scripted::new(2, 20));

        let (delays, _) = run(&mut engine, &mut board);
        let intervals = &delays[1..];

        assert!(intervals.windows(2).all(|w| w[0] <= w[1]));

        // Steps 1..=12 stay at the base interval, steps 13..=19 each add 15ms.
        assert_eq!(intervals.len(), 19);
        assert!(intervals[..12].iter().all(|&d| d == Duration::from_millis(50)));
        assert_eq!(intervals[12], Duration::from_millis(65));
        assert_eq!(intervals[18], Duration::from_millis(50 + 15 * 7));
    }

    #[test]
    fn test_highlight_walks_markers() {
        let mut board = board(3);
        let mut engine = RouletteEngine::new(RouletteConfig::default(), Scripted::new(0, 20));
        let (spin, _) = engine.start(&mut board).unwrap();

        for expected in [1, 2, 0, 1] {
            engine.step(spin, &mut board);

            let marker = board.pins()[expected].marker;
            assert_eq!(board.surface().raised(), vec![marker]);
            assert_eq!(board.surface().center(), board.pins()[expected].place.coordinate());
        }
    }

    #[test]
    fn test_not_ready() {
        let mut empty = board(0);
        let mut engine = RouletteEngine::new(RouletteConfig::default(), Scripted::new(0, 20));

        assert!(!engine.can_start(&empty));
        assert!(engine.start(&mut empty).is_none());
        assert_eq!(engine.status(), SpinStatus::Idle);

        let mut board = board(2);
        assert!(engine.start(&mut board).is_some());
        assert!(!engine.can_start(&board));
        assert!(engine.start(&mut board).is_none());
        assert_eq!(engine.status(), SpinStatus::Spinning);
    }

    #[test]
    fn test_start_resets_previous_highlight() {
        let mut board = board(3);
        let mut engine = RouletteEngine::new(RouletteConfig::default(), Scripted::new(2, 20));

        run(&mut engine, &mut board);
        assert_eq!(board.surface().raised().len(), 1);

        engine.start(&mut board).unwrap();
        assert!(board.surface().raised().is_empty());
    }

    #[test]
    fn test_callout_after_settle() {
        let mut board = board(3);
        let mut engine = RouletteEngine::new(RouletteConfig::default(), Scripted::new(2, 20));

        let (spin, _) = engine.start(&mut board).unwrap();
        while let Step::Next(_) = engine.step(spin, &mut board) {}

        assert!(engine.open_winner_callout(spin, &mut board));
        let overlay = board.surface().overlay().unwrap();
        assert_eq!(overlay.callout.place_id, "2");
        assert_eq!(overlay.callout.title, "place 2");
        assert_eq!(overlay.callout.category, "일식");

        assert!(!engine.open_winner_callout(spin, &mut board));
    }

    #[test]
    fn test_stale_spin_is_ignored() {
        let mut board = board(3);
        let mut engine = RouletteEngine::new(RouletteConfig::default(), Scripted::new(1, 20));

        let (old, _) = engine.start(&mut board).unwrap();
        engine.step(old, &mut board);
        assert!(engine.cancel(&mut board));
        assert_eq!(engine.status(), SpinStatus::Idle);
        assert!(board.surface().raised().is_empty());

        let (new, _) = engine.start(&mut board).unwrap();
        assert_ne!(old, new);
        assert_eq!(engine.step(old, &mut board), Step::Stale);

        while let Step::Next(_) = engine.step(new, &mut board) {}
        assert!(!engine.open_winner_callout(old, &mut board));
        assert!(engine.open_winner_callout(new, &mut board));
    }

    #[test]
    fn test_new_spin_drops_pending_callout() {
        let mut board = board(3);
        let mut engine = RouletteEngine::new(RouletteConfig::default(), Scripted::new(1, 20));

        let (first, _) = engine.start(&mut board).unwrap();
        while let Step::Next(_) = engine.step(first, &mut board) {}

        engine.start(&mut board).unwrap();
        assert!(!engine.open_winner_callout(first, &mut board));
        assert!(!board.has_callout());
    }

    #[test]
    fn test_terminates_within_max_steps() {
        let config = RouletteConfig::default();
        let winners = Arc::new(Mutex::new(Vec::new()));
        let mut engine = RouletteEngine::new(
            config.clone(),
            Recording {
                inner: RandomDraw::seeded(7),
                winners: winners.clone(),
            },
        );

        for count in [1, 2, 5, 20] {
            let mut board = board(count);

            for _ in 0..50 {
                let (delays, end) = run(&mut engine, &mut board);
                assert!(delays.len() < config.max_steps as usize);

                let drawn = *winners.lock().unwrap().last().unwrap();
                assert!(drawn < count);
                assert!(matches!(end, Step::Settled { winner, .. } if winner == drawn));
                assert_eq!(board.surface().raised(), vec![board.pins()[drawn].marker]);
            }
        }
    }

    #[test]
    fn test_winner_is_uniform() {
        // 0.1% critical values for 1, 4 and 19 degrees of freedom.
        for (count, critical) in [(2, 10.83), (5, 18.47), (20, 43.82)] {
            let mut draw = RandomDraw::seeded(count as u64);
            let mut counts = vec![0u64; count];

            for _ in 0..count * 1_000 {
                counts[draw.winner(count)] += 1;
            }

            let statistic = chi_square(&counts);
            assert!(statistic < critical, "N={count}: chi-square {statistic}");
        }
    }

    #[test]
    fn test_target_steps_are_uniform() {
        let config = RouletteConfig::default();
        let mut draw = RandomDraw::seeded(42);
        let mut counts = vec![0u64; 10];

        for _ in 0..10_000 {
            let steps = draw.target_steps(config.steps());
            assert!(config.steps().contains(&steps));
            counts[(steps - config.min_steps) as usize] += 1;
        }

        // 0.1% critical value for 9 degrees of freedom.
        assert!(chi_square(&counts) < 27.88);
    }

    #[test]
    fn test_normalized_config() {
        let config = RouletteConfig {
            min_steps: 0,
            max_steps: 0,
            ..RouletteConfig::default()
        }
        .normalized();

        assert_eq!(config.steps(), 1..2);
    }

    #[test]
    fn test_normalized_config_at_limit() {
        let config = RouletteConfig {
            min_steps: u32::MAX,
            max_steps: 0,
            ..RouletteConfig::default()
        }
        .normalized();

        assert_eq!(config.steps(), u32::MAX - 1..u32::MAX);
    }

    #[test]
    fn test_forget_winner() {
        let mut board = board(3);
        let mut engine = RouletteEngine::new(RouletteConfig::default(), Scripted::new(1, 20));

        assert!(!engine.forget_winner());

        let (spin, _) = engine.start(&mut board).unwrap();
        assert!(!engine.forget_winner());
        assert_eq!(engine.status(), SpinStatus::Spinning);

        while let Step::Next(_) = engine.step(spin, &mut board) {}
        assert!(engine.forget_winner());
        assert_eq!(engine.status(), SpinStatus::Idle);
        assert!(!engine.open_winner_callout(spin, &mut board));
    }
}
