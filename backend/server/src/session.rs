use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use places::{Coordinate, Place, PlacesAggregator, PlacesProvider};
use tracing::{debug, info};

use crate::{
    map::MapSurface,
    projection::MapBoard,
    roulette::{RouletteEngine, SpinId, Step},
};

/// One map with its pins and the roulette spinning over them.
pub struct Session<S: MapSurface> {
    pub board: MapBoard<S>,
    pub engine: RouletteEngine,
}

impl<S: MapSurface> Session<S> {
    pub fn new(surface: S, engine: RouletteEngine) -> Self {
        Self {
            board: MapBoard::new(surface),
            engine,
        }
    }

    pub fn can_start(&self) -> bool {
        self.engine.can_start(&self.board)
    }

    /// New search results. A running spin is cancelled first, the engine never sees its pins change mid-spin. A
    /// settled winner is cleared since it indexes the old pins.
    pub fn replace_places(&mut self, places: Vec<Place>) -> usize {
        if self.engine.cancel(&mut self.board) {
            info!("Cancelled spin for new places");
        }
        if self.engine.forget_winner() {
            debug!("Cleared previous winner for new places");
        }

        self.board.project(places)
    }

    pub(crate) fn start(&mut self) -> Option<(SpinId, Duration)> {
        self.engine.start(&mut self.board)
    }

    pub(crate) fn step(&mut self, spin: SpinId) -> Step {
        self.engine.step(spin, &mut self.board)
    }

    pub(crate) fn open_winner_callout(&mut self, spin: SpinId) -> bool {
        self.engine.open_winner_callout(spin, &mut self.board)
    }

    pub(crate) fn cancel(&mut self) -> bool {
        self.engine.cancel(&mut self.board)
    }
}

pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Centers the map, searches around `center` and projects whatever came back. `None` when the search was
/// dropped because another one is still running.
pub async fn search_and_project<P, S>(
    aggregator: &PlacesAggregator<P>,
    session: &Mutex<Session<S>>,
    center: Coordinate,
) -> Option<Vec<Place>>
where
    P: PlacesProvider,
    S: MapSurface,
{
    lock(session).board.recenter(center);

    let places = aggregator.search(center).await?;
    lock(session).replace_places(places.clone());

    Some(places)
}
