//! # Roulette Controller
//!
//! Drives [`RouletteEngine`](crate::roulette::RouletteEngine) on the tokio runtime.
//!
//! Each step is a one-shot `sleep` re-armed with whatever interval the previous step returned. At most one timer
//! task exists per controller; starting a spin aborts the previous task (including a pending settle callout)
//! before spawning the next one.
//!
//! Whatever needs to trigger a spin gets a [`SpinTrigger`], never the session itself.
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{sync::watch, task::JoinHandle, time::sleep};
use tracing::{debug, info};

use crate::{
    map::MapSurface,
    roulette::{SpinId, SpinStatus, Step},
    session::{Session, lock},
};

pub trait SpinTrigger: Send + Sync {
    fn can_start(&self) -> bool;

    /// No-op (returns `false`) unless [`SpinTrigger::can_start`].
    fn start(&self) -> bool;

    fn cancel(&self) -> bool;

    fn subscribe(&self) -> watch::Receiver<SpinStatus>;
}

pub struct RouletteController<S: MapSurface> {
    session: Arc<Mutex<Session<S>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    status: watch::Receiver<SpinStatus>,
}

impl<S: MapSurface> RouletteController<S> {
    pub fn new(session: Arc<Mutex<Session<S>>>) -> Self {
        let status = lock(&session).engine.subscribe();

        Self {
            session,
            timer: Mutex::new(None),
            status,
        }
    }

    pub fn session(&self) -> &Arc<Mutex<Session<S>>> {
        &self.session
    }

    pub fn status(&self) -> SpinStatus {
        *self.status.borrow()
    }
}

impl<S: MapSurface> SpinTrigger for RouletteController<S> {
    fn can_start(&self) -> bool {
        lock(&self.session).can_start()
    }

    /// Must be called from inside a tokio runtime.
    fn start(&self) -> bool {
        let mut timer = lock(&self.timer);
        let mut session = lock(&self.session);

        if !session.can_start() {
            debug!("Spin requested while not ready");
            return false;
        }

        if let Some(previous) = timer.take() {
            previous.abort();
        }

        let Some((spin, first)) = session.start() else {
            return false;
        };

        *timer = Some(tokio::spawn(run_spin(self.session.clone(), spin, first)));

        true
    }

    fn cancel(&self) -> bool {
        if let Some(timer) = lock(&self.timer).take() {
            timer.abort();
        }

        lock(&self.session).cancel()
    }

    fn subscribe(&self) -> watch::Receiver<SpinStatus> {
        self.status.clone()
    }
}

async fn run_spin<S: MapSurface>(session: Arc<Mutex<Session<S>>>, spin: SpinId, first: Duration) {
    let mut delay = first;

    loop {
        sleep(delay).await;

        let step = lock(&session).step(spin);
        match step {
            Step::Next(next) => delay = next,
            Step::Settled { settle_delay, .. } => {
                sleep(settle_delay).await;

                if lock(&session).open_winner_callout(spin) {
                    info!("Opened winner callout");
                }
                return;
            }
            Step::Stale => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        ops::Range,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use places::{
        Coordinate, Pagination, Place, PlacesAggregator, PlacesProvider, SearchPage, SearchStatus,
    };
    use tokio::time::{Instant, sleep};

    use super::{RouletteController, SpinTrigger};
    use crate::{
        map::{MapOptions, MapSurface},
        roulette::{RouletteConfig, RouletteEngine, SpinSource, SpinStatus},
        scene::SceneMap,
        session::{Session, lock, search_and_project},
    };

    /// Hands out `(winner, steps)` draws in order, repeating the last one.
    struct Draws {
        queue: VecDeque<(usize, u32)>,
        last: (usize, u32),
        spins: Arc<Mutex<u32>>,
    }

    impl Draws {
        fn new(draws: &[(usize, u32)]) -> Self {
            Self {
                queue: draws.iter().copied().collect(),
                last: draws[0],
                spins: Arc::new(Mutex::new(0)),
            }
        }
    }

    impl SpinSource for Draws {
        fn winner(&mut self, _candidates: usize) -> usize {
            *self.spins.lock().unwrap() += 1;
            if let Some(next) = self.queue.pop_front() {
                self.last = next;
            }
            self.last.0
        }

        fn target_steps(&mut self, _steps: Range<u32>) -> u32 {
            self.last.1
        }
    }

    struct ThreePlaces;

    impl PlacesProvider for ThreePlaces {
        async fn search_category(&self, query: &places::CategoryQuery) -> SearchPage {
            let places = [("a", 37.51, 127.01), ("b", 37.52, 127.02), ("c", 37.53, 127.03)]
                .into_iter()
                .map(|(id, lat, lng)| Place {
                    id: id.to_string(),
                    name: format!("place {id}"),
                    x: lng,
                    y: lat,
                    category: "음식점 > 중식".to_string(),
                })
                .collect();

            SearchPage {
                places,
                status: SearchStatus::Ok,
                pagination: Pagination {
                    current: query.page,
                    last: 1,
                },
            }
        }
    }

    async fn setup(draws: Draws) -> RouletteController<SceneMap> {
        let session = Arc::new(Mutex::new(Session::new(
            SceneMap::new(Coordinate::default(), MapOptions::default()),
            RouletteEngine::new(RouletteConfig::default(), draws),
        )));

        let aggregator = PlacesAggregator::new(ThreePlaces);
        search_and_project(&aggregator, &session, Coordinate::new(37.5, 127.0))
            .await
            .unwrap();

        RouletteController::new(session)
    }

    async fn settled(controller: &RouletteController<SceneMap>) -> usize {
        let mut status = controller.subscribe();
        let settled = *status
            .wait_for(|s| matches!(s, SpinStatus::Settled { .. }))
            .await
            .unwrap();

        match settled {
            SpinStatus::Settled { winner } => winner,
            _ => unreachable!(),
        }
    }

    // 12 steps at 50ms, then 65, 80, ... 155ms for steps 13 through 19.
    const SPIN_OF_20: Duration = Duration::from_millis(12 * 50 + 7 * 50 + 15 * 28);

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end() {
        let controller = setup(Draws::new(&[(1, 20)])).await;

        {
            let session = lock(controller.session());
            let markers = session.board.surface().markers();
            let titles: Vec<&str> = markers.iter().map(|m| m.title.as_str()).collect();
            assert_eq!(titles, vec!["place a", "place b", "place c"]);
            assert_eq!(markers[1].position, Coordinate::new(37.52, 127.02));
        }

        assert!(controller.can_start());
        assert!(controller.start());
        assert!(controller.status().is_spinning());

        assert_eq!(settled(&controller).await, 1);
        assert!(!controller.status().is_spinning());

        {
            let session = lock(controller.session());
            let scene = session.board.surface();
            assert_eq!(scene.raised(), vec![scene.markers()[1].id]);
            assert_eq!(scene.center(), Coordinate::new(37.52, 127.02));
            assert!(scene.overlay().is_none());
        }

        sleep(Duration::from_millis(600)).await;

        let session = lock(controller.session());
        let overlay = session.board.surface().overlay().unwrap();
        assert_eq!(overlay.callout.place_id, "b");
        assert_eq!(overlay.callout.emoji, "🇨🇳");
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_runs_one_chain() {
        let draws = Draws::new(&[(2, 20)]);
        let spins = draws.spins.clone();
        let controller = setup(draws).await;

        let started = Instant::now();
        assert!(controller.start());
        assert!(!controller.start());

        assert_eq!(settled(&controller).await, 2);
        let elapsed = started.elapsed();
        assert!(elapsed >= SPIN_OF_20, "{elapsed:?}");
        assert!(elapsed < SPIN_OF_20 + Duration::from_millis(50), "{elapsed:?}");
        assert_eq!(*spins.lock().unwrap(), 1);

        sleep(Duration::from_secs(2)).await;
        let session = lock(controller.session());
        assert_eq!(session.board.surface().overlay().unwrap().callout.place_id, "c");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_during_settle_delay() {
        let controller = setup(Draws::new(&[(0, 20), (2, 21)])).await;

        assert!(controller.start());
        assert_eq!(settled(&controller).await, 0);

        // The first spin's callout is still pending.
        assert!(controller.start());
        sleep(Duration::from_millis(700)).await;
        assert!(lock(controller.session()).board.surface().overlay().is_none());

        assert_eq!(settled(&controller).await, 2);
        sleep(Duration::from_millis(600)).await;

        let session = lock(controller.session());
        assert_eq!(session.board.surface().overlay().unwrap().callout.place_id, "c");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let controller = setup(Draws::new(&[(1, 25)])).await;

        assert!(controller.start());
        sleep(Duration::from_millis(200)).await;

        assert!(controller.cancel());
        assert_eq!(controller.status(), SpinStatus::Idle);
        assert!(!controller.cancel());

        sleep(Duration::from_secs(5)).await;

        let session = lock(controller.session());
        assert_eq!(controller.status(), SpinStatus::Idle);
        assert!(session.board.surface().raised().is_empty());
        assert!(session.board.surface().overlay().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_places_cancel_spin() {
        let controller = setup(Draws::new(&[(1, 25)])).await;

        assert!(controller.start());
        sleep(Duration::from_millis(120)).await;

        lock(controller.session()).replace_places(Vec::new());
        assert_eq!(controller.status(), SpinStatus::Idle);
        assert!(!controller.can_start());
        assert!(!controller.start());

        sleep(Duration::from_secs(5)).await;
        assert_eq!(controller.status(), SpinStatus::Idle);
    }
}
