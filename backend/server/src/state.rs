use std::sync::{Arc, Mutex};

use places::{DEFAULT_COORDINATE, KakaoPlaces, PlacesAggregator};

use super::{
    config::Config,
    controller::RouletteController,
    error::AppError,
    geoip::IpGeolocator,
    location::LocationAcquirer,
    map::MapOptions,
    notice::Notices,
    roulette::{RandomDraw, RouletteEngine},
    scene::SceneMap,
    session::Session,
};

pub struct State {
    pub config: Config,
    pub places: PlacesAggregator<KakaoPlaces>,
    pub locator: LocationAcquirer<IpGeolocator>,
    pub notices: Notices,
    pub session: Arc<Mutex<Session<SceneMap>>>,
    pub roulette: RouletteController<SceneMap>,
}

impl State {
    pub fn new(config: Config) -> Result<Arc<Self>, AppError> {
        let provider = KakaoPlaces::new(
            &config.kakao_base_url,
            &config.kakao_rest_key,
            config.search_timeout,
        )
        .map_err(|e| AppError::InternalError(e.into()))?;

        let geolocator =
            IpGeolocator::new(&config.geoip_url).map_err(|e| AppError::InternalError(e.into()))?;

        let notices = Notices::new();

        let session = Arc::new(Mutex::new(Session::new(
            SceneMap::new(DEFAULT_COORDINATE, MapOptions::default()),
            RouletteEngine::new(config.roulette.clone(), RandomDraw::from_os()),
        )));
        let roulette = RouletteController::new(session.clone());

        Ok(Arc::new(Self {
            places: PlacesAggregator::new(provider),
            locator: LocationAcquirer::new(geolocator, notices.clone()),
            notices,
            session,
            roulette,
            config,
        }))
    }
}
