//! # Scout
//!
//! Terminal run of the whole pipeline against the live provider: locate, search, list, and optionally spin.
//! Handy for checking a Kakao key or seeing what a spot has to offer without the frontend.
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::bail;
use indicatif::{ProgressBar, ProgressStyle};
use places::{Coordinate, KakaoPlaces, PlacesAggregator};
use server::{
    category::{emoji, simplify},
    config::Config,
    controller::{RouletteController, SpinTrigger},
    geoip::IpGeolocator,
    location::LocationAcquirer,
    map::MapOptions,
    notice::Notices,
    roulette::{RandomDraw, RouletteEngine, SpinStatus},
    scene::SceneMap,
    session::{Session, lock, search_and_project},
};
use tokio::time::{interval, sleep};
use tracing::info;

pub async fn scout(center: Option<Coordinate>, spin: bool) -> anyhow::Result<()> {
    let config = Config::load()?;

    let center = match center {
        Some(center) => center,
        None => locate(&config).await?,
    };

    let aggregator = PlacesAggregator::new(KakaoPlaces::new(
        &config.kakao_base_url,
        &config.kakao_rest_key,
        config.search_timeout,
    )?);

    let session = Arc::new(Mutex::new(Session::new(
        SceneMap::new(center, MapOptions::default()),
        RouletteEngine::new(config.roulette.clone(), RandomDraw::from_os()),
    )));

    let pb = spinner()?;
    pb.set_message(format!(
        "Searching around ({}, {})",
        center.latitude, center.longitude
    ));

    let places = search_and_project(&aggregator, &session, center)
        .await
        .unwrap_or_default();
    pb.finish_with_message(format!("Found {} places", places.len()));

    for (n, place) in places.iter().enumerate() {
        println!(
            "{:>3}. {} {} ({})",
            n + 1,
            emoji(&place.category),
            place.name,
            simplify(&place.category)
        );
    }

    if places.is_empty() {
        println!("\nNothing nearby. Exiting.");
        return Ok(());
    }

    if spin {
        roulette(session, config.roulette.settle_delay).await?;
    }

    Ok(())
}

async fn locate(config: &Config) -> anyhow::Result<Coordinate> {
    let notices = Notices::new();
    let locator = LocationAcquirer::new(IpGeolocator::new(&config.geoip_url)?, notices.clone());

    let acquired = locator.acquire().await;
    if let Some(notice) = notices.current() {
        println!("{}", notice.message);
    }

    Ok(acquired.coordinate)
}

async fn roulette(session: Arc<Mutex<Session<SceneMap>>>, settle_delay: Duration) -> anyhow::Result<()> {
    let controller = RouletteController::new(session.clone());
    let mut status = controller.subscribe();

    if !controller.start() {
        bail!("Roulette could not start");
    }

    let pb = spinner()?;
    let mut ticker = interval(Duration::from_millis(40));

    let winner = loop {
        tokio::select! {
            changed = status.changed() => {
                changed?;
                if let SpinStatus::Settled { winner } = *status.borrow_and_update() {
                    break winner;
                }
            }
            _ = ticker.tick() => {
                if let Some(title) = highlighted(&session) {
                    pb.set_message(title);
                }
            }
        }
    };
    pb.finish_and_clear();
    info!("Settled on index {winner}");

    sleep(settle_delay + Duration::from_millis(50)).await;

    let session = lock(&session);
    match session.board.surface().overlay() {
        Some(overlay) => println!(
            "\n{} {} ({})",
            overlay.callout.emoji, overlay.callout.title, overlay.callout.category
        ),
        None => bail!("Roulette settled without a callout"),
    }

    Ok(())
}

fn highlighted(session: &Mutex<Session<SceneMap>>) -> Option<String> {
    let session = lock(session);
    let scene = session.board.surface();

    scene
        .raised()
        .first()
        .and_then(|&id| scene.marker(id))
        .map(|marker| marker.title.clone())
}

fn spinner() -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {msg}",
    )?);
    pb.enable_steady_tick(Duration::from_millis(100));

    Ok(pb)
}
