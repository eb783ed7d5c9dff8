use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{self, Path},
    http::StatusCode,
};
use places::{Coordinate, Place};
use serde::Serialize;

use crate::{
    controller::SpinTrigger,
    error::AppError,
    location::Acquired,
    map::{Callout, MapOptions, MapSurface},
    notice::Notice,
    roulette::SpinStatus,
    scene::{MarkerId, SceneMap},
    session::{Session, lock, search_and_project},
    state::State,
    utils::get_fix_from_body,
};

type AppState = extract::State<Arc<State>>;

#[derive(Serialize)]
pub struct LocateResponse {
    #[serde(flatten)]
    pub location: Acquired,
    /// `None` when another search was still running.
    pub places: Option<Vec<Place>>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub center: Coordinate,
    pub places: Option<Vec<Place>>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub spinning: bool,
    pub can_start: bool,
    #[serde(flatten)]
    pub roulette: SpinStatus,
    pub winner_place: Option<String>,
}

#[derive(Serialize)]
pub struct SpinResponse {
    pub accepted: bool,
    pub status: StatusResponse,
}

#[derive(Serialize)]
pub struct MarkerView {
    pub id: MarkerId,
    pub place_id: String,
    pub title: String,
    pub position: Coordinate,
    pub stack_order: i32,
}

#[derive(Serialize)]
pub struct SceneResponse {
    pub center: Coordinate,
    pub options: MapOptions,
    pub markers: Vec<MarkerView>,
    pub callout: Option<Callout>,
    pub notice: Option<Notice>,
    pub status: StatusResponse,
}

pub async fn locate_handler(
    extract::State(state): AppState,
    body: Bytes,
) -> Result<Json<LocateResponse>, AppError> {
    let location = match get_fix_from_body(body)? {
        Some(outcome) => state.locator.settle(outcome),
        None => state.locator.acquire().await,
    };

    let places = search_and_project(&state.places, &state.session, location.coordinate).await;

    Ok(Json(LocateResponse { location, places }))
}

pub async fn search_handler(extract::State(state): AppState) -> Json<SearchResponse> {
    let center = lock(&state.session).board.surface().center();
    let places = search_and_project(&state.places, &state.session, center).await;

    Json(SearchResponse { center, places })
}

pub async fn status_handler(extract::State(state): AppState) -> Json<StatusResponse> {
    Json(status(&state))
}

pub async fn spin_handler(extract::State(state): AppState) -> Json<SpinResponse> {
    let accepted = state.roulette.start();

    Json(SpinResponse {
        accepted,
        status: status(&state),
    })
}

pub async fn cancel_handler(extract::State(state): AppState) -> Json<SpinResponse> {
    let accepted = state.roulette.cancel();

    Json(SpinResponse {
        accepted,
        status: status(&state),
    })
}

pub async fn map_click_handler(extract::State(state): AppState) -> StatusCode {
    lock(&state.session).board.dismiss_callout();

    StatusCode::NO_CONTENT
}

pub async fn marker_click_handler(
    extract::State(state): AppState,
    Path(place_id): Path<String>,
) -> Result<Json<Callout>, AppError> {
    let mut session = lock(&state.session);

    if !session.board.click_marker(&place_id) {
        return Err(AppError::UnknownPlace(place_id));
    }

    session
        .board
        .surface()
        .overlay()
        .map(|overlay| Json(overlay.callout.clone()))
        .ok_or(AppError::UnknownPlace(place_id))
}

pub async fn scene_handler(extract::State(state): AppState) -> Json<SceneResponse> {
    let status = status(&state);
    let session = lock(&state.session);

    Json(scene(&session, state.notices.current(), status))
}

fn status(state: &State) -> StatusResponse {
    let roulette = state.roulette.status();

    let winner_place = match roulette {
        SpinStatus::Settled { winner } => lock(&state.session)
            .board
            .pins()
            .get(winner)
            .map(|pin| pin.place.id.clone()),
        _ => None,
    };

    StatusResponse {
        spinning: roulette.is_spinning(),
        can_start: state.roulette.can_start(),
        roulette,
        winner_place,
    }
}

fn scene(session: &Session<SceneMap>, notice: Option<Notice>, status: StatusResponse) -> SceneResponse {
    let surface = session.board.surface();

    let markers = session
        .board
        .pins()
        .iter()
        .filter_map(|pin| {
            surface.marker(pin.marker).map(|marker| MarkerView {
                id: marker.id,
                place_id: pin.place.id.clone(),
                title: marker.title.clone(),
                position: marker.position,
                stack_order: marker.stack_order,
            })
        })
        .collect();

    SceneResponse {
        center: surface.center(),
        options: surface.options().clone(),
        markers,
        callout: surface.overlay().map(|overlay| overlay.callout.clone()),
        notice,
        status,
    }
}
