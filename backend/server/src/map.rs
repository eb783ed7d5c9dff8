//! # Map Surface
//!
//! Everything the core needs from a rendering surface: markers with a stacking order, a center, and one kind of
//! overlay (the detail callout). The roulette engine and the projection layer only ever talk to this trait, so
//! tests can swap in [`crate::scene::SceneMap`] without any network or rendering.
use places::{Coordinate, Place};
use serde::Serialize;

use crate::category::{emoji, simplify};

pub const BASE_STACK_ORDER: i32 = 1;
pub const RAISED_STACK_ORDER: i32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapOptions {
    /// Zoom level, 1 is the closest.
    pub level: u8,
    pub draggable: bool,
    pub scroll_wheel: bool,
    pub double_click_zoom: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            level: 2,
            draggable: true,
            scroll_wheel: false,
            double_click_zoom: false,
        }
    }
}

/// Detail bubble anchored to a marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Callout {
    pub place_id: String,
    pub title: String,
    pub category: String,
    pub emoji: &'static str,
}

impl Callout {
    pub fn for_place(place: &Place) -> Self {
        Self {
            place_id: place.id.clone(),
            title: place.name.clone(),
            category: simplify(&place.category).to_string(),
            emoji: emoji(&place.category),
        }
    }
}

pub trait MapSurface: Send + 'static {
    type Marker: Clone + Send;
    type Overlay: Send;

    fn center(&self) -> Coordinate;

    fn set_center(&mut self, center: Coordinate);

    fn create_marker(&mut self, position: Coordinate, title: &str) -> Self::Marker;

    fn remove_marker(&mut self, marker: &Self::Marker);

    fn marker_position(&self, marker: &Self::Marker) -> Coordinate;

    fn set_stack_order(&mut self, marker: &Self::Marker, order: i32);

    fn open_overlay(&mut self, callout: Callout, anchor: &Self::Marker) -> Self::Overlay;

    fn close_overlay(&mut self, overlay: Self::Overlay);
}
