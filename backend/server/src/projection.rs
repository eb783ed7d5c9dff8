//! # Marker Projection
//!
//! Turns the aggregated places into markers on a [`MapSurface`] and keeps the two paired.
//!
//! Each marker is stored next to the place it was created for ([`Pin`]) and looked up by place id, so a provider
//! that reorders results between searches can never make the roulette highlight one place and describe another.
use std::collections::HashMap;

use places::{Coordinate, Place};
use tracing::{debug, info};

use crate::map::{BASE_STACK_ORDER, Callout, MapSurface, RAISED_STACK_ORDER};

pub struct Pin<M> {
    pub place: Place,
    pub marker: M,
}

pub struct MapBoard<S: MapSurface> {
    surface: S,
    pins: Vec<Pin<S::Marker>>,
    by_id: HashMap<String, usize>,
    callout: Option<S::Overlay>,
}

impl<S: MapSurface> MapBoard<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            pins: Vec::new(),
            by_id: HashMap::new(),
            callout: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn pins(&self) -> &[Pin<S::Marker>] {
        &self.pins
    }

    pub fn pin(&self, place_id: &str) -> Option<&Pin<S::Marker>> {
        self.by_id.get(place_id).map(|&index| &self.pins[index])
    }

    pub fn has_callout(&self) -> bool {
        self.callout.is_some()
    }

    pub fn recenter(&mut self, center: Coordinate) {
        self.surface.set_center(center);
    }

    /// Replaces the marker set with one marker per place, in input order. Repeated ids keep their first
    /// occurrence.
    pub fn project(&mut self, places: Vec<Place>) -> usize {
        self.dismiss_callout();

        for pin in self.pins.drain(..) {
            self.surface.remove_marker(&pin.marker);
        }
        self.by_id.clear();

        for place in places {
            if self.by_id.contains_key(&place.id) {
                debug!("Duplicate place {}, skipping", place.id);
                continue;
            }

            let marker = self.surface.create_marker(place.coordinate(), &place.name);
            self.by_id.insert(place.id.clone(), self.pins.len());
            self.pins.push(Pin { place, marker });
        }

        info!("Projected {} markers", self.pins.len());
        self.pins.len()
    }

    /// Marker click: swaps whatever callout is open for the clicked place's.
    pub fn click_marker(&mut self, place_id: &str) -> bool {
        match self.by_id.get(place_id).copied() {
            Some(index) => self.open_callout(index),
            None => false,
        }
    }

    /// Map click.
    pub fn dismiss_callout(&mut self) {
        if let Some(overlay) = self.callout.take() {
            self.surface.close_overlay(overlay);
        }
    }

    pub(crate) fn open_callout(&mut self, index: usize) -> bool {
        self.dismiss_callout();

        let Some(pin) = self.pins.get(index) else {
            return false;
        };

        let overlay = self
            .surface
            .open_overlay(Callout::for_place(&pin.place), &pin.marker);
        self.callout = Some(overlay);

        true
    }

    pub(crate) fn lower(&mut self, index: usize) {
        if let Some(pin) = self.pins.get(index) {
            self.surface.set_stack_order(&pin.marker, BASE_STACK_ORDER);
        }
    }

    /// Raises the marker above the rest and centers the map on it.
    pub(crate) fn focus(&mut self, index: usize) {
        if let Some(pin) = self.pins.get(index) {
            self.surface.set_stack_order(&pin.marker, RAISED_STACK_ORDER);

            let position = self.surface.marker_position(&pin.marker);
            self.surface.set_center(position);
        }
    }

    pub(crate) fn lower_all(&mut self) {
        for pin in &self.pins {
            self.surface.set_stack_order(&pin.marker, BASE_STACK_ORDER);
        }
    }
}
