//! # Scene
//!
//! Headless map surface. Holds exactly what a frontend needs to draw the map (center, markers with their
//! stacking order, the open callout) and nothing else. The frontend polls `/scene` and renders it with whatever
//! map SDK it likes.
use places::Coordinate;
use serde::Serialize;

use crate::map::{BASE_STACK_ORDER, Callout, MapOptions, MapSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MarkerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverlayId(pub u64);

#[derive(Debug, Clone, Serialize)]
pub struct SceneMarker {
    pub id: MarkerId,
    pub title: String,
    pub position: Coordinate,
    pub stack_order: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenOverlay {
    pub id: OverlayId,
    pub anchor: MarkerId,
    pub callout: Callout,
}

pub struct SceneMap {
    center: Coordinate,
    options: MapOptions,
    markers: Vec<SceneMarker>,
    overlay: Option<OpenOverlay>,
    next_id: u64,
}

impl SceneMap {
    pub fn new(center: Coordinate, options: MapOptions) -> Self {
        Self {
            center,
            options,
            markers: Vec::new(),
            overlay: None,
            next_id: 0,
        }
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn markers(&self) -> &[SceneMarker] {
        &self.markers
    }

    pub fn marker(&self, id: MarkerId) -> Option<&SceneMarker> {
        self.markers.iter().find(|m| m.id == id)
    }

    pub fn overlay(&self) -> Option<&OpenOverlay> {
        self.overlay.as_ref()
    }

    /// Markers currently drawn above the baseline.
    pub fn raised(&self) -> Vec<MarkerId> {
        self.markers
            .iter()
            .filter(|m| m.stack_order > BASE_STACK_ORDER)
            .map(|m| m.id)
            .collect()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MapSurface for SceneMap {
    type Marker = MarkerId;
    type Overlay = OverlayId;

    fn center(&self) -> Coordinate {
        self.center
    }

    fn set_center(&mut self, center: Coordinate) {
        self.center = center;
    }

    fn create_marker(&mut self, position: Coordinate, title: &str) -> MarkerId {
        let id = MarkerId(self.next_id());

        self.markers.push(SceneMarker {
            id,
            title: title.to_string(),
            position,
            stack_order: BASE_STACK_ORDER,
        });

        id
    }

    fn remove_marker(&mut self, marker: &MarkerId) {
        self.markers.retain(|m| m.id != *marker);

        if self.overlay.as_ref().is_some_and(|o| o.anchor == *marker) {
            self.overlay = None;
        }
    }

    fn marker_position(&self, marker: &MarkerId) -> Coordinate {
        self.marker(*marker)
            .map(|m| m.position)
            .unwrap_or(self.center)
    }

    fn set_stack_order(&mut self, marker: &MarkerId, order: i32) {
        if let Some(m) = self.markers.iter_mut().find(|m| m.id == *marker) {
            m.stack_order = order;
        }
    }

    fn open_overlay(&mut self, callout: Callout, anchor: &MarkerId) -> OverlayId {
        let id = OverlayId(self.next_id());

        self.overlay = Some(OpenOverlay {
            id,
            anchor: *anchor,
            callout,
        });

        id
    }

    fn close_overlay(&mut self, overlay: OverlayId) {
        // A stale handle must not close a newer overlay.
        if self.overlay.as_ref().is_some_and(|o| o.id == overlay) {
            self.overlay = None;
        }
    }
}
