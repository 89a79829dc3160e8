//! Pointer-driven element manipulation. One session at a time turns a
//! stream of neutral pointer positions into move/resize/rotate updates
//! of a single element; the input modality (mouse, touch) never
//! reaches this layer.

use crate::{
    core::{ScreenPoint, StagePoint},
    model::{DesignElement, ElementId, ViewLayout},
};

pub const ZOOM_MIN: f64 = 0.5;
pub const ZOOM_MAX: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.1;

/// Where the stage sits on screen: origin of the displayed rectangle,
/// the stage's layout size in screen pixels before magnification, and
/// the preview zoom factor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageMetrics {
    pub origin: ScreenPoint,
    pub width: f64,
    pub height: f64,
    pub zoom: f64,
}

impl StageMetrics {
    pub fn new(origin: ScreenPoint, width: f64, height: f64) -> Self {
        Self {
            origin,
            width,
            height,
            zoom: 1.0,
        }
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - ZOOM_STEP);
    }

    /// Screen position of a stage-percent point under the current zoom.
    pub fn stage_to_screen(&self, p: StagePoint) -> ScreenPoint {
        ScreenPoint::new(
            self.origin.x + p.x / 100.0 * self.width * self.zoom,
            self.origin.y + p.y / 100.0 * self.height * self.zoom,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransformMode {
    Moving,
    Resizing,
    Rotating,
}

/// Element fields captured at pointer-down. Move and resize updates are
/// computed against this snapshot, never against the element's current
/// values, so updates do not compound.
#[derive(Clone, Copy, Debug)]
pub struct ElementSnapshot {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation: f64,
}

/// The in-flight state of one pointer drag. Ephemeral, never persisted.
#[derive(Clone, Copy, Debug)]
pub struct GestureSession {
    pub mode: TransformMode,
    pub element: ElementId,
    pub start: ScreenPoint,
    pub snapshot: ElementSnapshot,
}

#[derive(Debug, Default)]
pub struct GestureController {
    session: Option<GestureSession>,
}

impl GestureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn mode(&self) -> Option<TransformMode> {
        self.session.map(|s| s.mode)
    }

    pub fn active_element(&self) -> Option<ElementId> {
        self.session.map(|s| s.element)
    }

    /// Opens a session over `element` at the given pointer position.
    /// Any session already in flight is replaced outright.
    pub fn begin(&mut self, mode: TransformMode, element: &DesignElement, pointer: ScreenPoint) {
        self.session = Some(GestureSession {
            mode,
            element: element.id,
            start: pointer,
            snapshot: ElementSnapshot {
                x: element.x,
                y: element.y,
                scale: element.scale,
                rotation: element.rotation,
            },
        });
    }

    /// Applies the in-flight gesture for the current pointer position,
    /// mutating the target element in `layout`. Returns the mutated
    /// element's id, or None when no session is active or its element
    /// no longer exists.
    pub fn update(
        &mut self,
        layout: &mut ViewLayout,
        metrics: &StageMetrics,
        pointer: ScreenPoint,
    ) -> Option<ElementId> {
        let session = self.session?;
        let element = layout.get_mut(session.element)?;

        let dx = (pointer.x - session.start.x) / metrics.zoom;
        let dy = (pointer.y - session.start.y) / metrics.zoom;

        match session.mode {
            TransformMode::Moving => {
                element.set_position(StagePoint::new(
                    session.snapshot.x + dx / metrics.width * 100.0,
                    session.snapshot.y + dy / metrics.height * 100.0,
                ));
            }
            TransformMode::Resizing => {
                // Direction comes from sign(dx+dy), not from radial
                // distance to the pivot, so some diagonal drags resize
                // against intuition. Candidate for a distance-from-pivot
                // rule.
                let dist = dx.hypot(dy);
                let direction = if dx + dy > 0.0 { 1.0 } else { -1.0 };
                element.set_scale(session.snapshot.scale + direction * dist / 200.0);
            }
            TransformMode::Rotating => {
                // Absolute: recomputed from pivot and pointer each
                // update. The +90 offset makes "straight up" 0 degrees.
                let pivot = metrics
                    .stage_to_screen(StagePoint::new(session.snapshot.x, session.snapshot.y));
                let angle = (pointer.y - pivot.y).atan2(pointer.x - pivot.x).to_degrees() + 90.0;
                element.set_rotation(angle);
            }
        }
        Some(session.element)
    }

    /// Closes the session on pointer-up or pointer-cancel. The last
    /// update already holds; ending mutates nothing further.
    pub fn end(&mut self) {
        self.session = None;
    }
}
