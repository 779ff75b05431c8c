use eframe::egui::{Pos2, Rect, Vec2};

pub(crate) const MIN_ZOOM: f32 = 0.3;
pub(crate) const MAX_ZOOM: f32 = 2.0;
const WHEEL_ZOOM_RATE: f32 = 0.001;
const PINCH_ZOOM_RATE: f32 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Gesture {
    Idle,
    /// `origin` is the pointer position minus the pan at press time.
    Panning { origin: Vec2 },
}

/// Pan/zoom shared by every member node. Positions stay in world space; only
/// this transform changes while the user drags or zooms.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Viewport {
    pan: Vec2,
    zoom: f32,
    gesture: Gesture,
    pinch_distance: Option<f32>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            gesture: Gesture::Idle,
            pinch_distance: None,
        }
    }
}

impl Viewport {
    pub(crate) fn pan(&self) -> Vec2 {
        self.pan
    }

    pub(crate) fn zoom(&self) -> f32 {
        self.zoom
    }

    #[cfg(test)]
    pub(crate) fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub(crate) fn is_panning(&self) -> bool {
        matches!(self.gesture, Gesture::Panning { .. })
    }

    pub(crate) fn is_pinching(&self) -> bool {
        self.pinch_distance.is_some()
    }

    /// Starts a pan. Callers only forward presses that land on the background.
    pub(crate) fn pointer_down(&mut self, pointer: Pos2) {
        if self.gesture == Gesture::Idle && !self.is_pinching() {
            self.gesture = Gesture::Panning {
                origin: pointer.to_vec2() - self.pan,
            };
        }
    }

    pub(crate) fn pointer_move(&mut self, pointer: Pos2) {
        if let Gesture::Panning { origin } = self.gesture {
            self.pan = pointer.to_vec2() - origin;
        }
    }

    pub(crate) fn pointer_up(&mut self) {
        self.gesture = Gesture::Idle;
    }

    pub(crate) fn pointer_left(&mut self) {
        self.gesture = Gesture::Idle;
    }

    /// `delta_y` follows the DOM convention: positive scrolls down and zooms out.
    pub(crate) fn wheel(&mut self, delta_y: f32) {
        self.adjust_zoom(-delta_y * WHEEL_ZOOM_RATE);
    }

    /// Feeds the full set of active touch points after a touch event.
    pub(crate) fn touch_points(&mut self, points: &[Pos2]) {
        match points {
            [] => {
                self.gesture = Gesture::Idle;
                self.pinch_distance = None;
            }
            [single] => {
                self.pinch_distance = None;
                match self.gesture {
                    Gesture::Idle => self.pointer_down(*single),
                    Gesture::Panning { .. } => self.pointer_move(*single),
                }
            }
            [first, second, ..] => {
                self.gesture = Gesture::Idle;
                let distance = first.distance(*second);
                if let Some(last) = self.pinch_distance {
                    self.adjust_zoom((distance - last) * PINCH_ZOOM_RATE);
                }
                self.pinch_distance = Some(distance);
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn world_to_screen(&self, rect: Rect, world: Vec2) -> Pos2 {
        rect.center() + self.pan + world * self.zoom
    }

    fn adjust_zoom(&mut self, delta: f32) {
        if !delta.is_finite() {
            return;
        }
        self.zoom = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
    }
}
