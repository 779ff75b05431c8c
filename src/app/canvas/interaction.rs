use eframe::egui::{self, Event, PointerButton, Pos2, Rect, TouchId, TouchPhase, Ui};

use super::super::ViewModel;
use super::view::{NodeSprite, sprite_at};

/// Active touch points in the order they landed.
#[derive(Debug, Default)]
pub(in crate::app) struct TouchTracker {
    active: Vec<(TouchId, Pos2)>,
}

impl TouchTracker {
    pub(in crate::app) fn update(&mut self, id: TouchId, phase: TouchPhase, pos: Pos2) {
        match phase {
            TouchPhase::Start | TouchPhase::Move => {
                match self.active.iter_mut().find(|(active_id, _)| *active_id == id) {
                    Some((_, active_pos)) => *active_pos = pos,
                    None => self.active.push((id, pos)),
                }
            }
            TouchPhase::End | TouchPhase::Cancel => {
                self.active.retain(|(active_id, _)| *active_id != id);
            }
        }
    }

    pub(in crate::app) fn is_active(&self) -> bool {
        !self.active.is_empty()
    }

    pub(in crate::app) fn points(&self) -> Vec<Pos2> {
        self.active.iter().map(|(_, pos)| *pos).collect()
    }
}

/// The canvas as input sees it for one frame.
struct CanvasSurface<'a> {
    rect: Rect,
    /// False when a window or panel sits between the pointer and the canvas.
    hovered: bool,
    sprites: &'a [NodeSprite],
}

impl CanvasSurface<'_> {
    fn accepts_press(&self, pos: Pos2) -> bool {
        self.hovered && self.rect.contains(pos)
    }
}

impl ViewModel {
    /// Translates this frame's raw input into viewport transitions. Presses on
    /// a member node never start a pan; they select the member on release.
    pub(in crate::app) fn handle_canvas_input(
        &mut self,
        ui: &Ui,
        rect: Rect,
        response: &egui::Response,
        sprites: &[NodeSprite],
    ) {
        let (events, primary_down, scroll) = ui.input(|input| {
            (
                input.events.clone(),
                input.pointer.primary_down(),
                input.raw_scroll_delta.y,
            )
        });
        let surface = CanvasSurface {
            rect,
            hovered: response.hovered(),
            sprites,
        };

        self.apply_canvas_events(&events, &surface, primary_down);

        if surface.hovered && scroll.abs() > f32::EPSILON {
            // egui reports scroll-up as positive; the viewport takes DOM deltas
            self.viewport.wheel(-scroll);
        }
    }

    fn apply_canvas_events(
        &mut self,
        events: &[Event],
        surface: &CanvasSurface<'_>,
        primary_down: bool,
    ) {
        let touch_frame = self.touches.is_active()
            || events
                .iter()
                .any(|event| matches!(event, Event::Touch { .. }));

        for event in events {
            match event {
                Event::Touch { id, phase, pos, .. } => {
                    self.apply_touch(*id, *phase, *pos, surface);
                }
                // egui mirrors touches as pointer events; the touch path owns those frames
                _ if touch_frame => {}
                Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed: true,
                    ..
                } => self.canvas_press(*pos, surface),
                Event::PointerButton {
                    pos,
                    button: PointerButton::Primary,
                    pressed: false,
                    ..
                } => self.canvas_release(*pos, surface),
                Event::PointerMoved(pos) => {
                    if surface.rect.contains(*pos) {
                        self.viewport.pointer_move(*pos);
                    } else {
                        self.viewport.pointer_left();
                    }
                }
                Event::PointerGone => self.viewport.pointer_left(),
                _ => {}
            }
        }

        // A release can land anywhere, even outside the window, so a pan
        // always ends once no button is held.
        if self.viewport.is_panning() && !touch_frame && !primary_down {
            self.viewport.pointer_up();
        }
    }

    fn canvas_press(&mut self, pos: Pos2, surface: &CanvasSurface<'_>) {
        if !surface.accepts_press(pos) {
            return;
        }
        match sprite_at(surface.sprites, pos) {
            Some(sprite) => self.pressed_member = Some(sprite.member_id.clone()),
            None => self.viewport.pointer_down(pos),
        }
    }

    fn canvas_release(&mut self, pos: Pos2, surface: &CanvasSurface<'_>) {
        if let Some(pressed) = self.pressed_member.take()
            && sprite_at(surface.sprites, pos).is_some_and(|sprite| sprite.member_id == pressed)
        {
            self.selected = Some(pressed);
        }
        self.viewport.pointer_up();
    }

    /// One finger acts like the mouse; a second one turns the gesture into
    /// a pinch. Touches that begin off the canvas are ignored until lifted.
    fn apply_touch(
        &mut self,
        id: TouchId,
        phase: TouchPhase,
        pos: Pos2,
        surface: &CanvasSurface<'_>,
    ) {
        let engaged = self.viewport.is_panning()
            || self.viewport.is_pinching()
            || self.pressed_member.is_some();
        self.touches.update(id, phase, pos);
        let points = self.touches.points();

        match points.as_slice() {
            [] => {
                if phase == TouchPhase::End {
                    self.canvas_release(pos, surface);
                } else {
                    self.pressed_member = None;
                }
                self.viewport.touch_points(&[]);
            }
            [only] if !engaged => {
                if phase == TouchPhase::Start {
                    self.canvas_press(*only, surface);
                }
            }
            [only] => {
                if self.viewport.is_pinching() {
                    // back to one finger: it keeps panning from where it is
                    self.viewport.touch_points(&points);
                } else if self.viewport.is_panning() {
                    self.viewport.pointer_move(*only);
                }
            }
            _ if engaged => {
                self.pressed_member = None;
                self.viewport.touch_points(&points);
            }
            _ => {}
        }
    }
}
