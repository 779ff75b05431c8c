use std::collections::HashSet;
use std::sync::Arc;

use eframe::egui::{
    self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Ui, Vec2, vec2,
};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::layout::RING_RADIUS;
use crate::util::initial;

use super::super::render_utils::{
    blend_color, circle_visible, dim_color, draw_background, member_colors,
};
use super::super::{SearchMatchCache, ViewModel};

const NODE_RADIUS: f32 = 80.0;
const OUTER_RING_GAP: f32 = 50.0;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// A member node as placed on screen this frame.
pub(in crate::app) struct NodeSprite {
    pub(in crate::app) index: usize,
    pub(in crate::app) member_id: String,
    pub(in crate::app) center: Pos2,
    pub(in crate::app) radius: f32,
}

/// The node under `pos`, preferring the closest centre where nodes overlap.
pub(in crate::app) fn sprite_at(sprites: &[NodeSprite], pos: Pos2) -> Option<&NodeSprite> {
    sprites
        .iter()
        .filter_map(|sprite| {
            let distance = sprite.center.distance(pos);
            (distance <= sprite.radius).then_some((sprite, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(sprite, _)| sprite)
}

impl ViewModel {
    fn cached_search_matches(&mut self) -> Option<Arc<HashSet<String>>> {
        let query = self.search.trim();
        if query.is_empty() {
            return None;
        }

        if let Some(cached) = &self.search_match_cache
            && cached.members_revision == self.members_revision
            && cached.query == query
        {
            return Some(Arc::clone(&cached.matches));
        }

        let matcher = SkimMatcherV2::default();
        let matches = self
            .members
            .iter()
            .filter(|entry| fuzzy_match_score(&matcher, &entry.member.handle, query).is_some())
            .map(|entry| entry.member.id.clone())
            .collect::<HashSet<_>>();
        let matches = Arc::new(matches);

        self.search_match_cache = Some(SearchMatchCache {
            query: query.to_owned(),
            members_revision: self.members_revision,
            matches: Arc::clone(&matches),
        });

        Some(matches)
    }

    fn node_sprites(&self, rect: Rect) -> Vec<NodeSprite> {
        let radius = NODE_RADIUS * self.viewport.zoom();
        self.members
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let world = self.positions.get(&entry.member.id)?;
                let center = self.viewport.world_to_screen(rect, world);
                circle_visible(rect, center, radius).then(|| NodeSprite {
                    index,
                    member_id: entry.member.id.clone(),
                    center,
                    radius,
                })
            })
            .collect()
    }

    pub(in crate::app) fn draw_canvas(&mut self, ui: &mut Ui) {
        self.refresh_positions();

        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        let sprites = self.node_sprites(rect);
        self.hovered = match response.hover_pos() {
            Some(pointer) if !self.viewport.is_panning() => {
                sprite_at(&sprites, pointer).map(|sprite| sprite.member_id.clone())
            }
            _ => None,
        };

        self.handle_canvas_input(ui, rect, &response, &sprites);
        let hovered = self.hovered.clone();

        if self.viewport.is_panning() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        } else if hovered.is_some() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
        } else if response.hovered() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
        }

        // Input may have moved the view; lay out again against the new transform.
        let sprites = self.node_sprites(rect);
        self.visible_member_count = sprites.len();
        let pan = self.viewport.pan();
        let zoom = self.viewport.zoom();

        draw_background(&painter, rect, pan, zoom);
        self.draw_guide_rings(&painter, rect, zoom);

        let search_matches = self.cached_search_matches();
        let search_active = search_matches
            .as_ref()
            .is_some_and(|matches| !matches.is_empty());
        let own_id = self.session.current_member_id().map(str::to_owned);

        for sprite in &sprites {
            let entry = &self.members[sprite.index];
            let member = &entry.member;
            let is_hovered = hovered.as_deref() == Some(member.id.as_str());
            let is_selected = self.selected.as_deref() == Some(member.id.as_str());
            let is_match = search_matches
                .as_ref()
                .is_some_and(|matches| matches.contains(&member.id));
            let is_self = own_id.as_deref() == Some(member.id.as_str());

            let (start, end) = member_colors(&member.handle);
            let mut ring_color = blend_color(start, end, 0.5);
            if search_active && !is_match {
                ring_color = dim_color(ring_color, 0.35);
            }

            let radius = if is_hovered {
                sprite.radius * 1.12
            } else {
                sprite.radius
            };
            painter.circle_filled(sprite.center, radius, ring_color);
            painter.circle_filled(
                sprite.center,
                (radius - 3.0).max(1.0),
                Color32::from_rgba_unmultiplied(15, 23, 42, 215),
            );

            if is_selected || is_self || is_match {
                let accent = if is_selected {
                    Color32::from_rgb(245, 206, 93)
                } else if is_match {
                    Color32::from_rgb(103, 196, 255)
                } else {
                    Color32::from_rgb(34, 211, 238)
                };
                painter.circle_stroke(sprite.center, radius + 4.0, Stroke::new(2.0, accent));
            }

            if radius > 14.0 {
                painter.text(
                    sprite.center - vec2(0.0, radius * 0.18),
                    Align2::CENTER_CENTER,
                    initial(&member.handle),
                    FontId::proportional((radius * 0.42).clamp(10.0, 40.0)),
                    Color32::from_gray(240),
                );
                painter.text(
                    sprite.center + vec2(0.0, radius * 0.32),
                    Align2::CENTER_CENTER,
                    format!("@{}", member.handle),
                    FontId::proportional((radius * 0.15).clamp(9.0, 16.0)),
                    Color32::from_gray(225),
                );
            }

            if is_hovered && let Some(attempt) = entry.latest_attempt {
                painter.text(
                    sprite.center + vec2(0.0, radius + 14.0),
                    Align2::CENTER_CENTER,
                    format!("quiz {}/{}", attempt.score, attempt.total),
                    FontId::proportional(12.0),
                    Color32::from_gray(230),
                );
            }
        }

        self.draw_canvas_footer(&painter, rect);
    }

    fn draw_guide_rings(&self, painter: &egui::Painter, rect: Rect, zoom: f32) {
        let center = self.viewport.world_to_screen(rect, Vec2::ZERO);
        painter.circle_stroke(
            center,
            RING_RADIUS * zoom,
            Stroke::new(2.0, Color32::from_rgba_unmultiplied(6, 182, 212, 76)),
        );
        painter.circle_stroke(
            center,
            (RING_RADIUS + OUTER_RING_GAP) * zoom,
            Stroke::new(1.0, Color32::from_rgba_unmultiplied(34, 211, 238, 51)),
        );
        painter.circle_filled(center, 8.0 * zoom.max(0.5), Color32::from_rgb(34, 211, 238));
    }

    fn draw_canvas_footer(&self, painter: &egui::Painter, rect: Rect) {
        let anchor = rect.left_bottom() + vec2(16.0, -16.0);
        let hint = painter.layout_no_wrap(
            "Scroll to zoom \u{2022} Drag to pan".to_owned(),
            FontId::proportional(13.0),
            Color32::from_gray(240),
        );
        let count = painter.layout_no_wrap(
            format!(
                "{} members in the circle ({} in view)",
                self.members.len(),
                self.visible_member_count
            ),
            FontId::proportional(13.0),
            Color32::from_rgb(34, 211, 238),
        );

        let width = hint.size().x.max(count.size().x) + 24.0;
        let height = hint.size().y + count.size().y + 18.0;
        let panel = Rect::from_min_size(anchor - vec2(0.0, height), vec2(width, height));
        painter.rect_filled(panel, 8.0, Color32::from_rgba_unmultiplied(0, 0, 0, 128));

        let text_origin = panel.left_top() + vec2(12.0, 8.0);
        let count_origin = text_origin + vec2(0.0, hint.size().y + 2.0);
        painter.galley(text_origin, hint, Color32::from_gray(240));
        painter.galley(count_origin, count, Color32::from_rgb(34, 211, 238));
    }
}
