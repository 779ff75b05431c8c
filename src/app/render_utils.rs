use eframe::egui::{Color32, Painter, Pos2, Rect, Vec2};

const MEMBER_PALETTE: [(Color32, Color32); 6] = [
    (Color32::from_rgb(59, 130, 246), Color32::from_rgb(6, 182, 212)),
    (Color32::from_rgb(16, 185, 129), Color32::from_rgb(20, 184, 166)),
    (Color32::from_rgb(244, 63, 94), Color32::from_rgb(236, 72, 153)),
    (Color32::from_rgb(245, 158, 11), Color32::from_rgb(249, 115, 22)),
    (Color32::from_rgb(14, 165, 233), Color32::from_rgb(59, 130, 246)),
    (Color32::from_rgb(139, 92, 246), Color32::from_rgb(168, 85, 247)),
];

pub(super) fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

pub(super) fn dim_color(color: Color32, factor: f32) -> Color32 {
    let factor = factor.clamp(0.0, 1.0);
    Color32::from_rgba_unmultiplied(
        (color.r() as f32 * factor) as u8,
        (color.g() as f32 * factor) as u8,
        (color.b() as f32 * factor) as u8,
        (color.a() as f32 * (0.45 + (factor * 0.55))) as u8,
    )
}

/// Gradient endpoints for a member, picked by the handle's first character.
pub(super) fn member_colors(handle: &str) -> (Color32, Color32) {
    let code = handle.chars().next().map_or(0, u32::from) as usize;
    MEMBER_PALETTE[code % MEMBER_PALETTE.len()]
}

pub(super) fn draw_background(painter: &Painter, rect: Rect, pan: Vec2, zoom: f32) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(15, 23, 42));

    let step = (50.0 * zoom.clamp(0.6, 1.8)).max(20.0);
    let origin = rect.center() + pan;
    let dot = Color32::from_rgba_unmultiplied(255, 255, 255, 30);

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
        while x < rect.right() {
            painter.circle_filled(Pos2::new(x, y), 1.0, dot);
            x += step;
        }
        y += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

#[cfg(test)]
mod tests {
    use eframe::egui::{pos2, vec2};

    use super::*;

    #[test]
    fn palette_is_chosen_by_first_character() {
        // 'a' is 97, 97 % 6 == 1
        assert_eq!(member_colors("alice"), MEMBER_PALETTE[1]);
        assert_eq!(member_colors("alice"), member_colors("anna"));
        assert_eq!(member_colors(""), MEMBER_PALETTE[0]);
    }

    #[test]
    fn circles_touching_the_edge_count_as_visible() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 100.0));
        assert!(circle_visible(rect, pos2(-10.0, 50.0), 12.0));
        assert!(!circle_visible(rect, pos2(-20.0, 50.0), 12.0));
    }

    #[test]
    fn blending_fully_takes_the_overlay() {
        let base = Color32::from_rgb(0, 0, 0);
        let overlay = Color32::from_rgb(200, 100, 50);
        assert_eq!(blend_color(base, overlay, 1.0), overlay);
        assert_eq!(blend_color(base, overlay, 0.0), base);
    }
}
