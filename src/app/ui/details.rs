use eframe::egui::{self, Align2, Color32, Context, RichText};

use crate::util::{format_join_date, initial, profile_link};

use super::super::ViewModel;
use super::super::render_utils::{blend_color, member_colors};

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ctx: &Context) {
        let Some(selected_id) = self.selected.clone() else {
            return;
        };
        let Some(entry) = self.member_entry(&selected_id) else {
            self.selected = None;
            return;
        };

        let member = &entry.member;
        let (start, end) = member_colors(&member.handle);
        let is_self = self.session.current_member_id() == Some(member.id.as_str());

        let mut open = true;
        egui::Window::new(format!("@{}", member.handle))
            .id(egui::Id::new("member_details"))
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::RIGHT_TOP, [-16.0, 16.0])
            .default_width(320.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let (rect, _) =
                        ui.allocate_exact_size(egui::vec2(48.0, 48.0), egui::Sense::hover());
                    ui.painter()
                        .circle_filled(rect.center(), 24.0, blend_color(start, end, 0.5));
                    ui.painter().text(
                        rect.center(),
                        Align2::CENTER_CENTER,
                        initial(&member.handle),
                        egui::FontId::proportional(22.0),
                        Color32::WHITE,
                    );

                    ui.vertical(|ui| {
                        ui.label(RichText::new(format!("@{}", member.handle)).strong());
                        ui.label(
                            RichText::new(format!("Joined {}", format_join_date(member.joined_at)))
                                .weak(),
                        );
                        if is_self {
                            ui.label(RichText::new("This is you").color(start));
                        }
                    });
                });

                ui.separator();
                ui.label(RichText::new("Why Privacy Matters").strong());
                ui.label(member.bio_text.as_str());

                ui.add_space(6.0);
                match entry.latest_attempt {
                    Some(attempt) => {
                        ui.label(format!("Quiz score: {}/{}", attempt.score, attempt.total));
                    }
                    None => {
                        ui.label(RichText::new("Has not taken the quiz yet").weak());
                    }
                }

                if let Some(photo_url) = &member.photo_url {
                    ui.small(format!("Photo: {photo_url}"));
                }

                ui.add_space(6.0);
                ui.hyperlink_to("View on X", profile_link(&member.handle));
            });

        if !open {
            self.selected = None;
        }
    }
}
