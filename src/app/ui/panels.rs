use eframe::egui::{self, Align, Color32, Layout, RichText, Ui};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_top_bar(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.heading("Member Circle");
            ui.label(RichText::new("Privacy advocates in Web3").weak());
            ui.separator();
            ui.label(format!("{} members", self.members.len()));
            ui.separator();

            ui.label("Find");
            ui.add(
                egui::TextEdit::singleline(&mut self.search)
                    .hint_text("@handle")
                    .desired_width(140.0),
            )
            .on_hover_text("Highlight members whose handle fuzzy-matches.");

            if ui
                .button("Reset view")
                .on_hover_text("Return to the centre at 100% zoom.")
                .clicked()
            {
                self.viewport.reset();
            }

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                let leave_label = self.session.current().map(|identity| {
                    identity
                        .handle
                        .as_deref()
                        .map_or_else(|| "Leave".to_owned(), |handle| format!("Leave (@{handle})"))
                });
                match leave_label {
                    Some(label) => {
                        if ui.button(label).clicked() {
                            self.leave();
                        }
                    }
                    None => {
                        if ui.button("Join Circle").clicked() {
                            self.open_onboarding();
                        }
                    }
                }

                if ui.button("Take Quiz").clicked() {
                    self.open_quiz();
                }

                ui.label(
                    RichText::new(format!("zoom {:.0}%", self.viewport.zoom() * 100.0)).weak(),
                );

                if let Some(status) = &self.status {
                    ui.label(
                        RichText::new(status.as_str()).color(Color32::from_rgb(248, 113, 113)),
                    );
                }
            });
        });
    }
}
