use std::sync::Arc;
use std::sync::mpsc::TryRecvError;

use eframe::egui::{self, Align2, Color32, Context, RichText};
use tracing::warn;

use crate::directory::{MemberEntry, NewMember, StoreError, validate_new_member};
use crate::photo::resolve_photo_url;
use crate::util::MAX_BIO_LEN;

use super::super::{OnboardingState, OnboardingStep, ViewModel, spawn_task};

/// Runs the join rules before anything leaves the window, so a bad or
/// taken handle never reaches the profile API.
fn prepare_join(handle: &str, bio: &str, members: &[MemberEntry]) -> Result<NewMember, String> {
    let fields = validate_new_member(NewMember {
        handle: handle.to_owned(),
        photo_url: None,
        bio_text: bio.to_owned(),
    })
    .map_err(|error| error.to_string())?;

    if members
        .iter()
        .any(|entry| entry.member.handle.eq_ignore_ascii_case(&fields.handle))
    {
        return Err(StoreError::DuplicateHandle(fields.handle).to_string());
    }

    Ok(fields)
}

impl ViewModel {
    pub(in crate::app) fn open_onboarding(&mut self) {
        if self.session.current().is_some() {
            return;
        }

        self.onboarding = Some(OnboardingState {
            step: OnboardingStep::Intro,
            handle: String::new(),
            bio: String::new(),
            error: None,
            pending: None,
        });
    }

    fn submit_onboarding(&mut self) {
        let Some(form) = self.onboarding.as_mut() else {
            return;
        };
        if form.pending.is_some() {
            return;
        }

        let fields = match prepare_join(&form.handle, &form.bio, &self.members) {
            Ok(fields) => fields,
            Err(message) => {
                form.error = Some(message);
                return;
            }
        };

        form.error = None;
        let store = Arc::clone(&self.store);
        let lookup = Arc::clone(&self.lookup);
        form.pending = Some(spawn_task("join circle", move || {
            let photo_url = resolve_photo_url(&fields.handle, lookup.as_ref());
            let member = store.insert_member(NewMember {
                photo_url: Some(photo_url),
                ..fields
            })?;
            Ok(member)
        }));
    }

    pub(in crate::app) fn poll_onboarding(&mut self) {
        let Some(form) = self.onboarding.as_mut() else {
            return;
        };
        let Some(rx) = form.pending.take() else {
            return;
        };

        match rx.try_recv() {
            Ok(Ok(member)) => {
                if let Err(error) = self.session.set_current_member(&member.id, &member.handle) {
                    let message = format!("{error:#}");
                    warn!(error = %message, "joined but could not remember the session");
                    self.status = Some(message);
                }
                self.onboarding = None;
                self.selected = Some(member.id);
                self.reload_queued = true;
            }
            Ok(Err(error)) => form.error = Some(error),
            Err(TryRecvError::Empty) => form.pending = Some(rx),
            Err(TryRecvError::Disconnected) => {
                form.error = Some("The join request was interrupted".to_owned());
            }
        }
    }

    pub(in crate::app) fn draw_onboarding(&mut self, ctx: &Context) {
        let Some(form) = self.onboarding.as_mut() else {
            return;
        };

        let mut open = true;
        let mut submit = false;
        egui::Window::new("Join the Circle")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .default_width(420.0)
            .show(ctx, |ui| match form.step {
                OnboardingStep::Intro => {
                    ui.label(
                        "Members of the circle are people who care about privacy on public \
                         blockchains. Add yourself to the canvas with your X handle and a \
                         few words on why privacy matters to you.",
                    );
                    ui.add_space(10.0);
                    if ui.button("Get started").clicked() {
                        form.step = OnboardingStep::Form;
                    }
                }
                OnboardingStep::Form => {
                    let busy = form.pending.is_some();

                    ui.label("X handle");
                    ui.add_enabled(
                        !busy,
                        egui::TextEdit::singleline(&mut form.handle).hint_text("@yourhandle"),
                    );
                    ui.add_space(6.0);

                    ui.label("Why does privacy matter to you?");
                    ui.add_enabled(
                        !busy,
                        egui::TextEdit::multiline(&mut form.bio)
                            .desired_rows(4)
                            .char_limit(MAX_BIO_LEN),
                    );
                    ui.small(format!("{}/{MAX_BIO_LEN}", form.bio.chars().count()));

                    if let Some(error) = &form.error {
                        ui.label(
                            RichText::new(error.as_str()).color(Color32::from_rgb(248, 113, 113)),
                        );
                    }

                    ui.add_space(8.0);
                    ui.horizontal(|ui| {
                        if ui.add_enabled(!busy, egui::Button::new("Join")).clicked() {
                            submit = true;
                        }
                        if busy {
                            ui.spinner();
                            ui.label("Looking up your profile photo...");
                        }
                    });
                }
            });

        if !open {
            self.onboarding = None;
        } else if submit {
            self.submit_onboarding();
        }
    }
}
