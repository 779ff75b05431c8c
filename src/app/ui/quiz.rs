use std::sync::Arc;
use std::sync::mpsc::TryRecvError;
use std::thread;

use eframe::egui::{self, Align2, Color32, Context, RichText, Ui};
use tracing::{info, warn};

use crate::directory::{QuizSession, score_message};

use super::super::{QuizState, ViewModel, spawn_task};

const CORRECT: Color32 = Color32::from_rgb(74, 222, 128);
const WRONG: Color32 = Color32::from_rgb(248, 113, 113);

#[derive(Clone, Copy, PartialEq, Eq)]
enum QuizAction {
    None,
    Previous,
    Next,
    Retake,
    Close,
}

impl ViewModel {
    pub(in crate::app) fn open_quiz(&mut self) {
        if matches!(self.quiz, Some(QuizState::Loading(_))) {
            return;
        }

        let store = Arc::clone(&self.store);
        self.quiz = Some(QuizState::Loading(spawn_task(
            "load quiz questions",
            move || Ok(store.list_quiz_questions()?),
        )));
    }

    pub(in crate::app) fn poll_quiz(&mut self) {
        let Some(QuizState::Loading(rx)) = &self.quiz else {
            return;
        };

        let next = match rx.try_recv() {
            Ok(Ok(questions)) if questions.is_empty() => {
                QuizState::Unavailable("No quiz questions are available yet.".to_owned())
            }
            Ok(Ok(questions)) => QuizState::Active(QuizSession::new(questions)),
            Ok(Err(error)) => QuizState::Unavailable(error),
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                QuizState::Unavailable("The quiz could not be loaded.".to_owned())
            }
        };
        self.quiz = Some(next);
    }

    /// Stores a finished attempt for the current member. Attempts from
    /// visitors who have not joined are scored but not kept.
    fn record_attempt(&self, session: &QuizSession) {
        let Some(member_id) = self.session.current_member_id() else {
            return;
        };

        let attempt = session.attempt_for(member_id);
        let store = Arc::clone(&self.store);
        thread::spawn(move || match store.record_quiz_attempt(attempt) {
            Ok(saved) => info!(
                member = %saved.member_id,
                score = saved.score,
                total = saved.total_questions,
                "quiz attempt recorded"
            ),
            Err(error) => warn!(%error, "failed to record quiz attempt"),
        });
    }

    pub(in crate::app) fn draw_quiz(&mut self, ctx: &Context) {
        let Some(state) = self.quiz.as_mut() else {
            return;
        };

        let mut open = true;
        let mut action = QuizAction::None;
        egui::Window::new("Privacy Quiz")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .default_width(460.0)
            .show(ctx, |ui| match state {
                QuizState::Loading(_) => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading questions...");
                    });
                }
                QuizState::Unavailable(message) => {
                    ui.label(RichText::new(message.as_str()).color(WRONG));
                    if ui.button("Close").clicked() {
                        action = QuizAction::Close;
                    }
                }
                QuizState::Active(session) if session.is_finished() => {
                    action = draw_results(ui, session);
                }
                QuizState::Active(session) => {
                    action = draw_question(ui, session);
                }
            });

        if !open {
            action = QuizAction::Close;
        }

        match action {
            QuizAction::None => {}
            QuizAction::Close => self.quiz = None,
            QuizAction::Previous => {
                if let Some(QuizState::Active(session)) = self.quiz.as_mut() {
                    session.previous();
                }
            }
            QuizAction::Next => {
                let finished = match self.quiz.as_mut() {
                    Some(QuizState::Active(session)) => session.next().then(|| session.clone()),
                    _ => None,
                };
                if let Some(session) = finished {
                    self.record_attempt(&session);
                }
            }
            QuizAction::Retake => self.open_quiz(),
        }
    }
}

fn draw_question(ui: &mut Ui, session: &mut QuizSession) -> QuizAction {
    let mut action = QuizAction::None;
    let Some(question) = session.current_question().cloned() else {
        return action;
    };

    ui.label(format!(
        "Question {} of {}",
        session.current_index() + 1,
        session.len()
    ));
    ui.add(egui::ProgressBar::new(session.progress()).desired_height(6.0));
    ui.add_space(8.0);
    ui.label(RichText::new(question.question.as_str()).strong().size(16.0));
    ui.add_space(6.0);

    let mut selected = session.selected();
    for (index, option) in question.options.iter().enumerate() {
        if ui
            .selectable_label(selected == Some(index), option.as_str())
            .clicked()
        {
            selected = Some(index);
        }
    }
    if let Some(option) = selected
        && selected != session.selected()
    {
        session.select(option);
    }

    ui.add_space(10.0);
    ui.horizontal(|ui| {
        if ui
            .add_enabled(session.current_index() > 0, egui::Button::new("Previous"))
            .clicked()
        {
            action = QuizAction::Previous;
        }
        let label = if session.is_last() { "Finish" } else { "Next" };
        if ui
            .add_enabled(session.can_advance(), egui::Button::new(label))
            .clicked()
        {
            action = QuizAction::Next;
        }
    });

    action
}

fn draw_results(ui: &mut Ui, session: &QuizSession) -> QuizAction {
    let mut action = QuizAction::None;
    let percentage = session.percentage();

    ui.vertical_centered(|ui| {
        ui.heading(format!("{}/{}", session.score(), session.len()));
        ui.label(format!("{percentage}% correct"));
        ui.label(RichText::new(score_message(percentage)).strong());
    });
    ui.separator();

    egui::ScrollArea::vertical()
        .max_height(280.0)
        .show(ui, |ui| {
            for review in session.review() {
                let (mark, color) = if review.is_correct() {
                    ("\u{2713}", CORRECT)
                } else {
                    ("\u{2717}", WRONG)
                };
                let title = format!("{mark} {}", review.question.question);
                ui.label(RichText::new(title).color(color));
                ui.small(format!("Your answer: {}", review.chosen_text()));
                if !review.is_correct() {
                    ui.small(format!("Correct answer: {}", review.correct_text()));
                }
                ui.add_space(4.0);
            }
        });

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        if ui.button("Retake").clicked() {
            action = QuizAction::Retake;
        }
        if ui.button("Close").clicked() {
            action = QuizAction::Close;
        }
    });

    action
}
