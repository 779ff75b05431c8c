use std::collections::HashSet;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::Context as _;
use eframe::egui::{self, Context};
use tracing::{debug, info, warn};

use crate::directory::{
    ChangeEvent, DirectoryStore, Member, MemberEntry, QuizQuestion, QuizSession, Table,
};
use crate::identity::Session;
use crate::layout::{LayoutPolicy, PositionCache};
use crate::photo::ProfileLookup;

mod canvas;
mod render_utils;
mod ui;
mod viewport;

use canvas::TouchTracker;
use viewport::Viewport;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

type TaskResult<T> = Result<T, String>;

/// Everything the window needs from the outside world.
pub struct AppServices {
    pub store: Arc<dyn DirectoryStore>,
    pub lookup: Arc<dyn ProfileLookup>,
    pub session: Session,
    pub layout: LayoutPolicy,
}

pub struct MemberCircleApp {
    model: Box<ViewModel>,
}

struct ViewModel {
    store: Arc<dyn DirectoryStore>,
    lookup: Arc<dyn ProfileLookup>,
    session: Session,
    layout: LayoutPolicy,
    members: Vec<MemberEntry>,
    members_revision: u64,
    loaded: bool,
    change_feeds: Vec<Receiver<ChangeEvent>>,
    reload_rx: Option<Receiver<TaskResult<Vec<MemberEntry>>>>,
    reload_queued: bool,
    positions: PositionCache,
    viewport: Viewport,
    touches: TouchTracker,
    pressed_member: Option<String>,
    hovered: Option<String>,
    search: String,
    search_match_cache: Option<SearchMatchCache>,
    selected: Option<String>,
    onboarding: Option<OnboardingState>,
    quiz: Option<QuizState>,
    status: Option<String>,
    visible_member_count: usize,
}

struct SearchMatchCache {
    query: String,
    members_revision: u64,
    matches: Arc<HashSet<String>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OnboardingStep {
    Intro,
    Form,
}

struct OnboardingState {
    step: OnboardingStep,
    handle: String,
    bio: String,
    error: Option<String>,
    pending: Option<Receiver<TaskResult<Member>>>,
}

enum QuizState {
    Loading(Receiver<TaskResult<Vec<QuizQuestion>>>),
    Active(QuizSession),
    Unavailable(String),
}

fn spawn_task<T, F>(label: &'static str, task: F) -> Receiver<TaskResult<T>>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let result = task().map_err(|error| format!("{error:#}"));
        if let Err(error) = &result {
            warn!(task = label, %error, "background task failed");
        }
        let _ = tx.send(result);
    });

    rx
}

impl MemberCircleApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, services: AppServices) -> Self {
        Self {
            model: Box::new(ViewModel::new(services)),
        }
    }
}

impl eframe::App for MemberCircleApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.model.poll_background();

        if self.model.loaded {
            self.model.show(ctx);
        } else {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Loading the circle...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            });
        }

        ctx.request_repaint_after(POLL_INTERVAL);
    }
}

impl ViewModel {
    fn new(services: AppServices) -> Self {
        let AppServices {
            store,
            lookup,
            session,
            layout,
        } = services;

        let change_feeds = vec![
            store.subscribe_to_changes(Table::Members),
            store.subscribe_to_changes(Table::QuizAttempts),
        ];
        let reload_rx = Some(Self::spawn_load(Arc::clone(&store)));

        info!(
            layout = layout.label(),
            member = session.current_member_id().unwrap_or("-"),
            "starting member circle"
        );

        Self {
            store,
            lookup,
            session,
            layout,
            members: Vec::new(),
            members_revision: 0,
            loaded: false,
            change_feeds,
            reload_rx,
            reload_queued: false,
            positions: PositionCache::default(),
            viewport: Viewport::default(),
            touches: TouchTracker::default(),
            pressed_member: None,
            hovered: None,
            search: String::new(),
            search_match_cache: None,
            selected: None,
            onboarding: None,
            quiz: None,
            status: None,
            visible_member_count: 0,
        }
    }

    fn spawn_load(store: Arc<dyn DirectoryStore>) -> Receiver<TaskResult<Vec<MemberEntry>>> {
        spawn_task("load members", move || {
            store
                .directory_snapshot()
                .context("failed to load the member directory")
        })
    }

    fn poll_background(&mut self) {
        let mut changed = false;
        for feed in &self.change_feeds {
            while let Ok(event) = feed.try_recv() {
                debug!(table = ?event.table, "directory change received");
                changed = true;
            }
        }
        if changed {
            self.reload_queued = true;
        }

        if self.reload_queued && self.reload_rx.is_none() {
            self.reload_queued = false;
            self.reload_rx = Some(Self::spawn_load(Arc::clone(&self.store)));
        }

        if let Some(rx) = self.reload_rx.take() {
            match rx.try_recv() {
                Ok(Ok(entries)) => self.replace_members(entries),
                Ok(Err(error)) => {
                    self.status = Some(error);
                    self.loaded = true;
                }
                Err(TryRecvError::Empty) => {
                    self.reload_rx = Some(rx);
                }
                Err(TryRecvError::Disconnected) => {
                    warn!("member load worker disconnected");
                    self.loaded = true;
                }
            }
        }

        self.poll_onboarding();
        self.poll_quiz();
    }

    /// Swaps in a fresh member list. Only the position cache is invalidated;
    /// an in-progress pan or pinch keeps going untouched.
    fn replace_members(&mut self, entries: Vec<MemberEntry>) {
        self.members = entries;
        self.members_revision = self.members_revision.wrapping_add(1);
        self.loaded = true;
        self.status = None;

        if let Some(selected) = &self.selected
            && !self.members.iter().any(|entry| &entry.member.id == selected)
        {
            self.selected = None;
        }

        debug!(
            members = self.members.len(),
            revision = self.members_revision,
            "member list refreshed"
        );
    }

    fn refresh_positions(&mut self) {
        let recomputed = self.positions.refresh(
            self.members_revision,
            self.layout,
            self.members.iter().map(|entry| &entry.member),
        );
        if recomputed {
            debug!(
                positions = self.positions.len(),
                layout = self.layout.label(),
                "member positions recomputed"
            );
        }
    }

    fn member_entry(&self, member_id: &str) -> Option<&MemberEntry> {
        self.members
            .iter()
            .find(|entry| entry.member.id == member_id)
    }

    fn show(&mut self, ctx: &Context) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| self.draw_top_bar(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_canvas(ui));

        self.draw_onboarding(ctx);
        self.draw_details(ctx);
        self.draw_quiz(ctx);
    }

    fn leave(&mut self) {
        match self.session.clear() {
            Ok(()) => self.status = None,
            Err(error) => {
                let message = format!("{error:#}");
                warn!(error = %message, "failed to clear session");
                self.status = Some(message);
            }
        }
    }
}

/// A view model over a fresh directory in `dir`, with no bearer token so
/// photo lookups fall back without touching the network.
#[cfg(test)]
fn test_model(dir: &tempfile::TempDir) -> ViewModel {
    use crate::directory::FileStore;
    use crate::photo::XProfileClient;

    let store = FileStore::open(dir.path().join("directory.json")).unwrap();
    let lookup = XProfileClient::new("http://127.0.0.1:9", None).unwrap();
    ViewModel::new(AppServices {
        store: Arc::new(store),
        lookup: Arc::new(lookup),
        session: Session::load(dir.path().join("session.json")).unwrap(),
        layout: LayoutPolicy::Ring,
    })
}
