mod app;
mod directory;
mod identity;
mod layout;
mod photo;
mod util;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result, anyhow};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::{AppServices, MemberCircleApp};
use crate::directory::FileStore;
use crate::identity::Session;
use crate::layout::LayoutPolicy;
use crate::photo::{DEFAULT_PROFILE_API, XProfileClient};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory holding the member directory and the local session.
    #[arg(long, env = "MEMBER_CIRCLE_DATA_DIR", default_value = "member-circle-data")]
    data_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = LayoutPolicy::Ring)]
    layout: LayoutPolicy,

    /// Base URL of the social profile API used for photo lookups.
    #[arg(long, default_value = DEFAULT_PROFILE_API)]
    profile_api: String,

    #[arg(long, env = "TWITTER_BEARER_TOKEN", hide_env_values = true)]
    bearer_token: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a profile photo for a JSON request read from stdin.
    ResolvePhoto,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let lookup = XProfileClient::new(&args.profile_api, args.bearer_token.clone())
        .context("failed to configure the profile lookup client")?;

    if let Some(Command::ResolvePhoto) = args.command {
        return resolve_photo(&lookup);
    }

    let store = FileStore::open(args.data_dir.join("directory.json"))
        .context("failed to open the member directory")?;
    let session = Session::load(args.data_dir.join("session.json"))?;
    info!(path = %store.path().display(), "member directory ready");

    let services = AppServices {
        store: Arc::new(store),
        lookup: Arc::new(lookup),
        session,
        layout: args.layout,
    };
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 860.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Member Circle",
        options,
        Box::new(move |cc| Ok(Box::new(MemberCircleApp::new(cc, services)))),
    )
    .map_err(|error| anyhow!("failed to run the window: {error}"))
}

fn resolve_photo(lookup: &XProfileClient) -> Result<()> {
    let body = io::read_to_string(io::stdin()).context("failed to read the request body")?;
    let response = photo::handle_request(&body, lookup);
    info!(status = response.status, "photo request served");
    println!(
        "{}",
        serde_json::to_string(&response).context("failed to encode the response")?
    );
    Ok(())
}
