//! LazyTrack binary entry point.
//!
//! Sets up logging and the terminal, resolves the profile to use, then
//! drives the main loop: terminal events and background-task results are
//! folded into the [`App`] and every iteration redraws the frame.

use std::io;

use anyhow::{bail, Context};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use lazytrack::config::{Config, Profile};
use lazytrack::events::EventHandler;
use lazytrack::storage::Storage;
use lazytrack::tasks::create_task_channel;
use lazytrack::{logging, App};

/// A terminal user interface for YouTrack.
#[derive(Debug, Parser)]
#[command(name = "lazytrack", version, about)]
struct Cli {
    /// Profile to connect with; defaults to the configured default.
    #[arg(short, long)]
    profile: Option<String>,

    /// Search query to open with, overriding the stored one.
    #[arg(short, long)]
    query: Option<String>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

fn resolve_profile(config: &Config, requested: Option<&str>) -> anyhow::Result<Profile> {
    if let Some(name) = requested {
        return Ok(config.profile(name)?.clone());
    }
    if let Some(profile) = config.default_profile() {
        return Ok(profile.clone());
    }
    if let Some(profile) = config.profiles.first() {
        return Ok(profile.clone());
    }
    bail!("no profiles configured; add one to the config file first");
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("failed to create terminal")
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(cli.log_level.as_deref())?;

    let config = Config::load()?;
    config.validate()?;
    let profile = resolve_profile(&config, cli.profile.as_deref())?;
    let storage = Storage::new(&profile.name)
        .with_context(|| format!("failed to open storage for profile '{}'", profile.name))?;

    let (mut rx, spawner) = create_task_channel();
    let mut app = App::new(config, profile, storage, spawner);
    app.set_initial_query(cli.query);
    app.connect();

    // Restore the terminal before the panic message prints.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        default_hook(info);
    }));

    let mut terminal = setup_terminal()?;
    let events = EventHandler::new();

    let result = run(&mut app, &mut terminal, &events, &mut rx);

    restore_terminal();
    logging::shutdown();

    if let Some(error) = app.fatal_error() {
        eprintln!("{}", error.user_message());
        if let Some(action) = error.suggested_action() {
            eprintln!("{}", action);
        }
        std::process::exit(1);
    }

    result
}

fn run(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    events: &EventHandler,
    rx: &mut tokio::sync::mpsc::UnboundedReceiver<lazytrack::tasks::ApiMessage>,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|frame| app.view(frame))?;

        let event = events.next().context("failed to read terminal event")?;
        app.update(event);

        while let Ok(message) = rx.try_recv() {
            app.handle_message(message);
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}
