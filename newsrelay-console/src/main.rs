//! Discord news relay: polls a news source and announces new articles to every registered channel.

mod app;
mod config;
mod input;
mod logging;
mod ui;

use std::{io, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event as CEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use newsrelay_core::{
    CycleReport, DestinationRegistry, DestinationStore, JsonFileStore, LoopState, NotifierPort,
    PollConfig, PollLoop, RelayService, SourcePort, readiness,
};
use newsrelay_discord_interactions::{
    DiscordFollowup, InteractionState, SignatureVerifier, serve as serve_interactions,
};
use newsrelay_notifier_discord::DiscordNotifier;
use newsrelay_source_rss::RssSource;
use newsrelay_source_storyblok::{StoryblokConfig, StoryblokSource};
use ratatui::{Terminal, backend::CrosstermBackend};
use reqwest::Client;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::App;
use crate::config::{Config, InteractionsSection, LogLevel, SourceConfig};
use crate::input::Action;

/// Discord news relay
#[derive(Parser, Debug)]
#[command(name = "newsrelay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "newsrelay.toml")]
    config: PathBuf,

    /// Run without the terminal console (stop with Ctrl-C)
    #[arg(long)]
    headless: bool,

    /// Log level override
    #[arg(short, long, value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;

    let log_file = config
        .log
        .file
        .clone()
        .or_else(|| (!cli.headless).then(|| PathBuf::from(logging::DEFAULT_LOG_FILE)));
    let level = cli.log_level.unwrap_or(config.log.level);
    logging::init_logging(level, log_file.as_deref())?;

    let token = config.discord_token()?;

    // HTTP + collaborators setup
    let client = Client::builder()
        .user_agent(concat!("newsrelay/", env!("CARGO_PKG_VERSION")))
        .timeout(config.poll.http_timeout())
        .build()?;

    let source = build_source(&config.source, client.clone());
    let notifier = Arc::new(DiscordNotifier::with_api_base(
        client,
        token,
        config.discord.api_base.clone(),
    ));

    let store = config
        .store
        .channels_path
        .as_ref()
        .map(|path| Arc::new(JsonFileStore::new(path.clone())));
    let registry = match &store {
        Some(store) => {
            let entries = store.load().await.with_context(|| {
                format!("could not load news channels from '{}'", store.path().display())
            })?;
            info!(channels = entries.len(), "news channels loaded");
            DestinationRegistry::from_entries(entries)
        }
        None => DestinationRegistry::new(),
    };
    let registry = Arc::new(registry);

    // Loop + service wiring
    let (reports_tx, reports_rx) = mpsc::unbounded_channel();
    let relay = PollLoop::new(
        Arc::clone(&source),
        Arc::clone(&notifier) as Arc<dyn NotifierPort>,
        Arc::clone(&registry),
        PollConfig {
            interval: config.poll.interval(),
        },
    )
    .with_reports(reports_tx);
    let loop_state = relay.subscribe_state();

    let mut service = RelayService::new(source, registry, relay.seen_view());
    if let Some(store) = store {
        service = service.with_store(store as Arc<dyn DestinationStore>);
    }
    let service = Arc::new(service);

    let (ready, gate) = readiness();
    let cancel = CancellationToken::new();
    let poller = tokio::spawn(relay.run(gate, cancel.clone()));

    // The loop only starts polling once the Discord session is confirmed.
    let session: Result<Option<JoinHandle<io::Result<()>>>> = async {
        start_session(&notifier, &service).await?;
        match &config.interactions {
            Some(section) => {
                start_interactions(section, &notifier, &service, cancel.clone())
                    .await
                    .map(Some)
            }
            None => Ok(None),
        }
    }
    .await;
    let server = match session {
        Ok(server) => server,
        Err(err) => {
            drop(ready);
            cancel.cancel();
            poller.await.context("news loop task failed")?;
            return Err(err);
        }
    };
    ready.mark_ready();

    let result = if cli.headless {
        drop(reports_rx);
        run_headless().await
    } else {
        run_console(service, loop_state, reports_rx).await
    };

    info!("shutting down, waiting for the current news check to finish");
    cancel.cancel();
    poller.await.context("news loop task failed")?;
    if let Some(server) = server {
        server
            .await
            .context("interactions endpoint task failed")?
            .context("interactions endpoint failed")?;
    }
    result
}

fn build_source(config: &SourceConfig, client: Client) -> Arc<dyn SourcePort> {
    match config {
        SourceConfig::Storyblok {
            token,
            site_url,
            api_url,
            starts_with,
            per_page,
        } => {
            let mut storyblok = StoryblokConfig::new(token.clone(), site_url.clone());
            storyblok.api_url.clone_from(api_url);
            storyblok.starts_with.clone_from(starts_with);
            storyblok.per_page = *per_page;
            Arc::new(StoryblokSource::new(client, storyblok))
        }
        SourceConfig::Rss { url, label } => {
            Arc::new(RssSource::new(client, url.clone(), label.clone()))
        }
    }
}

/// Confirm the bot session and observe the servers it already belongs to.
async fn start_session(notifier: &DiscordNotifier, service: &RelayService) -> Result<()> {
    let user = notifier
        .current_user()
        .await
        .context("could not log in to Discord")?;
    info!(user = %user.username, id = %user.id, "logged in");

    match notifier.guilds().await {
        Ok(guilds) => {
            for guild in guilds {
                service.tenant_joined(&guild.tenant(), &guild.name);
            }
        }
        Err(err) => warn!(error = %err, "could not list servers"),
    }
    Ok(())
}

/// Register the slash commands and serve the interactions endpoint until `cancel`.
async fn start_interactions(
    section: &InteractionsSection,
    notifier: &Arc<DiscordNotifier>,
    service: &Arc<RelayService>,
    cancel: CancellationToken,
) -> Result<JoinHandle<io::Result<()>>> {
    let verifier = SignatureVerifier::from_hex(&section.public_key)
        .context("invalid interactions.public_key")?;
    let application = notifier
        .application()
        .await
        .context("could not look up the Discord application")?;

    if section.register_commands {
        notifier
            .register_commands(&application.id)
            .await
            .context("could not register slash commands")?;
        info!(application = %application.name, "slash commands registered");
    }

    let listener = TcpListener::bind(section.bind)
        .await
        .with_context(|| format!("could not bind interactions endpoint to {}", section.bind))?;
    let followup = DiscordFollowup::new(Arc::clone(notifier), application.id);
    let state = InteractionState::new(Arc::clone(service), verifier, Arc::new(followup));

    Ok(tokio::spawn(serve_interactions(listener, state, cancel)))
}

async fn run_headless() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("could not listen for Ctrl-C")?;
    info!("interrupt received");
    Ok(())
}

async fn run_console(
    service: Arc<RelayService>,
    loop_state: watch::Receiver<LoopState>,
    reports: mpsc::UnboundedReceiver<CycleReport>,
) -> Result<()> {
    let app = App::new(service, loop_state).await;

    // Terminal init
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let res = run(&mut terminal, app, reports).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
    mut reports: mpsc::UnboundedReceiver<CycleReport>,
) -> Result<()> {
    loop {
        // Drain cycle reports from the news loop
        while let Ok(report) = reports.try_recv() {
            app.record_cycle(&report);
        }

        // Draw current UI
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Poll for input (non-blocking, small timeout to keep CPU low)
        if event::poll(Duration::from_millis(100))?
            && let CEvent::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match input::handle_key_event(key, &mut app) {
                Action::Quit => break,
                Action::None => {}
                Action::Submit => {
                    let command = match app.take_command() {
                        Ok(command) => command,
                        Err(err) => {
                            app.error_message = Some(err.to_string());
                            continue;
                        }
                    };

                    app.is_busy = true;
                    app.error_message = None;
                    terminal.draw(|frame| ui::draw(frame, &app))?;

                    let reply = app.service.execute(command).await;

                    app.is_busy = false;
                    app.record_reply(&reply);
                    app.refresh_destinations().await;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_flag_accepts_known_levels() {
        let cli = Cli::try_parse_from(["newsrelay", "--log-level", "debug"]).expect("valid flags");
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn log_level_flag_rejects_unknown_level() {
        assert!(Cli::try_parse_from(["newsrelay", "--log-level", "verbose"]).is_err());
    }
}
