//! Media resolver (chatmedia-resolve) - Main entry point
//!
//! Resolves the media of one chat message from the command line: prints the
//! ranked candidate locators and, with `--probe`, walks them with HTTP HEAD
//! requests until one answers.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chatmedia_common::config::load_config;
use chatmedia_common::RawMessage;
use chatmedia_engine::controller::ControllerSignal;
use chatmedia_engine::{
    MediaSession, MediaView, MessageMeta, NullSurface, ResolutionState, SessionConfig,
    StaticController,
};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for chatmedia-resolve
#[derive(Parser, Debug)]
#[command(name = "chatmedia-resolve")]
#[command(about = "Resolve the media locator of a chat message")]
#[command(version)]
struct Args {
    /// Message record (JSON)
    message: PathBuf,

    /// Config file (TOML)
    #[arg(short, long, env = "CHATMEDIA_CONFIG")]
    config: Option<PathBuf>,

    /// Backend origin, overrides the config file
    #[arg(long)]
    origin: Option<String>,

    /// Provider origin, overrides the config file
    #[arg(long)]
    provider_origin: Option<String>,

    /// Walk the candidates with HTTP HEAD requests
    #[arg(long)]
    probe: bool,

    /// Per-request timeout for --probe, in seconds
    #[arg(long, default_value = "10")]
    timeout_secs: u64,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref(), args.origin.as_deref());

    // Initialize tracing
    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("chatmedia_engine={level},chatmedia_common={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = config.context("Failed to load configuration")?;
    info!("Backend origin: {}", config.backend_origin);

    let text = std::fs::read_to_string(&args.message)
        .with_context(|| format!("Failed to read {}", args.message.display()))?;
    let raw = RawMessage::from_json(&text).context("Failed to parse message record")?;

    let mut meta = MessageMeta::from_config(&config);
    if let Some(provider) = &args.provider_origin {
        meta = meta.with_provider_origin(provider.as_str());
    }

    let mut session = MediaSession::open(&raw, meta, &SessionConfig::from(&config));

    if args.probe {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(args.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        walk_candidates(&mut session, &client).await?;
    }

    let view = session.view();
    if args.json {
        let output = serde_json::json!({
            "key": session.key(),
            "candidates": session.candidates(),
            "view": view,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&session, &view);
    }

    let ok = match view {
        MediaView::Displayable(_) => true,
        MediaView::Loading { .. } => !args.probe && !session.candidates().is_empty(),
        MediaView::Unrecoverable { .. } => false,
    };
    session.close();

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Drive the session with a display controller until it settles
async fn walk_candidates(session: &mut MediaSession, client: &reqwest::Client) -> Result<()> {
    if session.active_locator().is_none() {
        return Ok(());
    }
    let mut controller = session.static_controller(Box::new(NullSurface))?;

    while let Some(locator) = session.active_locator().map(str::to_string) {
        let outcome = match scheme_outcome(&locator) {
            Some(outcome) => outcome,
            None => head_request(client, &locator).await,
        };
        if !apply_outcome(session, &mut controller, &locator, outcome) {
            break;
        }
    }
    Ok(())
}

/// Outcome decided by the address scheme alone, without a request
///
/// Inline `data:` payloads always load. `blob:` addresses only exist inside
/// the page that created them.
fn scheme_outcome(locator: &str) -> Option<std::result::Result<(), String>> {
    if locator.starts_with("data:") {
        return Some(Ok(()));
    }
    if locator.starts_with("blob:") {
        return Some(Err(
            "blob addresses only load inside the page that created them".to_string(),
        ));
    }
    None
}

async fn head_request(client: &reqwest::Client, locator: &str) -> std::result::Result<(), String> {
    match client.head(locator).send().await {
        Ok(response) if response.status().is_success() => {
            info!(locator, status = %response.status(), "Locator answered");
            Ok(())
        }
        Ok(response) => Err(format!("HTTP {}", response.status())),
        Err(e) => Err(e.to_string()),
    }
}

/// Feed one load outcome through the controller and the session
///
/// Returns `true` when the session moved to another locator that should be
/// tried next. The controller is rebound to it before returning.
fn apply_outcome(
    session: &mut MediaSession,
    controller: &mut StaticController,
    locator: &str,
    outcome: std::result::Result<(), String>,
) -> bool {
    match outcome {
        Ok(()) => {
            if let ControllerSignal::Succeeded { locator } = controller.on_loaded() {
                session.report_success(&locator);
            }
        }
        Err(reason) => {
            controller.on_error(&reason);
            let transitions = session.pump();
            debug!(?transitions, "Applied failure events");
        }
    }

    match session.active_locator() {
        Some(next) if next == locator => {
            if session.state() != Some(ResolutionState::Resolved) {
                warn!(locator = %next, "Resolution did not move, giving up");
            }
            false
        }
        Some(next) => {
            controller.rebind(next);
            true
        }
        None => false,
    }
}

fn print_report(session: &MediaSession, view: &MediaView) {
    println!("Message: {}", session.key());
    if let Some(descriptor) = session.descriptor() {
        println!("Kind:    {}", descriptor.kind());
    }

    if !session.candidates().is_empty() {
        println!("Candidates:");
        for candidate in session.candidates() {
            println!("  {}", candidate);
        }
    }

    match view {
        MediaView::Loading { attempt, candidates, locator } => {
            println!(
                "Status:  pending (candidate {} of {}{})",
                attempt + 1,
                candidates,
                locator
                    .as_deref()
                    .map(|l| format!(": {}", l))
                    .unwrap_or_default()
            );
        }
        MediaView::Displayable(model) => {
            println!("Status:  displayable");
            println!("Locator: {} ({})", model.locator, model.source);
        }
        MediaView::Unrecoverable { message, .. } => {
            println!("Status:  {}", message);
        }
    }
}
