use futures::future::join_all;
use lrc::cli::{Args, Commands, ConfigDiscovery, render_outcome, render_value};
use lrc::{LiveControl, LrcConfig, env};
use serde_json::json;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logs go to stderr so `--json` output stays parseable
    let default_filter = if args.verbose {
        "lrc=debug"
    } else {
        env::DEFAULT_LOG_FILTER
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the command reached its goal
async fn run(args: Args) -> anyhow::Result<bool> {
    if let Commands::ShowConfig = args.command {
        ConfigDiscovery::show_discovery_info();
        return Ok(true);
    }

    let config = ConfigDiscovery::load(args.config.as_deref())?;
    config.validate()?;

    if let Commands::List { with_status: false } = args.command {
        list_sessions(&config, args.json);
        return Ok(true);
    }

    let control = LiveControl::new(config)?;
    let cancel = cancel_on_ctrl_c();

    match args.command {
        Commands::Status { name, request_stop } => {
            let status = control.controller().status(&name, request_stop).await?;
            render_value(&status, args.json);
            Ok(true)
        }
        Commands::Start { name } => {
            let outcome = control.controller().start(&name, &cancel).await;
            render_outcome("start", &outcome, args.json);
            Ok(outcome.is_success())
        }
        Commands::Stop { name } => {
            let outcome = control.controller().stop(&name, &cancel).await;
            render_outcome("stop", &outcome, args.json);
            Ok(outcome.is_success())
        }
        Commands::Reset { name } => {
            let outcome = control.controller().reset(&name, &cancel).await;
            render_outcome("reset", &outcome, args.json);
            Ok(outcome.is_success())
        }
        Commands::SessionStart { name } => {
            let session = control.edge().start_session(&name).await?;
            render_value(&session, args.json);
            Ok(true)
        }
        Commands::SessionStop { name } => {
            let closed = control.edge().stop_session(&name, &cancel).await?;
            render_value(&closed, args.json);
            Ok(true)
        }
        Commands::List { .. } => list_with_status(&control, args.json).await,
        Commands::ShowConfig => Ok(true),
    }
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, cancelling");
                token.cancel();
            }
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });
    cancel
}

fn list_sessions(config: &LrcConfig, as_json: bool) {
    if as_json {
        render_value(&config.streams, true);
        return;
    }

    if config.streams.is_empty() {
        println!("No sessions configured");
        return;
    }
    for (name, entry) in &config.streams {
        println!("{}  {} ({})", name, entry.object_id, entry.library_id);
    }
}

async fn list_with_status(control: &LiveControl, as_json: bool) -> anyhow::Result<bool> {
    let names: Vec<String> = control.registry().names().map(str::to_string).collect();
    info!("Resolving {} sessions", names.len());

    let results = join_all(
        names
            .iter()
            .map(|name| control.controller().status(name, false)),
    )
    .await;

    let mut all_resolved = true;
    let mut rows = Vec::with_capacity(names.len());
    for (name, result) in names.iter().zip(results) {
        match result {
            Ok(status) => {
                if !as_json {
                    println!("{}  {}", name, status.state);
                }
                rows.push(json!({ "name": name, "state": status.state }));
            }
            Err(e) => {
                all_resolved = false;
                if !as_json {
                    println!("{}  error: {}", name, e);
                }
                rows.push(json!({ "name": name, "error": e.to_string() }));
            }
        }
    }

    if as_json {
        render_value(&rows, true);
    }
    Ok(all_resolved)
}
