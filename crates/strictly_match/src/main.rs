//! Strictly Match - Unified CLI
//!
//! Serves matches over HTTP or plays one from the terminal.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command, PlayArgs};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use strictly_chess::{Color, Move};
use strictly_match::{
    AppState, ControlAction, HttpAuthority, InMemoryAuthority, LocalMatch, MatchAuthority,
    MatchClient, MatchConfig, Participant, PollerHandle, Reconciliation, ReconciliationPoller,
    SyncEvent,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,strictly_match=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = MatchConfig::from_file(&cli.config)?.with_overrides(cli.command.overrides());

    match cli.command {
        Command::Serve { .. } => run_server(config).await,
        Command::Play(args) => run_play(config, args).await,
    }
}

/// Run the authoritative match server
#[instrument(skip(config))]
async fn run_server(config: MatchConfig) -> Result<()> {
    info!("Starting Strictly Match server");
    let store = InMemoryAuthority::new()
        .with_clock(config.clock())
        .with_retention(config.retention());
    let state = AppState::new(store);
    strictly_match::serve(config.bind_host(), *config.bind_port(), state).await?;
    Ok(())
}

/// Play a match against another client or the automated opponent
#[instrument(skip(config, args))]
async fn run_play(config: MatchConfig, args: PlayArgs) -> Result<()> {
    let http = HttpAuthority::new(config.server_url(), config.request_timeout())?;
    let me = Participant::new(config.player_id().clone(), config.player_name().clone());

    let client = if args.automated {
        let created = http.create_automated_match(&me).await?;
        MatchClient::attach(Arc::new(http), &me.id, created.match_id).await?
    } else {
        let authority: Arc<dyn MatchAuthority> = Arc::new(http);
        match args.join {
            Some(match_id) => MatchClient::join(authority, match_id, me).await?,
            None => MatchClient::host(authority, me).await?,
        }
    };

    let view = client.view().await;
    println!(
        "Match {} as {} ({})",
        view.session().id,
        view.color(),
        view.session().status()
    );
    println!("{}", view.board().display());
    print_help();

    let mut poller = Some(ReconciliationPoller::spawn(
        client.clone(),
        config.poll_interval(),
    ));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.eq_ignore_ascii_case("quit") {
                    break;
                }
                handle_input(&client, line).await;
                if poller.as_ref().is_none_or(|(handle, _)| handle.is_finished()) {
                    poller = Some(ReconciliationPoller::spawn(client.clone(), config.poll_interval()));
                }
            }
            event = next_event(&mut poller) => {
                match event {
                    Some(event) => report(&client, event).await,
                    None => poller = None,
                }
            }
        }
    }

    info!("Leaving match");
    Ok(())
}

async fn next_event(
    poller: &mut Option<(PollerHandle, mpsc::Receiver<SyncEvent>)>,
) -> Option<SyncEvent> {
    match poller {
        Some((_, events)) => events.recv().await,
        None => std::future::pending().await,
    }
}

async fn handle_input(client: &MatchClient, line: &str) {
    if line.is_empty() {
        return;
    }
    if line.eq_ignore_ascii_case("board") {
        let view = client.view().await;
        println!("{}", view.board().display());
        for record in view.history() {
            println!("{record}");
        }
        return;
    }
    if let Ok(action) = ControlAction::from_str(line) {
        match client.control(action).await {
            Ok(receipt) => println!("{action} accepted ({})", receipt.status),
            Err(e) => println!("{}", e.user_message()),
        }
        return;
    }
    let Some(mv) = Move::parse(line) else {
        print_help();
        return;
    };
    match client.submit_move(mv).await {
        Ok(receipt) => {
            if let Some(reply) = receipt.automated_reply {
                println!("Opponent played {}", reply.mv);
            }
            println!("{}", client.view().await.board().display());
        }
        Err(e) => {
            warn!(error = %e, "Move not played");
            println!("{}", e.user_message());
        }
    }
}

async fn report(client: &MatchClient, event: SyncEvent) {
    match event {
        SyncEvent::Reconciled(Reconciliation::BoardChanged {
            opponent_move,
            your_turn,
        }) => {
            if let Some(record) = opponent_move {
                println!("{record}");
            }
            let view = client.view().await;
            println!("{}", view.board().display());
            print_clock(&view);
            if your_turn {
                println!("Your move");
            }
        }
        SyncEvent::Reconciled(Reconciliation::StatusChanged { to, .. }) => {
            let view = client.view().await;
            match view.session().outcome() {
                Some(outcome) => println!("{outcome}"),
                None => println!("Match is now {to}"),
            }
        }
        SyncEvent::Reconciled(Reconciliation::Rematched { new_id, color }) => {
            println!("Rematch {new_id} started, you play {color}");
            println!("{}", client.view().await.board().display());
        }
        SyncEvent::Reconciled(Reconciliation::SessionUpdated) => {
            let view = client.view().await;
            if let Some(color) = view.session().draw_offer() {
                println!("{color} offers a draw");
            }
            if let Some(color) = view.session().rematch_offer() {
                println!("{color} offers a rematch");
            }
        }
        SyncEvent::Reconciled(_) => {}
        SyncEvent::PollFailed(e) => println!("Connection problem: {}", e.user_message()),
        SyncEvent::Stopped => println!("Match over. Type REMATCH_OFFER for another, or quit."),
    }
}

fn print_clock(view: &LocalMatch) {
    let (Some(white), Some(black)) = (view.remaining(Color::White), view.remaining(Color::Black))
    else {
        return;
    };
    println!("Clock: White {}  Black {}", mm_ss(white), mm_ss(black));
}

fn mm_ss(time: Duration) -> String {
    let secs = time.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn print_help() {
    println!("Enter moves like e2e4 or e7e8q, or one of:");
    println!("  PAUSE RESUME DRAW_OFFER DRAW_ACCEPT DRAW_DECLINE SURRENDER");
    println!("  REMATCH_OFFER REMATCH_ACCEPT REMATCH_DECLINE board quit");
}
