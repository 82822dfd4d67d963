use std::{future::Future, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    modal::{ScoreRevealModal, ScoreRevealView},
    settings::{load_settings, ClientSettings},
    AuthSession, PollEvent, ScoreClient, ScorePoller, TransportErrorPolicy,
};
use shared::domain::{MeetingId, PollStatus, UserUid};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Wait for an interview score report and reveal it")]
struct Args {
    #[arg(long)]
    meeting_id: String,
    /// Guessed range, e.g. "50%-75%".
    #[arg(long, default_value = "")]
    guess: String,
    #[arg(long)]
    java_api_url: Option<String>,
    #[arg(long)]
    max_attempts: Option<u32>,
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Keep polling through network failures until the attempt budget runs out.
    #[arg(long)]
    retry_transport_errors: bool,
    #[arg(long, requires = "uid")]
    token: Option<String>,
    #[arg(long, requires = "token")]
    uid: Option<String>,
    /// Print the final view as JSON.
    #[arg(long)]
    json: bool,
}

fn apply_args(mut settings: ClientSettings, args: &Args) -> ClientSettings {
    if let Some(url) = &args.java_api_url {
        settings.java_api_url = url.clone();
    }
    if let Some(max_attempts) = args.max_attempts {
        settings.poll_max_attempts = max_attempts;
    }
    if let Some(interval_ms) = args.interval_ms {
        settings.poll_interval_ms = interval_ms;
    }
    settings
}

fn render(view: &ScoreRevealView) {
    println!("Your guess: {}", view.guessed_range);
    println!("{}", view.headline);
    println!("{}", view.subtitle);
    if let Some(detail) = &view.detail {
        println!("{detail}");
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let args = Args::parse();

    let settings = apply_args(load_settings(), &args);
    let mut poll_config = settings.poll_config().context("invalid polling settings")?;
    if args.retry_transport_errors {
        poll_config = poll_config.with_transport_errors(TransportErrorPolicy::RetryWithinBudget);
    }

    let client = ScoreClient::new(&settings).context("failed to build report client")?;
    if let (Some(token), Some(uid)) = (args.token.clone(), args.uid.clone()) {
        client
            .set_auth(Some(AuthSession {
                token,
                uid: UserUid::new(uid),
            }))
            .await;
    }

    let poller = ScorePoller::new(Arc::new(client), poll_config);
    let mut events = poller.event_stream();
    let mut modal = ScoreRevealModal::new(Arc::clone(&poller), args.guess.clone());

    let meeting_id = MeetingId::new(args.meeting_id.clone());
    info!(meeting_id = %meeting_id, java_api_url = %settings.java_api_url, "waiting for score report");
    let interrupt = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    if reveal(&mut modal, meeting_id, &mut events, interrupt).await == Reveal::Interrupted {
        modal.close().await;
        eprintln!("Stopped before the report was ready.");
        return Ok(ExitCode::from(130));
    }

    let view = modal.view().await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        render(&view);
    }

    let code = match view.snapshot.status {
        PollStatus::Ready { .. } => ExitCode::SUCCESS,
        PollStatus::Polling => ExitCode::from(130),
        PollStatus::Error { .. } | PollStatus::Timeout => ExitCode::FAILURE,
    };
    modal.close().await;
    Ok(code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reveal {
    Settled,
    Interrupted,
}

/// Opens the modal and follows poll events until the session settles or
/// `interrupt` fires, whichever comes first.
async fn reveal(
    modal: &mut ScoreRevealModal,
    meeting_id: MeetingId,
    events: &mut BroadcastStream<PollEvent>,
    interrupt: impl Future<Output = ()>,
) -> Reveal {
    tokio::pin!(interrupt);

    let poller = modal.poller();
    // The first attempt runs inside `open`, so it has to race the interrupt too.
    let opened = tokio::select! {
        _ = &mut interrupt => false,
        _ = modal.open(meeting_id) => true,
    };
    if !opened {
        return Reveal::Interrupted;
    }

    loop {
        tokio::select! {
            _ = &mut interrupt => return Reveal::Interrupted,
            event = events.next() => match event {
                Some(Ok(PollEvent::AttemptClassified { attempt, status, .. })) => {
                    eprintln!(
                        "attempt {attempt}/{}: {}",
                        poller.config().max_attempts(),
                        status.label()
                    );
                    if status.is_terminal() {
                        return Reveal::Settled;
                    }
                }
                Some(Ok(PollEvent::Stopped { .. })) | None => return Reveal::Settled,
                Some(Err(err)) => {
                    warn!("missed poll events: {err}");
                    if poller.snapshot().await.status.is_terminal() {
                        return Reveal::Settled;
                    }
                }
            },
        }
    }
}
