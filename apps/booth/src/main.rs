use std::{
    io::{self, Write as _},
    net::SocketAddr,
    sync::Arc,
};

use anyhow::Result;
use booth_core::{
    AdminGate, AlwaysOnline, ConnectivityProbe, DrawState, DrawingFlow, EntryFlow, EntryForm,
    EntryOutcome, QueueReconciler, StoreReachabilityProbe,
};
use clap::{Parser, Subcommand};
use device_store::DeviceStore;
use remote_store::{MissingRemoteStore, RemoteStore, RestRemoteStore};
use tracing::info;

mod config;
mod status;

use config::{load_settings, prepare_database_url, Settings};
use status::{build_router, StatusState};

#[derive(Parser, Debug)]
#[command(
    name = "booth",
    about = "Trade-show lead capture and prize drawing terminal"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit an entry for the prize drawing.
    Enter {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        company: String,
    },
    /// Replay locally queued entries against the remote store.
    Sync,
    /// Open the PIN-gated drawing terminal.
    Draw {
        /// Admin PIN; prompted for when omitted.
        #[arg(long)]
        pin: Option<String>,
    },
    /// Print the diagnostic configuration status.
    Status,
    /// Serve /status and /healthz over HTTP.
    ServeStatus {
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();
    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let device = DeviceStore::new(&database_url).await?;

    match cli.command {
        Command::Enter {
            name,
            email,
            phone,
            company,
        } => {
            let (remote, probe) = build_remote(&settings)?;
            let flow = EntryFlow::new(remote.clone(), device.clone(), probe.clone());
            if flow.already_entered().await? {
                println!("This device has already submitted an entry.");
                return Ok(());
            }
            let form = EntryForm {
                name,
                email,
                phone,
                company,
            };

            match flow.submit(&form).await? {
                EntryOutcome::SubmittedOnline => {
                    println!("You're entered! Good luck in the drawing.");
                }
                EntryOutcome::QueuedOffline => {
                    println!("Spotty connection? Your entry is saved and will sync later.");
                }
                EntryOutcome::AlreadyEntered => {
                    println!("This device has already submitted an entry.");
                    return Ok(());
                }
            }

            // Confirmation-view behavior: opportunistically flush anything
            // queued earlier on this device.
            let report = QueueReconciler::new(remote, device, probe).flush().await?;
            if report.synced > 0 || report.duplicates > 0 {
                println!(
                    "Synced {} queued entr{} ({} duplicate, {} still pending).",
                    report.synced,
                    if report.synced == 1 { "y" } else { "ies" },
                    report.duplicates,
                    report.still_pending
                );
            }
        }
        Command::Sync => {
            let (remote, probe) = build_remote(&settings)?;
            let report = QueueReconciler::new(remote, device.clone(), probe)
                .flush()
                .await?;
            println!(
                "synced={} duplicates={} still_pending={}",
                report.synced, report.duplicates, report.still_pending
            );
            for failed in device.failed_entries().await? {
                println!(
                    "  gave up on queue #{} ({}): {}",
                    failed.queue_id, failed.email, failed.sync_error
                );
            }
        }
        Command::Draw { pin } => {
            let mut gate = AdminGate::new(settings.admin_pin.clone());
            let mut attempt = pin;
            while !gate.is_unlocked() {
                let candidate = match attempt.take() {
                    Some(pin) => pin,
                    None => prompt("Admin PIN: ")?,
                };
                if let Err(err) = gate.unlock(&candidate) {
                    eprintln!("{err}");
                }
            }

            let (remote, _probe) = build_remote(&settings)?;
            run_drawing_terminal(DrawingFlow::new(remote)).await?;
        }
        Command::Status => {
            let state = StatusState::new(device, &settings, database_url);
            println!("{}", serde_json::to_string_pretty(&state.document().await?)?);
        }
        Command::ServeStatus { bind } => {
            let state = StatusState::new(device, &settings, database_url);
            let app = build_router(Arc::new(state));

            let addr: SocketAddr = bind.unwrap_or(settings.status_bind).parse()?;
            info!(%addr, "status endpoint listening");
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

fn build_remote(settings: &Settings) -> Result<(Arc<dyn RemoteStore>, Arc<dyn ConnectivityProbe>)> {
    if settings.store_url.is_empty() {
        // Calls will fail with a descriptive error instead of panicking.
        return Ok((Arc::new(MissingRemoteStore), Arc::new(AlwaysOnline)));
    }
    let rest = Arc::new(RestRemoteStore::new(
        &settings.store_url,
        settings.store_api_key.clone(),
    )?);
    Ok((
        rest.clone() as Arc<dyn RemoteStore>,
        Arc::new(StoreReachabilityProbe(rest)),
    ))
}

async fn run_drawing_terminal(mut flow: DrawingFlow) -> Result<()> {
    flow.refresh().await?;

    loop {
        println!("{} eligible entrant(s).", flow.entrants().len());
        let command = prompt("draw [d], refresh [r], quit [q]: ")?;
        match command.as_str() {
            "d" => {
                if !flow.run_countdown(|remaining| println!("{remaining}...")).await {
                    println!("Drawing is disabled: no eligible entrants.");
                    continue;
                }
                let DrawState::Revealed { winner } = flow.state().clone() else {
                    continue;
                };
                println!(
                    "We have a winner: {} ({}) - {} / {}",
                    winner.name, winner.company, winner.email, winner.phone
                );

                loop {
                    let choice = prompt("confirm [c], draw again [a]: ")?;
                    match choice.as_str() {
                        "c" => match flow.confirm().await {
                            Ok(confirmed) => {
                                println!("Winner confirmed: {}", confirmed.name);
                                break;
                            }
                            Err(err) => {
                                // Still Revealed; the operator may retry or discard.
                                eprintln!("{err}");
                            }
                        },
                        "a" => {
                            flow.draw_again();
                            break;
                        }
                        _ => {}
                    }
                }
            }
            "r" => flow.refresh().await?,
            "q" => break,
            _ => {}
        }
    }

    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
