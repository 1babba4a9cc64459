//! Kringle command-line client.
//!
//! Runs every party's side of the draw against a local room database.
//!
//! # Usage
//!
//! ```bash
//! # Host creates a room (prints the room id)
//! kringle create-room --name "Office party" --host-password host-secret
//!
//! # Each participant joins; the key is derived locally
//! kringle join --room <ID> --username Alice --password alice-secret
//!
//! # Host seals the draw
//! kringle start --room <ID> --host-password host-secret
//!
//! # Each participant learns their receiver
//! kringle reveal --room <ID> --username Alice --password alice-secret
//! ```

use std::{path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use kringle_core::{
    BackgroundTask, Credentials, Environment, ProtocolError, RoomId, spawn_prepare_start,
    spawn_register, spawn_reveal,
};
use kringle_crypto::DerivationParams;
use kringle_server::{RedbStorage, RoomManager, RoomManagerConfig, ServerError, SystemEnv};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Zero-knowledge gift exchange draw
#[derive(Parser, Debug)]
#[command(name = "kringle")]
#[command(about = "Zero-knowledge gift exchange draw")]
#[command(version)]
struct Args {
    /// Path to the room database
    #[arg(long, default_value = "kringle.redb")]
    db: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Maximum participants for rooms created by this invocation
    #[arg(long, default_value = "100")]
    max_participants: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a room and print its id
    CreateRoom {
        /// Display name
        #[arg(long)]
        name: String,
        /// Password that authorizes host actions
        #[arg(long)]
        host_password: String,
    },

    /// Join a room and register a derived public key
    Join {
        /// Room id (32 hex digits)
        #[arg(long)]
        room: RoomId,
        /// Participant name
        #[arg(long)]
        username: String,
        /// Participant password
        #[arg(long)]
        password: String,
    },

    /// Remove a participant before the draw
    Remove {
        /// Room id (32 hex digits)
        #[arg(long)]
        room: RoomId,
        /// Host password
        #[arg(long)]
        host_password: String,
        /// Participant to remove
        #[arg(long)]
        username: String,
    },

    /// Draw and seal the assignments
    Start {
        /// Room id (32 hex digits)
        #[arg(long)]
        room: RoomId,
        /// Host password
        #[arg(long)]
        host_password: String,
    },

    /// Decrypt and print your receiver
    Reveal {
        /// Room id (32 hex digits)
        #[arg(long)]
        room: RoomId,
        /// Participant name
        #[arg(long)]
        username: String,
        /// Participant password
        #[arg(long)]
        password: String,
    },

    /// Show a room's name, status and participants
    Status {
        /// Room id (32 hex digits)
        #[arg(long)]
        room: RoomId,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(category = ?err.category(), "{err}");
            ExitCode::FAILURE
        },
    }
}

// Command results go to stdout; logs go to stderr.
#[allow(clippy::print_stdout)]
async fn run(args: Args) -> Result<(), ServerError> {
    if args.max_participants < 2 {
        return Err(ServerError::Config(format!(
            "--max-participants must be at least 2, got {}",
            args.max_participants
        )));
    }

    let env = SystemEnv::new();
    let storage = RedbStorage::open(&args.db)?;
    let config =
        RoomManagerConfig { max_participants: args.max_participants, ..Default::default() };
    let manager = RoomManager::new(env, storage, config);
    let params = DerivationParams::PROTOCOL;

    match args.command {
        Command::CreateRoom { name, host_password } => {
            let room = manager.create_room(&name, &host_password)?;
            println!("{room}");
        },

        Command::Join { room, username, password } => {
            let key_salt = manager.issue_key_salt(room, &username, &password)?;
            let credentials = Credentials::new(&username, &password, room)?;

            let registration =
                with_progress("join", spawn_register(credentials, key_salt, params)).await?;
            manager.register_public_key(room, &username, &password, &registration.public_key)?;

            println!("{} is registered", registration.username);
        },

        Command::Remove { room, host_password, username } => {
            manager.remove_participant(room, &host_password, &username)?;
            println!("removed {username}");
        },

        Command::Start { room, host_password } => {
            let roster = manager.roster(room, &host_password)?;
            let batch = with_progress("start", spawn_prepare_start(roster, env.rng_seed())).await?;
            manager.start(room, &host_password, &batch)?;

            println!("started with {} participants", batch.assignments.len());
        },

        Command::Reveal { room, username, password } => {
            let grant = manager.login(room, &username, &password)?;
            let credentials = Credentials::new(&username, &password, room)?;

            let receiver = with_progress("reveal", spawn_reveal(credentials, grant, params)).await?;
            println!("{receiver}");
        },

        Command::Status { room } => {
            let summary = manager.summary(room)?;
            println!("{} ({}) - {}", summary.name, summary.id, summary.status.label());
            for participant in summary.participants {
                let note = if participant.registered { "" } else { " (no key yet)" };
                println!("  {}{note}", participant.username);
            }
        },
    }

    Ok(())
}

/// Wait for a background task, logging each phase as it is reached.
async fn with_progress<T: Send + 'static>(
    operation: &'static str,
    task: BackgroundTask<T>,
) -> Result<T, ProtocolError> {
    let mut phases = task.subscribe();
    let progress = tokio::spawn(async move {
        loop {
            let phase = *phases.borrow_and_update();
            tracing::info!(operation, %phase, "progress");
            if phases.changed().await.is_err() {
                break;
            }
        }
    });

    let result = task.join().await;
    progress.abort();
    result
}
