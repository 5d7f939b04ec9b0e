use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;

mod commands;

use commands::{RoomArgs, run_list, run_purge, run_serve, run_start, run_status, run_stop};

#[derive(Parser, Debug)]
#[command(name = "dispatcher", version)]
#[command(about = "Keep one agent worker dispatched per conference room")]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP trigger service
    Serve {
        /// Bind address (overrides DISPATCHER_BIND_ADDR)
        #[arg(long)]
        bind: Option<SocketAddr>,
        /// Use a process-local registry instead of LiveKit
        #[arg(long)]
        in_memory: bool,
    },
    /// Ensure the agent is dispatched to a room
    Start {
        #[command(flatten)]
        target: RoomArgs,
        /// Job metadata passed to the worker
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Remove the agent's dispatch from a room
    Stop {
        #[command(flatten)]
        target: RoomArgs,
    },
    /// Show the agent's dispatch and its jobs
    Status {
        #[command(flatten)]
        target: RoomArgs,
    },
    /// List every dispatch in a room
    List {
        /// Room name
        #[arg(long)]
        room: String,
    },
    /// Remove every dispatch for the agent, duplicates included
    Purge {
        #[command(flatten)]
        target: RoomArgs,
    },
}

fn init_logging(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    // stdout carries command results
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let result = match cli.command {
        Commands::Serve { bind, in_memory } => run_serve(bind, in_memory).await,
        Commands::Start { target, metadata } => run_start(target, metadata).await,
        Commands::Stop { target } => run_stop(target).await,
        Commands::Status { target } => run_status(target).await,
        Commands::List { room } => run_list(&room).await,
        Commands::Purge { target } => run_purge(target).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
