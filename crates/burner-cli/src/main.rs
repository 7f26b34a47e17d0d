//! Burner terminal client binary.
//!
//! # Usage
//!
//! ```bash
//! # Join room "r7" on a local relay
//! burner --room r7 --name alice
//!
//! # Hosted relay over TLS, verbose diagnostics on stderr
//! burner --relay wss://burner-chat-server.onrender.com/ws --room r7 --name bob --log-level debug
//! ```

use std::{
    io::{self, BufRead, Write},
    thread,
    time::Duration,
};

use burner_app::{Command, Notification, Runtime, RuntimeConfig, RuntimeHandle, USAGE};
use burner_cli::{
    input::{self, Line},
    render::Renderer,
    ws::WsDriver,
};
use burner_client::{Session, SessionConfig, transport};
use burner_core::SystemEnv;
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Burner ephemeral chat client
#[derive(Parser, Debug)]
#[command(name = "burner")]
#[command(about = "Two-party end-to-end encrypted ephemeral chat")]
#[command(version)]
struct Args {
    /// Relay WebSocket base URL; the room name is appended
    #[arg(long, default_value = "ws://localhost:8000/ws")]
    relay: String,

    /// Room to join
    #[arg(short, long)]
    room: String,

    /// Display name announced to the peer
    #[arg(short, long)]
    name: String,

    /// Session tick interval in milliseconds
    #[arg(long, default_value = "100")]
    tick_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();

    tracing::info!(relay = %args.relay, room = %args.room, "joining room");

    let connection = transport::connect(&args.relay, &args.room).await?;

    let env = SystemEnv::new();
    let session = Session::join(env, args.name, SessionConfig::default())?;
    let config = RuntimeConfig { tick_interval: Duration::from_millis(args.tick_ms.max(1)) };
    let (runtime, handle) = Runtime::new(WsDriver::new(connection), env, session, config);
    let RuntimeHandle { commands, notifications } = handle;

    let renderer = tokio::spawn(render_notifications(notifications));

    // Blocking stdin reads stay off the runtime so shutdown never waits on them
    thread::spawn(move || read_commands(&commands));

    let reason = runtime.run().await?;
    renderer.await??;

    tracing::info!(?reason, "exiting");
    Ok(())
}

async fn render_notifications(
    mut notifications: mpsc::UnboundedReceiver<Notification>,
) -> io::Result<()> {
    let mut renderer = Renderer::new(io::stdout());
    while let Some(notification) = notifications.recv().await {
        renderer.render(&notification)?;
    }
    Ok(())
}

/// Forward stdin lines until EOF, `/quit`, or the runtime hangs up.
fn read_commands(commands: &mpsc::Sender<Command>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(%err, "stdin read failed");
                break;
            },
        };

        let command = match input::interpret(&line) {
            Ok(Line::Command(command)) => command,
            Ok(Line::Help) => {
                feedback(USAGE);
                continue;
            },
            Ok(Line::Blank) => continue,
            Err(err) => {
                feedback(&format!("! {err}"));
                continue;
            },
        };

        let quit = command == Command::Quit;
        if commands.blocking_send(command).is_err() || quit {
            break;
        }
    }
}

fn feedback(text: &str) {
    let mut out = io::stdout().lock();
    if writeln!(out, "{text}").and_then(|()| out.flush()).is_err() {
        tracing::debug!("stdout closed");
    }
}
