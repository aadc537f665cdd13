#![forbid(unsafe_code)]

mod config;
mod terminal;

use std::cell::RefCell;
use std::fs;
use std::io;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result};
use chip8_bridge::scheduler::{self, Cadences, RunOutcome};
use chip8_bridge::{BridgeError, Guest, HostContext, Session, WasmGuest};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::terminal::TerminalDisplay;

fn main() -> Result<ExitCode> {
    let settings = Settings::load()?;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(run(settings))
}

async fn run(settings: Settings) -> Result<ExitCode> {
    let mut host = HostContext::new(&settings.bridge);
    if settings.display {
        host = host.with_display(TerminalDisplay::new(io::stdout()));
    }
    let guest = WasmGuest::from_file(&settings.guest, host, &settings.bridge)
        .with_context(|| format!("failed to load guest {}", settings.guest.display()))?;
    let mut session = Session::new(guest, settings.bridge.clone())?;

    match session.setup() {
        Ok(()) => {}
        Err(BridgeError::MissingExport(name)) => tracing::debug!("guest has no `{name}` export"),
        Err(err) => return guest_failed(err),
    }

    if let Some(path) = &settings.rom {
        let rom = fs::read(path).with_context(|| format!("failed to read ROM {}", path.display()))?;
        if let Err(err) = session.open_rom(&rom) {
            return guest_failed(err);
        }
    }

    for code in &settings.hold {
        session.key_down(code);
    }

    let shutdown = session.shutdown_token();
    let session = Rc::new(RefCell::new(session));
    let deadline = async {
        let Some(limit) = settings.run_for else {
            return;
        };
        tokio::select! {
            _ = sleep(limit) => {
                tracing::info!(ms = limit.as_millis() as u64, "run time elapsed");
                shutdown.cancel();
            }
            _ = shutdown.cancelled() => {}
        }
    };
    let (outcome, ()) = tokio::join!(
        scheduler::run(session.clone(), Cadences::from_config(&settings.bridge)),
        deadline
    );

    let frames = session.borrow().guest().host().screen.frames();
    match outcome? {
        RunOutcome::Cancelled => {
            tracing::info!(frames, "stopped");
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Exited { code } => {
            tracing::info!(frames, code, "guest exited");
            Ok(exit_code(code))
        }
    }
}

/// A guest exit becomes the process exit status; anything else is an error.
fn guest_failed(err: BridgeError) -> Result<ExitCode> {
    match err.exit_code() {
        Some(code) => Ok(exit_code(code)),
        None => Err(err.into()),
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(exit_status(code))
}

/// Codes outside `0..=255` become 1 so a non-zero guest exit never reads as success.
fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}
