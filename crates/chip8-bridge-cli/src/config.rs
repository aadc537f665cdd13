use std::path::PathBuf;
use std::time::Duration;
use std::{env, fs};

use anyhow::{Context, Result};
use chip8_bridge::{BridgeConfig, FdWriteMode, ResetStyle, StepMode};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "chip8-bridge",
    version,
    about = "Run a CHIP-8 guest module (.wasm or .wat) against the host bridge"
)]
pub struct Args {
    /// Guest module to load.
    guest: PathBuf,

    /// ROM image to load after guest setup (at most 0xD00 bytes).
    ///
    /// Environment variable: `CHIP8_BRIDGE_ROM`.
    #[arg(long, env = "CHIP8_BRIDGE_ROM")]
    rom: Option<PathBuf>,

    /// JSON file with bridge settings. Flags given on the command line override it.
    ///
    /// Environment variable: `CHIP8_BRIDGE_CONFIG`.
    #[arg(long, env = "CHIP8_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// `badf` or `delegate-to-guest`.
    #[arg(long, env = "CHIP8_BRIDGE_FD_WRITE")]
    fd_write: Option<FdWriteMode>,

    /// `step-many` or `update`.
    #[arg(long, env = "CHIP8_BRIDGE_STEP_MODE")]
    step_mode: Option<StepMode>,

    /// `context-reset` or `source-pointer`.
    #[arg(long, env = "CHIP8_BRIDGE_RESET_STYLE")]
    reset_style: Option<ResetStyle>,

    /// Target instruction rate.
    #[arg(long, env = "CHIP8_BRIDGE_IPS")]
    instructions_per_second: Option<f64>,

    /// Step cadence rate.
    #[arg(long, env = "CHIP8_BRIDGE_TICK_HZ")]
    ticks_per_second: Option<u32>,

    /// Render cadence rate.
    #[arg(long, env = "CHIP8_BRIDGE_REFRESH_HZ")]
    refresh_hz: Option<u32>,

    /// Guest address of the framebuffer (decimal or `0x` hex).
    #[arg(long, value_parser = parse_addr)]
    framebuffer_addr: Option<u32>,

    /// Make `random_get` report NOSYS instead of using the OS RNG.
    #[arg(long)]
    no_entropy: bool,

    /// Physical keys (KeyboardEvent codes) held down for the whole run, e.g. `KeyX,Digit1`.
    #[arg(long, value_delimiter = ',')]
    hold: Vec<String>,

    /// Stop after this many milliseconds. Without it the run lasts until the guest exits.
    ///
    /// Environment variable: `CHIP8_BRIDGE_RUN_MS`.
    #[arg(long, env = "CHIP8_BRIDGE_RUN_MS")]
    run_ms: Option<u64>,

    /// Draw frames to the terminal.
    #[arg(long)]
    display: bool,

    /// Log filter (tracing-subscriber EnvFilter syntax). Falls back to `RUST_LOG`, then `info`.
    ///
    /// Environment variable: `CHIP8_BRIDGE_LOG_LEVEL`.
    #[arg(long, env = "CHIP8_BRIDGE_LOG_LEVEL")]
    log_level: Option<String>,
}

fn parse_addr(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|err| format!("invalid address {s:?}: {err}"))
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub guest: PathBuf,
    pub rom: Option<PathBuf>,
    pub bridge: BridgeConfig,
    pub hold: Vec<String>,
    pub run_for: Option<Duration>,
    pub display: bool,
    pub log_level: String,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<Self> {
        let mut bridge = match &args.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => BridgeConfig::default(),
        };

        if let Some(mode) = args.fd_write {
            bridge.fd_write = mode;
        }
        if let Some(mode) = args.step_mode {
            bridge.step_mode = mode;
        }
        if let Some(style) = args.reset_style {
            bridge.reset_style = style;
        }
        if let Some(ips) = args.instructions_per_second {
            bridge.instructions_per_second = ips;
        }
        if let Some(hz) = args.ticks_per_second {
            bridge.ticks_per_second = hz;
        }
        if let Some(hz) = args.refresh_hz {
            bridge.refresh_hz = hz;
        }
        if let Some(addr) = args.framebuffer_addr {
            bridge.framebuffer_addr = addr;
        }
        if args.no_entropy {
            bridge.entropy = false;
        }
        bridge.validate()?;

        let log_level = args
            .log_level
            .or_else(|| env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_string());

        Ok(Self {
            guest: args.guest,
            rom: args.rom,
            bridge,
            hold: args.hold,
            run_for: args.run_ms.map(Duration::from_millis),
            display: args.display,
            log_level,
        })
    }
}
