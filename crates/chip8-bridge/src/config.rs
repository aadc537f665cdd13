use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::framebuffer::BITMAP_BYTES;
use crate::rom::{ProgramRegion, MAX_ROM_BYTES};
use crate::{BridgeError, Result};

/// How `fd_write` behaves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FdWriteMode {
    /// Every descriptor is bad.
    #[default]
    Badf,
    /// Forward to the guest's own `wasi_snapshot_preview1.fd_write` export.
    DelegateToGuest,
}

/// What the step cadence calls on each tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepMode {
    /// `context_try_step_many(rate / ticks)` followed by `context_step_clocks(1)`.
    #[default]
    StepMany,
    /// A single `update()` call.
    Update,
}

/// How a ROM is handed to the guest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResetStyle {
    /// `context_reset()`, then copy into the locked program range.
    #[default]
    ContextReset,
    /// Copy into the locked program range, zero the tail, unlock, then `reset(ptr)`.
    SourcePointer,
}

macro_rules! kebab_enum {
    ($ty:ty { $($name:literal => $variant:path),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($name => Ok($variant),)+
                    other => Err(format!(
                        "unknown value {other:?} (expected one of: {})",
                        [$($name),+].join(", ")
                    )),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $($variant => $name,)+
                })
            }
        }
    };
}

kebab_enum!(FdWriteMode {
    "badf" => FdWriteMode::Badf,
    "delegate-to-guest" => FdWriteMode::DelegateToGuest,
});

kebab_enum!(StepMode {
    "step-many" => StepMode::StepMany,
    "update" => StepMode::Update,
});

kebab_enum!(ResetStyle {
    "context-reset" => ResetStyle::ContextReset,
    "source-pointer" => ResetStyle::SourcePointer,
});

/// Runtime configuration for one bridge session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub fd_write: FdWriteMode,
    pub step_mode: StepMode,
    pub reset_style: ResetStyle,
    pub instructions_per_second: f64,
    pub ticks_per_second: u32,
    pub refresh_hz: u32,
    /// Guest address of the 256-byte monochrome framebuffer.
    pub framebuffer_addr: u32,
    pub program_start: u32,
    pub program_end: u32,
    /// Initial size of the host-provided memory, in 64 KiB pages.
    pub memory_pages: u32,
    pub tone_hz: f32,
    pub sample_rate_hz: u32,
    /// Back `random_get` with the OS RNG; otherwise it reports NOSYS.
    pub entropy: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            fd_write: FdWriteMode::default(),
            step_mode: StepMode::default(),
            reset_style: ResetStyle::default(),
            instructions_per_second: 500.0,
            ticks_per_second: 60,
            refresh_hz: 60,
            framebuffer_addr: 0x0F00,
            program_start: ProgramRegion::CHIP8.start,
            program_end: ProgramRegion::CHIP8.end,
            memory_pages: 2,
            tone_hz: 440.0,
            sample_rate_hz: 48_000,
            entropy: true,
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.instructions_per_second.is_finite() && self.instructions_per_second > 0.0) {
            return Err(BridgeError::InvalidConfig(
                "instructions_per_second must be a positive number",
            ));
        }
        if self.ticks_per_second == 0 {
            return Err(BridgeError::InvalidConfig("ticks_per_second must be non-zero"));
        }
        if self.refresh_hz == 0 {
            return Err(BridgeError::InvalidConfig("refresh_hz must be non-zero"));
        }
        if self.program_start >= self.program_end {
            return Err(BridgeError::InvalidConfig(
                "program_start must be below program_end",
            ));
        }
        if self.program_region().len() > MAX_ROM_BYTES {
            return Err(BridgeError::InvalidConfig(
                "program region is larger than 0xD00 bytes",
            ));
        }
        let fb_start = u64::from(self.framebuffer_addr);
        let fb_end = fb_start + BITMAP_BYTES as u64;
        if u64::from(self.program_start) < fb_end && fb_start < u64::from(self.program_end) {
            return Err(BridgeError::InvalidConfig(
                "program region overlaps the framebuffer",
            ));
        }
        if self.memory_pages == 0 {
            return Err(BridgeError::InvalidConfig("memory_pages must be non-zero"));
        }
        if !(self.tone_hz.is_finite() && self.tone_hz > 0.0) {
            return Err(BridgeError::InvalidConfig("tone_hz must be a positive number"));
        }
        if self.sample_rate_hz == 0 {
            return Err(BridgeError::InvalidConfig("sample_rate_hz must be non-zero"));
        }
        Ok(())
    }

    /// Instructions requested from the guest per tick; fractional.
    pub fn steps_per_tick(&self) -> f64 {
        self.instructions_per_second / f64::from(self.ticks_per_second)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.ticks_per_second))
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.refresh_hz))
    }

    pub fn program_region(&self) -> ProgramRegion {
        ProgramRegion {
            start: self.program_start,
            end: self.program_end,
        }
    }
}
