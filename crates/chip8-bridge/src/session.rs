use tokio_util::sync::CancellationToken;

use crate::audio::FrameBudget;
use crate::framebuffer::BITMAP_BYTES;
use crate::lock::with_locked_range;
use crate::{rom, BridgeConfig, Guest, Result, StepMode};

/// A loaded guest plus the host-side phases that drive it.
///
/// Each method is one synchronous unit of work: every guest memory lock it takes is released
/// before it returns.
pub struct Session<G> {
    guest: G,
    config: BridgeConfig,
    audio_frames: FrameBudget,
}

impl<G: Guest> Session<G> {
    pub fn new(guest: G, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let audio_frames = FrameBudget::new(config.sample_rate_hz, config.ticks_per_second);
        Ok(Self {
            guest,
            config,
            audio_frames,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn setup(&mut self) -> Result<()> {
        self.guest.setup()
    }

    /// Decode the guest framebuffer under the lock, then present it.
    pub fn render_frame(&mut self) -> Result<()> {
        let decoded = with_locked_range(
            &mut self.guest,
            self.config.framebuffer_addr,
            BITMAP_BYTES as u32,
            |range| {
                let (bitmap, host) = range.bytes_and_host()?;
                Ok(host.screen.decode_from(bitmap))
            },
        )?;
        if decoded {
            self.guest.host_mut().screen.present();
        }
        Ok(())
    }

    /// One step-cadence tick.
    pub fn tick(&mut self) -> Result<()> {
        match self.config.step_mode {
            StepMode::StepMany => {
                self.guest.try_step_many(self.config.steps_per_tick())?;
                self.guest.step_clocks(1)?;
            }
            StepMode::Update => self.guest.update()?,
        }
        let frames = self.audio_frames.next_tick();
        self.guest.host_mut().audio.pump(frames);
        Ok(())
    }

    pub fn open_rom(&mut self, rom: &[u8]) -> Result<usize> {
        rom::open_rom(
            &mut self.guest,
            self.config.program_region(),
            self.config.reset_style,
            rom,
        )
    }

    /// A key press is also the user gesture that unlocks audio output.
    pub fn key_down(&mut self, code: &str) {
        let host = self.guest.host_mut();
        host.audio.resume();
        host.keys.press(code);
    }

    pub fn key_up(&mut self, code: &str) {
        self.guest.host_mut().keys.release(code);
    }

    pub fn focus_lost(&mut self) {
        self.guest.host_mut().keys.clear();
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.guest.host().exit_code
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.guest.host().shutdown_token()
    }

    pub fn guest(&self) -> &G {
        &self.guest
    }

    pub fn guest_mut(&mut self) -> &mut G {
        &mut self.guest
    }

    pub fn into_guest(self) -> G {
        self.guest
    }
}
