use tokio_util::sync::CancellationToken;

use crate::audio::{AudioBridge, AudioSink, NullAudioSink};
use crate::clock::{HostClock, SystemClock};
use crate::console::{ConsoleSink, TracingConsole};
use crate::framebuffer::{DisplaySink, NullDisplay, Screen};
use crate::input::KeyState;
use crate::shim::{EntropySource, OsEntropy};
use crate::{BridgeConfig, FdWriteMode};

/// Host state shared by every imported function of one guest instance.
///
/// It is owned by the wasmtime store, so host functions reach it through their `Caller` at call
/// time rather than capturing anything at bind time.
pub struct HostContext {
    pub console: Box<dyn ConsoleSink>,
    pub keys: KeyState,
    pub audio: AudioBridge,
    pub screen: Screen,
    pub clock: Box<dyn HostClock>,
    /// `None` makes `random_get` report NOSYS.
    pub entropy: Option<Box<dyn EntropySource>>,
    pub fd_write: FdWriteMode,
    /// Set once the guest calls `proc_exit`.
    pub exit_code: Option<i32>,
    shutdown: CancellationToken,
}

impl HostContext {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            console: Box::new(TracingConsole),
            keys: KeyState::new(),
            audio: AudioBridge::new(
                Box::new(NullAudioSink),
                config.tone_hz,
                config.sample_rate_hz,
            ),
            screen: Screen::new(Box::new(NullDisplay)),
            clock: Box::new(SystemClock::new()),
            entropy: config
                .entropy
                .then(|| Box::new(OsEntropy) as Box<dyn EntropySource>),
            fd_write: config.fd_write,
            exit_code: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_console(mut self, console: impl ConsoleSink + 'static) -> Self {
        self.console = Box::new(console);
        self
    }

    pub fn with_display(mut self, display: impl DisplaySink + 'static) -> Self {
        self.screen.set_display(Box::new(display));
        self
    }

    pub fn with_audio_sink(mut self, sink: impl AudioSink + 'static) -> Self {
        self.audio.set_sink(Box::new(sink));
        self
    }

    pub fn with_clock(mut self, clock: impl HostClock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_entropy(mut self, entropy: Option<Box<dyn EntropySource>>) -> Self {
        self.entropy = entropy;
        self
    }

    /// Record a guest exit and stop every scheduled cadence.
    pub fn request_exit(&mut self, code: i32) {
        tracing::warn!(code, "guest requested exit");
        self.exit_code = Some(code);
        self.shutdown.cancel();
    }

    /// Token cancelled when the session must stop.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("keys", &self.keys)
            .field("audio", &self.audio)
            .field("screen", &self.screen)
            .field("entropy", &self.entropy.is_some())
            .field("fd_write", &self.fd_write)
            .field("exit_code", &self.exit_code)
            .finish_non_exhaustive()
    }
}
