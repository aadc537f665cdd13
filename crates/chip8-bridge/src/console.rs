//! Guest console forwarding.

/// Import module name.
pub const MODULE: &str = "console";

/// Tracing target used for guest-originated text.
pub const GUEST_TARGET: &str = "guest";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Error,
    Fatal,
}

/// Host logging sink for guest text.
pub trait ConsoleSink {
    fn log(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
    fn fatal(&mut self, msg: &str);

    /// Interactive debugger break requested after a fatal message.
    fn debug_break(&mut self) {}
}

/// Default sink: guest text becomes `tracing` events on the `guest` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsole;

impl ConsoleSink for TracingConsole {
    fn log(&mut self, msg: &str) {
        tracing::info!(target: GUEST_TARGET, "{msg}");
    }

    fn error(&mut self, msg: &str) {
        tracing::error!(target: GUEST_TARGET, "{msg}");
    }

    fn fatal(&mut self, msg: &str) {
        tracing::error!(target: GUEST_TARGET, fatal = true, "{msg}");
    }

    fn debug_break(&mut self) {
        tracing::warn!(target: GUEST_TARGET, "guest requested a debugger break");
    }
}

/// Decode `bytes` as UTF-8 (lossily) and hand it to `sink` at `level`.
pub fn forward(sink: &mut dyn ConsoleSink, level: ConsoleLevel, bytes: &[u8]) {
    let msg = String::from_utf8_lossy(bytes);
    match level {
        ConsoleLevel::Log => sink.log(&msg),
        ConsoleLevel::Error => sink.error(&msg),
        ConsoleLevel::Fatal => {
            sink.fatal(&msg);
            sink.debug_break();
        }
    }
}
