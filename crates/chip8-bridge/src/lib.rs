//! Host-guest bridge for a sandboxed CHIP-8 guest module.
//!
//! The guest (an interpreter compiled to WebAssembly) owns its instruction loop. This crate
//! supplies everything around it:
//!
//! - a static import table ([`linker`]) binding console, system-call shim, audio, input and
//!   framebuffer functions to one per-store [`HostContext`],
//! - the guest memory locking protocol ([`lock`]) used whenever the host reads or writes a
//!   region the guest may otherwise relocate,
//! - the framebuffer decoder ([`framebuffer`]), ROM loader ([`rom`]) and the two-cadence
//!   scheduler ([`scheduler`]) that drives rendering and stepping.
//!
//! The [`Guest`] trait is the seam between the host and the guest runtime. [`WasmGuest`] is the
//! wasmtime-backed implementation; tests substitute in-memory fakes.

#![forbid(unsafe_code)]

pub mod audio;
pub mod clock;
pub mod config;
pub mod console;
mod context;
mod errno;
mod error;
pub mod framebuffer;
mod guest;
pub mod input;
pub mod linker;
pub mod lock;
pub mod memory;
pub mod rom;
pub mod scheduler;
mod session;
pub mod shim;

pub use config::{BridgeConfig, FdWriteMode, ResetStyle, StepMode};
pub use context::HostContext;
pub use errno::Errno;
pub use error::{BridgeError, GuestExit, Result};
pub use guest::Guest;
pub use linker::{Binding, MemorySource, WasmGuest};
pub use session::Session;
