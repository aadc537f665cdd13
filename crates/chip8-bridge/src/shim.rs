//! Minimal `wasi_snapshot_preview1` surface.
//!
//! Each function here works on a borrowed slice of guest memory plus the host-side state it
//! needs; [`crate::linker`] adapts them to wasmtime imports. None of them fail: every outcome is
//! an [`Errno`]. Guest pointers that fall outside memory are reported as [`Errno::Inval`].
//!
//! `fd_write` delegation and `proc_exit` need the guest instance and live in the linker.

use rand::RngCore;
use thiserror::Error;

use crate::clock::{ms_to_ns, HostClock};
use crate::memory;
use crate::Errno;

/// Import module name; doubles as the shim's ABI version.
pub const MODULE: &str = "wasi_snapshot_preview1";

pub const CLOCK_REALTIME: u32 = 0;
pub const CLOCK_MONOTONIC: u32 = 1;

/// Size reported for the (empty) environment buffer: two NUL bytes.
pub const ENVIRON_BUF_LEN: u32 = 2;

#[derive(Debug, Error)]
#[error("entropy source failed: {0}")]
pub struct EntropyError(pub String);

/// Cryptographic random source used by `random_get`.
pub trait EntropySource {
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), EntropyError>;
}

/// [`EntropySource`] backed by the operating system RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), EntropyError> {
        rand::rngs::OsRng
            .try_fill_bytes(buf)
            .map_err(|err| EntropyError(err.to_string()))
    }
}

/// Reports zero environment variables stored in a 2-byte buffer.
pub fn environ_sizes_get(mem: &mut [u8], o_count: u32, o_buf_len: u32) -> Errno {
    let written = memory::write_u32_le(mem, o_count, 0)
        .and_then(|()| memory::write_u32_le(mem, o_buf_len, ENVIRON_BUF_LEN));
    match written {
        Ok(()) => Errno::Success,
        Err(_) => Errno::Inval,
    }
}

/// Writes the NUL terminator of the empty environment buffer.
pub fn environ_get(mem: &mut [u8], _environ: u32, environ_buf: u32) -> Errno {
    match memory::write_u16_le(mem, environ_buf, 0) {
        Ok(()) => Errno::Success,
        Err(_) => Errno::Inval,
    }
}

/// No descriptor is readable.
pub fn fd_read(_fd: u32, _iovs: u32, _iovs_len: u32, _o_nread: u32) -> Errno {
    Errno::Badf
}

/// Fill `buf..buf+len` with random bytes.
///
/// Without an entropy source this reports [`Errno::Nosys`] and leaves memory untouched.
pub fn random_get<E: EntropySource + ?Sized>(
    mem: &mut [u8],
    entropy: Option<&mut E>,
    buf: u32,
    len: u32,
) -> Errno {
    let Some(entropy) = entropy else {
        return Errno::Nosys;
    };
    let Ok(dst) = memory::region_mut(mem, buf, len as usize) else {
        return Errno::Inval;
    };
    match entropy.fill(dst) {
        Ok(()) => Errno::Success,
        Err(err) => {
            tracing::warn!("random_get: {err}");
            Errno::Inval
        }
    }
}

/// Write the current time of clock `id` in nanoseconds to `out` as a little-endian `u64`.
///
/// Only [`CLOCK_REALTIME`] and [`CLOCK_MONOTONIC`] are supported. Unknown ids report
/// [`Errno::Inval`] without touching `out`.
pub fn clock_time_get(
    mem: &mut [u8],
    clock: &dyn HostClock,
    id: u32,
    _precision: u64,
    out: u32,
) -> Errno {
    let ms = match id {
        CLOCK_REALTIME => clock.wall_ms(),
        CLOCK_MONOTONIC => clock.monotonic_ms(),
        _ => return Errno::Inval,
    };
    match memory::write_u64_le(mem, out, ms_to_ns(ms)) {
        Ok(()) => Errno::Success,
        Err(_) => Errno::Inval,
    }
}
