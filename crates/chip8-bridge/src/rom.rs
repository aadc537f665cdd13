//! Program loading.

use crate::lock::with_locked_range;
use crate::{BridgeError, Guest, ResetStyle, Result};

/// Guest address range a program is copied into, `start..end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramRegion {
    pub start: u32,
    pub end: u32,
}

impl ProgramRegion {
    /// `0x200..0xF00`: above the interpreter area, below the framebuffer.
    pub const CHIP8: Self = Self {
        start: 0x200,
        end: 0xF00,
    };

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Largest program that fits in [`ProgramRegion::CHIP8`].
pub const MAX_ROM_BYTES: usize = 0xD00;

/// Validate `rom` and hand it to the guest. Returns the number of bytes copied.
///
/// An oversized ROM is rejected before the guest is touched: no reset, no lock, no write.
///
/// With [`ResetStyle::ContextReset`] the guest is reset first and the ROM copied into the locked
/// program range afterwards; bytes past the end of the ROM keep whatever the reset left there.
/// With [`ResetStyle::SourcePointer`] the ROM is copied and the rest of the range zeroed under the
/// lock, and the guest is reset from the locked pointer before the lock is released.
///
/// At most [`MAX_ROM_BYTES`] are accepted even if `region` is wider.
pub fn open_rom<G: Guest + ?Sized>(
    guest: &mut G,
    region: ProgramRegion,
    style: ResetStyle,
    rom: &[u8],
) -> Result<usize> {
    let max = region.len().min(MAX_ROM_BYTES);
    if rom.len() > max {
        tracing::error!(len = rom.len(), max, "ROM too large to fit into program memory");
        return Err(BridgeError::RomTooLarge {
            len: rom.len(),
            max,
        });
    }
    let range_len = max as u32;

    match style {
        ResetStyle::ContextReset => {
            guest.reset()?;
            with_locked_range(guest, region.start, range_len, |range| {
                range.bytes_mut()?[..rom.len()].copy_from_slice(rom);
                Ok(())
            })?;
        }
        ResetStyle::SourcePointer => {
            // The pointer is only valid while the range is held.
            with_locked_range(guest, region.start, range_len, |range| {
                let (head, tail) = range.bytes_mut()?.split_at_mut(rom.len());
                head.copy_from_slice(rom);
                tail.fill(0);
                let src = range.ptr();
                range.guest_mut().reset_from(src)
            })?;
        }
    }

    tracing::info!(bytes = rom.len(), ?style, "ROM loaded");
    Ok(rom.len())
}
