//! Scoped guest memory locking.
//!
//! While a range is locked the guest must not grow or move its memory, so the pointer returned by
//! `lock_memory_range` stays valid until `unlock_memory_range`. [`LockedRange`] pairs the two
//! calls: the unlock runs exactly once whether the holder releases explicitly, returns early
//! with an error, or unwinds. Locks do not nest; holding a `&mut` to the guest rules that out.

use crate::memory;
use crate::{Guest, HostContext, Result};

#[must_use = "dropping a LockedRange unlocks it immediately"]
pub struct LockedRange<'g, G: Guest + ?Sized> {
    guest: &'g mut G,
    ptr: u32,
    len: u32,
    held: bool,
}

impl<'g, G: Guest + ?Sized> LockedRange<'g, G> {
    /// Lock `len` bytes at `start`.
    ///
    /// The guard exists before the lock call, so a failing lock call is still followed by an
    /// unlock.
    pub fn acquire(guest: &'g mut G, start: u32, len: u32) -> Result<Self> {
        let mut guard = Self {
            guest,
            ptr: start,
            len,
            held: true,
        };
        guard.ptr = guard.guest.lock_memory_range(start, len)?;
        Ok(guard)
    }

    /// Where the locked bytes live.
    pub fn ptr(&self) -> u32 {
        self.ptr
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bytes(&self) -> Result<&[u8]> {
        Ok(memory::region(
            self.guest.memory(),
            self.ptr,
            self.len as usize,
        )?)
    }

    pub fn bytes_mut(&mut self) -> Result<&mut [u8]> {
        self.bytes_and_host().map(|(bytes, _)| bytes)
    }

    /// The locked bytes alongside the host context, for decoding straight into host state.
    pub fn bytes_and_host(&mut self) -> Result<(&mut [u8], &mut HostContext)> {
        let (mem, host) = self.guest.memory_and_host();
        let bytes = memory::region_mut(mem, self.ptr, self.len as usize)?;
        Ok((bytes, host))
    }

    /// The locked guest, for calls that must see the range while it is still pinned.
    pub fn guest_mut(&mut self) -> &mut G {
        &mut *self.guest
    }

    /// Unlock now, surfacing any error from the guest.
    pub fn release(mut self) -> Result<()> {
        self.held = false;
        self.guest.unlock_memory_range()
    }
}

impl<G: Guest + ?Sized> Drop for LockedRange<'_, G> {
    fn drop(&mut self) {
        if !self.held {
            return;
        }
        self.held = false;
        if let Err(err) = self.guest.unlock_memory_range() {
            tracing::warn!(ptr = self.ptr, len = self.len, "unlock_memory_range failed: {err}");
        }
    }
}

impl<G: Guest + ?Sized> std::fmt::Debug for LockedRange<'_, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockedRange")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("held", &self.held)
            .finish()
    }
}

/// Run `body` with `len` bytes at `start` locked, then unlock.
///
/// An error from `body` wins over an error from the unlock.
pub fn with_locked_range<G, T>(
    guest: &mut G,
    start: u32,
    len: u32,
    body: impl FnOnce(&mut LockedRange<'_, G>) -> Result<T>,
) -> Result<T>
where
    G: Guest + ?Sized,
{
    let mut range = LockedRange::acquire(guest, start, len)?;
    let out = body(&mut range);
    let released = range.release();
    let out = out?;
    released?;
    Ok(out)
}
