use crate::{HostContext, Result};

/// The guest's exported control surface, plus access to its memory and the host context bound
/// to its imports.
///
/// Every call may re-enter the host through imports and may grow or relocate guest memory, so a
/// slice returned by [`Guest::memory`] must not be kept across calls. Host code that touches guest
/// memory goes through [`crate::lock::LockedRange`].
pub trait Guest {
    /// One-time initialisation after load.
    fn setup(&mut self) -> Result<()>;

    /// Clear execution state (`context_reset`).
    fn reset(&mut self) -> Result<()>;

    /// Clear execution state and load the program at `src` (`reset(src_ptr)`).
    fn reset_from(&mut self, src: u32) -> Result<()>;

    /// Pin `len` bytes starting at `start`; returns where they currently live.
    fn lock_memory_range(&mut self, start: u32, len: u32) -> Result<u32>;

    fn unlock_memory_range(&mut self) -> Result<()>;

    /// Execute up to `count` instructions, carrying the fractional remainder.
    fn try_step_many(&mut self, count: f64) -> Result<()>;

    /// Advance the delay and sound timers by `n` units.
    fn step_clocks(&mut self, n: u32) -> Result<()>;

    /// Combined step and clock advance for guests with a single entry point.
    fn update(&mut self) -> Result<()>;

    fn memory(&self) -> &[u8];

    fn memory_and_host(&mut self) -> (&mut [u8], &mut HostContext);

    fn host(&self) -> &HostContext;

    fn host_mut(&mut self) -> &mut HostContext;
}

impl<G: Guest + ?Sized> Guest for Box<G> {
    fn setup(&mut self) -> Result<()> {
        (**self).setup()
    }

    fn reset(&mut self) -> Result<()> {
        (**self).reset()
    }

    fn reset_from(&mut self, src: u32) -> Result<()> {
        (**self).reset_from(src)
    }

    fn lock_memory_range(&mut self, start: u32, len: u32) -> Result<u32> {
        (**self).lock_memory_range(start, len)
    }

    fn unlock_memory_range(&mut self) -> Result<()> {
        (**self).unlock_memory_range()
    }

    fn try_step_many(&mut self, count: f64) -> Result<()> {
        (**self).try_step_many(count)
    }

    fn step_clocks(&mut self, n: u32) -> Result<()> {
        (**self).step_clocks(n)
    }

    fn update(&mut self) -> Result<()> {
        (**self).update()
    }

    fn memory(&self) -> &[u8] {
        (**self).memory()
    }

    fn memory_and_host(&mut self) -> (&mut [u8], &mut HostContext) {
        (**self).memory_and_host()
    }

    fn host(&self) -> &HostContext {
        (**self).host()
    }

    fn host_mut(&mut self) -> &mut HostContext {
        (**self).host_mut()
    }
}
