#![allow(dead_code)]

use chip8_bridge::rom::ProgramRegion;
use chip8_bridge::{BridgeConfig, BridgeError, Guest, HostContext, Result};

/// Scripted in-memory guest.
///
/// Logical address `a` lives at `a + lock_offset` in `mem`, so hosts that ignore the pointer
/// returned by `lock_memory_range` read the wrong bytes.
pub struct FakeGuest {
    pub mem: Vec<u8>,
    pub host: HostContext,
    pub lock_offset: u32,
    pub locked: Option<(u32, u32)>,
    pub lock_calls: u32,
    pub unlock_calls: u32,
    pub fail_lock: bool,
    pub fail_unlock: bool,
    pub zero_on_reset: bool,
    pub calls: Vec<&'static str>,
    pub reset_sources: Vec<u32>,
    pub steps_requested: f64,
    pub steps_executed: u64,
    step_carry: f64,
    pub clock_steps: u32,
    pub updates: u32,
    /// Exit with `code` on the `n`th clock step (or update).
    pub exit_on_tick: Option<(u32, i32)>,
    /// Trap on the `n`th clock step.
    pub trap_on_tick: Option<u32>,
}

impl FakeGuest {
    pub fn new() -> Self {
        Self::with_config(&BridgeConfig::default())
    }

    pub fn with_config(config: &BridgeConfig) -> Self {
        Self::with_host(HostContext::new(config))
    }

    pub fn with_host(host: HostContext) -> Self {
        Self {
            mem: vec![0; 0x1_0000],
            host,
            lock_offset: 0,
            locked: None,
            lock_calls: 0,
            unlock_calls: 0,
            fail_lock: false,
            fail_unlock: false,
            zero_on_reset: true,
            calls: Vec::new(),
            reset_sources: Vec::new(),
            steps_requested: 0.0,
            steps_executed: 0,
            step_carry: 0.0,
            clock_steps: 0,
            updates: 0,
            exit_on_tick: None,
            trap_on_tick: None,
        }
    }

    pub fn relocated(mut self, offset: u32) -> Self {
        self.lock_offset = offset;
        self
    }

    /// Bytes at logical address `addr`.
    pub fn logical(&self, addr: u32, len: usize) -> &[u8] {
        let at = (addr + self.lock_offset) as usize;
        &self.mem[at..at + len]
    }

    pub fn logical_mut(&mut self, addr: u32, len: usize) -> &mut [u8] {
        let at = (addr + self.lock_offset) as usize;
        &mut self.mem[at..at + len]
    }

    pub fn program(&self) -> &[u8] {
        let region = ProgramRegion::CHIP8;
        self.logical(region.start, region.len())
    }

    fn tick_hooks(&mut self) -> Result<()> {
        if self.trap_on_tick == Some(self.clock_steps) {
            return Err(BridgeError::Trap(wasmtime::Error::msg("unreachable executed")));
        }
        if let Some((n, code)) = self.exit_on_tick {
            if self.clock_steps >= n {
                self.host.request_exit(code);
                return Err(BridgeError::Exit { code });
            }
        }
        Ok(())
    }
}

impl Guest for FakeGuest {
    fn setup(&mut self) -> Result<()> {
        self.calls.push("setup");
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.calls.push("reset");
        if self.zero_on_reset {
            let region = ProgramRegion::CHIP8;
            self.logical_mut(region.start, region.len()).fill(0);
        }
        Ok(())
    }

    fn reset_from(&mut self, src: u32) -> Result<()> {
        self.calls.push("reset_from");
        self.reset_sources.push(src);
        Ok(())
    }

    fn lock_memory_range(&mut self, start: u32, len: u32) -> Result<u32> {
        assert!(self.locked.is_none(), "nested lock_memory_range");
        self.calls.push("lock");
        self.lock_calls += 1;
        if self.fail_lock {
            return Err(BridgeError::Trap(wasmtime::Error::msg("lock trapped")));
        }
        self.locked = Some((start, len));
        Ok(start + self.lock_offset)
    }

    fn unlock_memory_range(&mut self) -> Result<()> {
        self.calls.push("unlock");
        self.unlock_calls += 1;
        self.locked = None;
        if self.fail_unlock {
            return Err(BridgeError::Trap(wasmtime::Error::msg("unlock trapped")));
        }
        Ok(())
    }

    fn try_step_many(&mut self, count: f64) -> Result<()> {
        self.calls.push("step_many");
        self.steps_requested += count;
        self.step_carry += count;
        let whole = (self.step_carry + 1e-9).floor();
        self.steps_executed += whole as u64;
        self.step_carry -= whole;
        Ok(())
    }

    fn step_clocks(&mut self, n: u32) -> Result<()> {
        self.calls.push("step_clocks");
        self.clock_steps += n;
        self.tick_hooks()
    }

    fn update(&mut self) -> Result<()> {
        self.calls.push("update");
        self.updates += 1;
        self.clock_steps += 1;
        self.tick_hooks()
    }

    fn memory(&self) -> &[u8] {
        &self.mem
    }

    fn memory_and_host(&mut self) -> (&mut [u8], &mut HostContext) {
        (&mut self.mem, &mut self.host)
    }

    fn host(&self) -> &HostContext {
        &self.host
    }

    fn host_mut(&mut self) -> &mut HostContext {
        &mut self.host
    }
}
