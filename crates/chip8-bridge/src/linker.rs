//! Loading and linking the guest module with wasmtime.
//!
//! Imports are a static table of `(name, define)` pairs grouped by import module. Host functions
//! are plain functions over `Caller<'_, Binding>`: they look up the current memory and host
//! context through the store at call time, so replacing the host-provided memory with a
//! guest-exported one after instantiation is seen by every import.

use std::path::Path;

use wasmtime::{
    Caller, Config, Engine, Instance, Linker, Memory, MemoryType, Module, Store, TypedFunc,
    WasmParams, WasmResults,
};

use crate::console::{self, ConsoleLevel};
use crate::framebuffer::BITMAP_BYTES;
use crate::{input, memory, shim};
use crate::{BridgeConfig, BridgeError, Errno, FdWriteMode, Guest, GuestExit, HostContext, Result};

/// Module and field of the host-provided memory import.
pub const IMPORT_MEMORY_MODULE: &str = "env";
pub const IMPORT_MEMORY: &str = "memory";

/// Guest export `fd_write` is delegated to under [`FdWriteMode::DelegateToGuest`].
pub const GUEST_FD_WRITE_EXPORT: &str = "wasi_snapshot_preview1.fd_write";

/// Store data: the binding context shared by every import.
pub struct Binding {
    memory: Option<Memory>,
    instance: Option<Instance>,
    pub host: HostContext,
}

impl Binding {
    fn new(host: HostContext) -> Self {
        Self {
            memory: None,
            instance: None,
            host,
        }
    }

    /// The memory imports currently read and write.
    pub fn memory(&self) -> Option<Memory> {
        self.memory
    }

    pub fn instance(&self) -> Option<Instance> {
        self.instance
    }
}

/// Which memory ended up bound after instantiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemorySource {
    /// The `env.memory` created by the host.
    Host,
    /// The guest's own exported `memory`.
    Guest,
}

pub type DefineFn = fn(&mut Linker<Binding>, &'static str, &'static str) -> wasmtime::Result<()>;

/// One import module's worth of host functions.
pub struct ImportGroup {
    pub module: &'static str,
    pub functions: &'static [(&'static str, DefineFn)],
}

impl ImportGroup {
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.iter().map(|(name, _)| *name)
    }

    fn define(&self, linker: &mut Linker<Binding>) -> wasmtime::Result<()> {
        for &(name, define) in self.functions {
            define(linker, self.module, name)?;
        }
        Ok(())
    }
}

pub const CONSOLE: ImportGroup = ImportGroup {
    module: console::MODULE,
    functions: &[
        ("log", |l, m, n| l.func_wrap(m, n, console_log).map(|_| ())),
        ("error", |l, m, n| l.func_wrap(m, n, console_error).map(|_| ())),
        // Fatal message, followed by a debugger break.
        ("panic", |l, m, n| l.func_wrap(m, n, console_fatal).map(|_| ())),
    ],
};

pub const SHIM: ImportGroup = ImportGroup {
    module: shim::MODULE,
    functions: &[
        ("environ_sizes_get", |l, m, n| l.func_wrap(m, n, environ_sizes_get).map(|_| ())),
        ("environ_get", |l, m, n| l.func_wrap(m, n, environ_get).map(|_| ())),
        ("fd_read", |l, m, n| l.func_wrap(m, n, fd_read).map(|_| ())),
        ("fd_write", |l, m, n| l.func_wrap(m, n, fd_write).map(|_| ())),
        ("proc_exit", |l, m, n| l.func_wrap(m, n, proc_exit).map(|_| ())),
        ("random_get", |l, m, n| l.func_wrap(m, n, random_get).map(|_| ())),
        ("clock_time_get", |l, m, n| l.func_wrap(m, n, clock_time_get).map(|_| ())),
    ],
};

pub const AUDIO: ImportGroup = ImportGroup {
    module: input::MODULE,
    functions: &[
        ("sound_play", |l, m, n| l.func_wrap(m, n, sound_play).map(|_| ())),
        ("sound_stop", |l, m, n| l.func_wrap(m, n, sound_stop).map(|_| ())),
    ],
};

pub const INPUT: ImportGroup = ImportGroup {
    module: input::MODULE,
    functions: &[
        ("get_key", |l, m, n| l.func_wrap(m, n, get_key).map(|_| ())),
        ("is_pressed", |l, m, n| l.func_wrap(m, n, is_pressed).map(|_| ())),
    ],
};

pub const FRAMEBUFFER: ImportGroup = ImportGroup {
    module: input::MODULE,
    functions: &[("render", |l, m, n| l.func_wrap(m, n, render).map(|_| ()))],
};

pub const IMPORT_GROUPS: [&ImportGroup; 5] = [&CONSOLE, &SHIM, &AUDIO, &INPUT, &FRAMEBUFFER];

/// Bind every import group into `linker`.
pub fn define_imports(linker: &mut Linker<Binding>) -> wasmtime::Result<()> {
    for group in IMPORT_GROUPS {
        group.define(linker)?;
    }
    Ok(())
}

/// Run `f` over the bound memory and the host context.
///
/// Returns `None` if no memory is bound yet.
fn with_memory<R>(
    caller: &mut Caller<'_, Binding>,
    f: impl FnOnce(&mut [u8], &mut HostContext) -> R,
) -> Option<R> {
    let memory = caller.data().memory?;
    let (mem, binding) = memory.data_and_store_mut(&mut *caller);
    Some(f(mem, &mut binding.host))
}

fn errno(result: Option<Errno>) -> i32 {
    result.unwrap_or(Errno::Inval).raw() as i32
}

// console

fn forward(caller: &mut Caller<'_, Binding>, level: ConsoleLevel, start: i32, len: i32) {
    let forwarded = with_memory(caller, |mem, host| {
        let text = memory::clamped(mem, start as u32, len as u32 as usize);
        console::forward(&mut *host.console, level, text);
    });
    if forwarded.is_none() {
        tracing::warn!(?level, "console call before memory was bound");
    }
}

fn console_log(mut caller: Caller<'_, Binding>, start: i32, len: i32) {
    forward(&mut caller, ConsoleLevel::Log, start, len);
}

fn console_error(mut caller: Caller<'_, Binding>, start: i32, len: i32) {
    forward(&mut caller, ConsoleLevel::Error, start, len);
}

fn console_fatal(mut caller: Caller<'_, Binding>, start: i32, len: i32) {
    forward(&mut caller, ConsoleLevel::Fatal, start, len);
}

// wasi_snapshot_preview1

fn environ_sizes_get(mut caller: Caller<'_, Binding>, o_count: i32, o_buf_len: i32) -> i32 {
    errno(with_memory(&mut caller, |mem, _| {
        shim::environ_sizes_get(mem, o_count as u32, o_buf_len as u32)
    }))
}

fn environ_get(mut caller: Caller<'_, Binding>, environ: i32, environ_buf: i32) -> i32 {
    errno(with_memory(&mut caller, |mem, _| {
        shim::environ_get(mem, environ as u32, environ_buf as u32)
    }))
}

fn fd_read(_caller: Caller<'_, Binding>, fd: i32, iovs: i32, iovs_len: i32, o_nread: i32) -> i32 {
    shim::fd_read(fd as u32, iovs as u32, iovs_len as u32, o_nread as u32).raw() as i32
}

fn fd_write(
    mut caller: Caller<'_, Binding>,
    fd: i32,
    iovs: i32,
    iovs_len: i32,
    o_nwritten: i32,
) -> wasmtime::Result<i32> {
    let badf = Errno::Badf.raw() as i32;
    if caller.data().host.fd_write != FdWriteMode::DelegateToGuest {
        return Ok(badf);
    }
    let Some(instance) = caller.data().instance else {
        return Ok(badf);
    };
    let Ok(writer) = instance
        .get_typed_func::<(i32, i32, i32, i32), i32>(&mut caller, GUEST_FD_WRITE_EXPORT)
    else {
        tracing::debug!("guest has no `{GUEST_FD_WRITE_EXPORT}` export");
        return Ok(badf);
    };
    writer.call(&mut caller, (fd, iovs, iovs_len, o_nwritten))
}

fn proc_exit(mut caller: Caller<'_, Binding>, code: i32) -> wasmtime::Result<()> {
    caller.data_mut().host.request_exit(code);
    Err(wasmtime::Error::new(GuestExit { code }))
}

fn random_get(mut caller: Caller<'_, Binding>, buf: i32, len: i32) -> i32 {
    errno(with_memory(&mut caller, |mem, host| {
        shim::random_get(mem, host.entropy.as_deref_mut(), buf as u32, len as u32)
    }))
}

fn clock_time_get(mut caller: Caller<'_, Binding>, id: i32, precision: i64, out: i32) -> i32 {
    errno(with_memory(&mut caller, |mem, host| {
        shim::clock_time_get(mem, &*host.clock, id as u32, precision as u64, out as u32)
    }))
}

// chip8

fn sound_play(mut caller: Caller<'_, Binding>) {
    caller.data_mut().host.audio.start();
}

fn sound_stop(mut caller: Caller<'_, Binding>) {
    caller.data_mut().host.audio.stop();
}

fn get_key(caller: Caller<'_, Binding>) -> i32 {
    caller.data().host.keys.first_held() as i32
}

fn is_pressed(caller: Caller<'_, Binding>, index: i32) -> i32 {
    caller.data().host.keys.is_down(index as u32) as i32
}

fn render(mut caller: Caller<'_, Binding>, screen_ptr: i32) {
    with_memory(&mut caller, |mem, host| {
        match memory::region(mem, screen_ptr as u32, BITMAP_BYTES) {
            Ok(bitmap) => {
                host.screen.decode_from(bitmap);
                host.screen.present();
            }
            Err(err) => tracing::warn!("render: {err}"),
        }
    });
}

struct GuestExports {
    setup: Option<TypedFunc<(), ()>>,
    context_reset: Option<TypedFunc<(), ()>>,
    reset: Option<TypedFunc<i32, ()>>,
    lock_memory_range: Option<TypedFunc<(i32, i32), i32>>,
    unlock_memory_range: Option<TypedFunc<(), ()>>,
    try_step_many: Option<TypedFunc<f64, ()>>,
    step_clocks: Option<TypedFunc<i32, ()>>,
    update: Option<TypedFunc<(), ()>>,
}

impl GuestExports {
    fn resolve(instance: &Instance, store: &mut Store<Binding>) -> Result<Self> {
        Ok(Self {
            setup: typed(instance, store, "setup")?,
            context_reset: typed(instance, store, "context_reset")?,
            reset: typed(instance, store, "reset")?,
            lock_memory_range: typed(instance, store, "lock_memory_range")?,
            unlock_memory_range: typed(instance, store, "unlock_memory_range")?,
            try_step_many: typed(instance, store, "context_try_step_many")?,
            step_clocks: typed(instance, store, "context_step_clocks")?,
            update: typed(instance, store, "update")?,
        })
    }
}

/// An optional export; present with the wrong signature is an error.
fn typed<P: WasmParams, R: WasmResults>(
    instance: &Instance,
    store: &mut Store<Binding>,
    name: &'static str,
) -> Result<Option<TypedFunc<P, R>>> {
    let Some(func) = instance.get_func(&mut *store, name) else {
        return Ok(None);
    };
    func.typed::<P, R>(&*store)
        .map(Some)
        .map_err(|err| BridgeError::ExportSignature {
            name,
            reason: format!("{err:#}"),
        })
}

/// A guest module instantiated against the bridge's imports.
pub struct WasmGuest {
    store: Store<Binding>,
    instance: Instance,
    exports: GuestExports,
    memory_source: MemorySource,
}

impl WasmGuest {
    /// Compile `bytes` (binary, or text format) and instantiate it.
    pub fn load(bytes: impl AsRef<[u8]>, host: HostContext, config: &BridgeConfig) -> Result<Self> {
        let engine = new_engine()?;
        let module = Module::new(&engine, bytes).map_err(BridgeError::Compile)?;
        Self::from_module(&engine, &module, host, config)
    }

    pub fn from_file(
        path: impl AsRef<Path>,
        host: HostContext,
        config: &BridgeConfig,
    ) -> Result<Self> {
        let engine = new_engine()?;
        let module = Module::from_file(&engine, path).map_err(BridgeError::Compile)?;
        Self::from_module(&engine, &module, host, config)
    }

    /// Instantiate an already compiled module.
    ///
    /// Every import is bound before instantiation so that a start function calling back into the
    /// host works. If the guest exports its own `memory`, it supersedes the host-provided one.
    pub fn from_module(
        engine: &Engine,
        module: &Module,
        host: HostContext,
        config: &BridgeConfig,
    ) -> Result<Self> {
        let mut store = Store::new(engine, Binding::new(host));
        let mut linker = Linker::new(engine);

        let memory = Memory::new(&mut store, MemoryType::new(config.memory_pages, None))
            .map_err(BridgeError::Memory)?;
        store.data_mut().memory = Some(memory);
        linker
            .define(&mut store, IMPORT_MEMORY_MODULE, IMPORT_MEMORY, memory)
            .map_err(BridgeError::Link)?;
        define_imports(&mut linker).map_err(BridgeError::Link)?;

        let instance = linker
            .instantiate(&mut store, module)
            .map_err(|err| match err.downcast_ref::<GuestExit>() {
                Some(exit) => BridgeError::Exit { code: exit.code },
                None => BridgeError::Instantiate(err),
            })?;
        store.data_mut().instance = Some(instance);

        let memory_source = match instance.get_memory(&mut store, "memory") {
            Some(own) => {
                store.data_mut().memory = Some(own);
                MemorySource::Guest
            }
            None => MemorySource::Host,
        };

        let exports = GuestExports::resolve(&instance, &mut store)?;
        tracing::debug!(?memory_source, "guest instantiated");
        Ok(Self {
            store,
            instance,
            exports,
            memory_source,
        })
    }

    pub fn instance(&self) -> Instance {
        self.instance
    }

    pub fn memory_source(&self) -> MemorySource {
        self.memory_source
    }

    pub fn store(&self) -> &Store<Binding> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store<Binding> {
        &mut self.store
    }
}

fn new_engine() -> Result<Engine> {
    Engine::new(&Config::new()).map_err(BridgeError::Engine)
}

fn call<P: WasmParams, R: WasmResults>(
    store: &mut Store<Binding>,
    func: Option<&TypedFunc<P, R>>,
    name: &'static str,
    params: P,
) -> Result<R> {
    let func = func.ok_or(BridgeError::MissingExport(name))?;
    func.call(store, params)
        .map_err(BridgeError::from_guest_call)
}

impl Guest for WasmGuest {
    fn setup(&mut self) -> Result<()> {
        let func = self.exports.setup.as_ref();
        call(&mut self.store, func, "setup", ())
    }

    fn reset(&mut self) -> Result<()> {
        let func = self.exports.context_reset.as_ref();
        call(&mut self.store, func, "context_reset", ())
    }

    fn reset_from(&mut self, src: u32) -> Result<()> {
        let func = self.exports.reset.as_ref();
        call(&mut self.store, func, "reset", src as i32)
    }

    fn lock_memory_range(&mut self, start: u32, len: u32) -> Result<u32> {
        let func = self.exports.lock_memory_range.as_ref();
        let ptr = call(
            &mut self.store,
            func,
            "lock_memory_range",
            (start as i32, len as i32),
        )?;
        Ok(ptr as u32)
    }

    fn unlock_memory_range(&mut self) -> Result<()> {
        let func = self.exports.unlock_memory_range.as_ref();
        call(&mut self.store, func, "unlock_memory_range", ())
    }

    fn try_step_many(&mut self, count: f64) -> Result<()> {
        let func = self.exports.try_step_many.as_ref();
        call(&mut self.store, func, "context_try_step_many", count)
    }

    fn step_clocks(&mut self, n: u32) -> Result<()> {
        let func = self.exports.step_clocks.as_ref();
        call(&mut self.store, func, "context_step_clocks", n as i32)
    }

    fn update(&mut self) -> Result<()> {
        let func = self.exports.update.as_ref();
        call(&mut self.store, func, "update", ())
    }

    fn memory(&self) -> &[u8] {
        let memory = self.store.data().memory;
        match memory {
            Some(memory) => memory.data(&self.store),
            None => &[],
        }
    }

    fn memory_and_host(&mut self) -> (&mut [u8], &mut HostContext) {
        let memory = self.store.data().memory;
        match memory {
            Some(memory) => {
                let (mem, binding) = memory.data_and_store_mut(&mut self.store);
                (mem, &mut binding.host)
            }
            None => (&mut [], &mut self.store.data_mut().host),
        }
    }

    fn host(&self) -> &HostContext {
        &self.store.data().host
    }

    fn host_mut(&mut self) -> &mut HostContext {
        &mut self.store.data_mut().host
    }
}

impl std::fmt::Debug for WasmGuest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmGuest")
            .field("memory_source", &self.memory_source)
            .field("host", &self.store.data().host)
            .finish_non_exhaustive()
    }
}
