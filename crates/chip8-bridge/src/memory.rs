//! Bounds-checked accessors for guest linear memory.
//!
//! Host views into guest memory are only valid until the next guest call that may grow or
//! relocate it, so these helpers operate on a borrowed slice for the duration of one access and
//! never hand out anything that outlives it.

use thiserror::Error;

/// Size of one WebAssembly page.
pub const WASM_PAGE_SIZE: usize = 65_536;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("out of bounds: ptr=0x{ptr:x} len={len} memory={memory}")]
pub struct OutOfBounds {
    pub ptr: u64,
    pub len: usize,
    pub memory: usize,
}

fn span(mem_len: usize, ptr: u32, len: usize) -> Result<std::ops::Range<usize>, OutOfBounds> {
    let start = ptr as usize;
    start
        .checked_add(len)
        .filter(|end| *end <= mem_len)
        .map(|end| start..end)
        .ok_or(OutOfBounds {
            ptr: u64::from(ptr),
            len,
            memory: mem_len,
        })
}

pub fn region(mem: &[u8], ptr: u32, len: usize) -> Result<&[u8], OutOfBounds> {
    let range = span(mem.len(), ptr, len)?;
    Ok(&mem[range])
}

pub fn region_mut(mem: &mut [u8], ptr: u32, len: usize) -> Result<&mut [u8], OutOfBounds> {
    let range = span(mem.len(), ptr, len)?;
    Ok(&mut mem[range])
}

/// Like [`region`], but truncates to whatever part of the range is in bounds.
pub fn clamped(mem: &[u8], ptr: u32, len: usize) -> &[u8] {
    let start = (ptr as usize).min(mem.len());
    let end = start.saturating_add(len).min(mem.len());
    &mem[start..end]
}

pub fn write_u16_le(mem: &mut [u8], ptr: u32, value: u16) -> Result<(), OutOfBounds> {
    region_mut(mem, ptr, 2)?.copy_from_slice(&value.to_le_bytes());
    Ok(())
}

pub fn write_u32_le(mem: &mut [u8], ptr: u32, value: u32) -> Result<(), OutOfBounds> {
    region_mut(mem, ptr, 4)?.copy_from_slice(&value.to_le_bytes());
    Ok(())
}

pub fn write_u64_le(mem: &mut [u8], ptr: u32, value: u64) -> Result<(), OutOfBounds> {
    region_mut(mem, ptr, 8)?.copy_from_slice(&value.to_le_bytes());
    Ok(())
}

pub fn read_u64_le(mem: &[u8], ptr: u32) -> Result<u64, OutOfBounds> {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(region(mem, ptr, 8)?);
    Ok(u64::from_le_bytes(bytes))
}
