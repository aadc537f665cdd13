mod common;

use chip8_bridge::rom::{open_rom, ProgramRegion, MAX_ROM_BYTES};
use chip8_bridge::{BridgeConfig, BridgeError, ResetStyle, Session};
use common::FakeGuest;

fn rom(len: usize, fill: u8) -> Vec<u8> {
    vec![fill; len]
}

#[test]
fn max_size_rom_fills_the_program_region() {
    let mut guest = FakeGuest::new();
    let bytes: Vec<u8> = (0..MAX_ROM_BYTES).map(|i| i as u8).collect();
    let copied = open_rom(
        &mut guest,
        ProgramRegion::CHIP8,
        ResetStyle::ContextReset,
        &bytes,
    )
    .unwrap();
    assert_eq!(copied, MAX_ROM_BYTES);
    assert_eq!(guest.program(), &bytes[..]);
    assert_eq!(guest.calls, ["reset", "lock", "unlock"]);
    assert_eq!(guest.locked, None);
}

#[test]
fn oversized_rom_touches_nothing() {
    let mut guest = FakeGuest::new();
    guest.logical_mut(0x200, 4).copy_from_slice(&[1, 2, 3, 4]);
    let before = guest.mem.clone();

    let err = open_rom(
        &mut guest,
        ProgramRegion::CHIP8,
        ResetStyle::ContextReset,
        &rom(MAX_ROM_BYTES + 1, 0xAA),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        BridgeError::RomTooLarge {
            len: 0xD01,
            max: 0xD00
        }
    ));
    assert!(guest.calls.is_empty(), "guest was called: {:?}", guest.calls);
    assert_eq!(guest.mem, before);
}

#[test]
fn oversized_rom_is_rejected_for_source_pointer_resets_too() {
    let mut guest = FakeGuest::new();
    let err = open_rom(
        &mut guest,
        ProgramRegion::CHIP8,
        ResetStyle::SourcePointer,
        &rom(0x1000, 0xAA),
    )
    .unwrap_err();
    assert!(matches!(err, BridgeError::RomTooLarge { .. }));
    assert!(guest.calls.is_empty());
}

#[test]
fn wide_region_still_caps_the_rom_size() {
    let mut guest = FakeGuest::new();
    let before = guest.mem.clone();
    let region = ProgramRegion {
        start: 0x200,
        end: 0x1000,
    };

    let err = open_rom(
        &mut guest,
        region,
        ResetStyle::ContextReset,
        &rom(MAX_ROM_BYTES + 1, 0xAA),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        BridgeError::RomTooLarge {
            len: 0xD01,
            max: 0xD00
        }
    ));
    assert!(guest.calls.is_empty());
    assert_eq!(guest.mem, before);
}

#[test]
fn session_refuses_a_program_region_over_the_framebuffer() {
    let config = BridgeConfig {
        program_end: 0x1000,
        ..BridgeConfig::default()
    };
    let Err(err) = Session::new(FakeGuest::new(), config) else {
        panic!("overlapping program region was accepted");
    };
    assert!(matches!(err, BridgeError::InvalidConfig(_)), "{err}");
}

#[test]
fn short_rom_after_long_rom_leaves_no_stale_tail_when_reset_clears() {
    let mut guest = FakeGuest::new();
    let region = ProgramRegion::CHIP8;
    open_rom(&mut guest, region, ResetStyle::ContextReset, &rom(0x400, 0xAA)).unwrap();
    open_rom(&mut guest, region, ResetStyle::ContextReset, &rom(0x10, 0xBB)).unwrap();

    let program = guest.program();
    assert!(program[..0x10].iter().all(|b| *b == 0xBB));
    assert!(program[0x10..].iter().all(|b| *b == 0));
}

#[test]
fn context_reset_copy_does_not_clear_the_tail_itself() {
    let mut guest = FakeGuest::new();
    guest.zero_on_reset = false;
    let region = ProgramRegion::CHIP8;
    open_rom(&mut guest, region, ResetStyle::ContextReset, &rom(0x20, 0xAA)).unwrap();
    open_rom(&mut guest, region, ResetStyle::ContextReset, &rom(0x10, 0xBB)).unwrap();

    let program = guest.program();
    assert!(program[..0x10].iter().all(|b| *b == 0xBB));
    // Whatever the reset left behind stays.
    assert!(program[0x10..0x20].iter().all(|b| *b == 0xAA));
}

#[test]
fn source_pointer_zeroes_the_tail_and_resets_while_locked() {
    let mut guest = FakeGuest::new().relocated(0x4000);
    guest.zero_on_reset = false;
    let region = ProgramRegion::CHIP8;
    guest.logical_mut(region.start, region.len()).fill(0xEE);

    let copied = open_rom(&mut guest, region, ResetStyle::SourcePointer, &[1, 2, 3]).unwrap();

    assert_eq!(copied, 3);
    assert_eq!(guest.calls, ["lock", "reset_from", "unlock"]);
    assert_eq!(guest.reset_sources, [0x4200]);
    let program = guest.program();
    assert_eq!(&program[..3], &[1, 2, 3]);
    assert!(program[3..].iter().all(|b| *b == 0));
}

#[test]
fn copy_lands_at_the_locked_pointer() {
    let mut guest = FakeGuest::new().relocated(0x8000);
    open_rom(
        &mut guest,
        ProgramRegion::CHIP8,
        ResetStyle::ContextReset,
        &[0x00, 0xE0],
    )
    .unwrap();
    assert_eq!(guest.logical(0x200, 2), &[0x00, 0xE0]);
    assert_eq!(&guest.mem[0x200..0x202], &[0, 0]);
}

#[test]
fn empty_rom_is_accepted() {
    let mut guest = FakeGuest::new();
    let copied = open_rom(
        &mut guest,
        ProgramRegion::CHIP8,
        ResetStyle::ContextReset,
        &[],
    )
    .unwrap();
    assert_eq!(copied, 0);
    assert_eq!(guest.lock_calls, guest.unlock_calls);
}
