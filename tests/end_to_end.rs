#![cfg(not(target_arch = "wasm32"))]

use std::cell::RefCell;
use std::rc::Rc;

use chip8_bridge::audio::AudioSink;
use chip8_bridge::framebuffer::{DisplaySink, RenderTarget};
use chip8_bridge::scheduler::{self, Cadences, RunOutcome};
use chip8_bridge::{BridgeConfig, Guest, HostContext, Session, WasmGuest};

/// A toy interpreter: each clock step copies the first ROM byte into framebuffer row 0, buzzes
/// while keypad key 0 is held and exits with the second ROM byte on the third step.
const TOY_GUEST: &str = r#"
(module
  (import "chip8" "is_pressed" (func $is_pressed (param i32) (result i32)))
  (import "chip8" "sound_play" (func $sound_play))
  (import "chip8" "sound_stop" (func $sound_stop))
  (import "wasi_snapshot_preview1" "proc_exit" (func $exit (param i32)))
  (memory (export "memory") 1)
  (global $clocks (mut i32) (i32.const 0))

  (func (export "context_reset")
    (memory.fill (i32.const 0x200) (i32.const 0) (i32.const 0xD00))
    (global.set $clocks (i32.const 0)))
  (func (export "lock_memory_range") (param i32 i32) (result i32) (local.get 0))
  (func (export "unlock_memory_range"))
  (func (export "context_try_step_many") (param f64))
  (func (export "context_step_clocks") (param $n i32)
    (global.set $clocks (i32.add (global.get $clocks) (local.get $n)))
    (i32.store8 (i32.const 0xF00) (i32.load8_u (i32.const 0x200)))
    (if (call $is_pressed (i32.const 0))
      (then (call $sound_play))
      (else (call $sound_stop)))
    (if (i32.ge_u (global.get $clocks) (i32.const 3))
      (then (call $exit (i32.load8_u (i32.const 0x201))))))
)
"#;

#[derive(Clone, Default)]
struct Frames(Rc<RefCell<Vec<[bool; 3]>>>);

impl DisplaySink for Frames {
    fn present(&mut self, frame: &RenderTarget) {
        let row = [frame.is_lit(0, 0), frame.is_lit(1, 0), frame.is_lit(2, 0)];
        self.0.borrow_mut().push(row);
    }
}

#[derive(Clone, Default)]
struct Speaker(Rc<RefCell<Vec<f32>>>);

impl AudioSink for Speaker {
    fn push_mono_f32(&mut self, samples: &[f32]) {
        self.0.borrow_mut().extend_from_slice(samples);
    }
}

#[tokio::test(start_paused = true)]
async fn rom_runs_until_the_guest_exits() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let config = BridgeConfig::default();
    let frames = Frames::default();
    let speaker = Speaker::default();
    let host = HostContext::new(&config)
        .with_display(frames.clone())
        .with_audio_sink(speaker.clone());
    let guest = WasmGuest::load(TOY_GUEST, host, &config).unwrap();
    let mut session = Session::new(guest, config.clone()).unwrap();

    assert_eq!(session.open_rom(&[0b0000_0101, 7]).unwrap(), 2);
    session.key_down("KeyX");

    let session = Rc::new(RefCell::new(session));
    let outcome = scheduler::run(session.clone(), Cadences::from_config(&config))
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Exited { code: 7 });
    assert_eq!(session.borrow().exit_code(), Some(7));

    let frames = frames.0.borrow();
    assert!(frames.len() >= 2, "{} frames", frames.len());
    assert_eq!(frames.last(), Some(&[true, false, true]));

    // Two full ticks of tone; the third tick exits before audio is pumped.
    let samples = speaker.0.borrow();
    assert_eq!(samples.len(), 2 * 800);
    assert!(samples.iter().any(|s| s.abs() > 0.1));
}

#[tokio::test(start_paused = true)]
async fn released_keys_silence_the_buzzer() {
    let config = BridgeConfig::default();
    let speaker = Speaker::default();
    let host = HostContext::new(&config).with_audio_sink(speaker.clone());
    let guest = WasmGuest::load(TOY_GUEST, host, &config).unwrap();
    let mut session = Session::new(guest, config).unwrap();
    session.open_rom(&[0, 0]).unwrap();

    session.key_down("KeyX");
    session.tick().unwrap();
    assert!(session.guest().host().audio.is_playing());

    session.key_up("KeyX");
    session.tick().unwrap();
    assert!(!session.guest().host().audio.is_playing());

    let samples = speaker.0.borrow();
    assert_eq!(samples.len(), 2 * 800);
    assert!(samples[800..].iter().all(|&s| s == 0.0));
}
