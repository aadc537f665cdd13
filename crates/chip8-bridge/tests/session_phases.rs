mod common;

use std::cell::RefCell;
use std::rc::Rc;

use chip8_bridge::audio::AudioSink;
use chip8_bridge::{BridgeConfig, BridgeError, HostContext, Session, StepMode};
use common::FakeGuest;

fn session(config: BridgeConfig) -> Session<FakeGuest> {
    Session::new(FakeGuest::with_config(&config), config).unwrap()
}

#[test]
fn tick_requests_fractional_steps_then_one_clock_step() {
    let mut session = session(BridgeConfig::default());
    session.tick().unwrap();
    let guest = session.guest();
    assert_eq!(guest.calls, ["step_many", "step_clocks"]);
    assert!((guest.steps_requested - 500.0 / 60.0).abs() < 1e-12);
    assert_eq!(guest.clock_steps, 1);
}

#[test]
fn six_ticks_average_out_to_fifty_instructions() {
    let mut session = session(BridgeConfig::default());
    for _ in 0..6 {
        session.tick().unwrap();
    }
    let guest = session.guest();
    assert!((guest.steps_requested - 50.0).abs() < 1e-9, "{}", guest.steps_requested);
    assert_eq!(guest.steps_executed, 50);
    assert_eq!(guest.clock_steps, 6);
}

#[test]
fn update_mode_makes_one_call_per_tick() {
    let mut session = session(BridgeConfig {
        step_mode: StepMode::Update,
        ..BridgeConfig::default()
    });
    session.tick().unwrap();
    session.tick().unwrap();
    let guest = session.guest();
    assert_eq!(guest.calls, ["update", "update"]);
    assert_eq!(guest.steps_requested, 0.0);
}

#[test]
fn tick_surfaces_guest_exit() {
    let mut session = session(BridgeConfig::default());
    session.guest_mut().exit_on_tick = Some((1, 3));
    let err = session.tick().unwrap_err();
    assert_eq!(err.exit_code(), Some(3));
    assert_eq!(session.exit_code(), Some(3));
    assert!(session.shutdown_token().is_cancelled());
}

#[test]
fn key_events_update_the_keypad() {
    let mut session = session(BridgeConfig::default());
    session.key_down("KeyQ");
    session.key_down("KeyE");
    assert_eq!(session.guest().host.keys.first_held(), 0x4);
    session.key_up("KeyQ");
    assert_eq!(session.guest().host.keys.first_held(), 0x6);
    session.focus_lost();
    assert_eq!(session.guest().host.keys.is_down(0x6), 0);
}

#[derive(Clone, Default)]
struct SampleCount(Rc<RefCell<usize>>);

impl AudioSink for SampleCount {
    fn push_mono_f32(&mut self, samples: &[f32]) {
        *self.0.borrow_mut() += samples.len();
    }
}

#[test]
fn first_key_press_unlocks_audio_and_ticks_pump_samples() {
    let config = BridgeConfig::default();
    let count = SampleCount::default();
    let host = HostContext::new(&config).with_audio_sink(count.clone());
    let mut session = Session::new(FakeGuest::with_host(host), config).unwrap();

    session.tick().unwrap();
    assert_eq!(*count.0.borrow(), 0, "output is suspended before a gesture");
    assert!(!session.guest().host.audio.is_running());

    session.key_down("Digit1");
    assert!(session.guest().host.audio.is_running());
    for _ in 0..60 {
        session.tick().unwrap();
    }
    assert_eq!(*count.0.borrow(), 48_000);
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let config = BridgeConfig {
        refresh_hz: 0,
        ..BridgeConfig::default()
    };
    let err = Session::new(FakeGuest::new(), config).err().unwrap();
    assert!(matches!(err, BridgeError::InvalidConfig(_)));
}
