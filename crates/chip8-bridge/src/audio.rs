//! Single-tone beeper.
//!
//! CHIP-8 has one sound: a buzzer that is either on or off. The guest drives it with
//! `sound_play`/`sound_stop`; the host turns that into a fixed-frequency oscillator whose samples
//! are pumped into an [`AudioSink`] once per tick.
//!
//! Output starts suspended, mirroring hosts that refuse to play sound before a user gesture.
//! [`AudioBridge::resume`] is called on the first gesture; until then samples are dropped but
//! tone state is still tracked.

use std::f32::consts::TAU;

/// Sink for mono `f32` samples in `[-1.0, 1.0]`.
pub trait AudioSink {
    fn push_mono_f32(&mut self, samples: &[f32]);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn push_mono_f32(&mut self, _samples: &[f32]) {}
}

impl AudioSink for Vec<f32> {
    fn push_mono_f32(&mut self, samples: &[f32]) {
        self.extend_from_slice(samples);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
}

#[derive(Clone, Debug)]
pub struct Oscillator {
    waveform: Waveform,
    frequency_hz: f32,
    sample_rate_hz: u32,
    /// Phase in cycles, `[0, 1)`.
    phase: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency_hz: f32, sample_rate_hz: u32) -> Self {
        Self {
            waveform,
            frequency_hz,
            sample_rate_hz,
            phase: 0.0,
        }
    }

    pub fn frequency_hz(&self) -> f32 {
        self.frequency_hz
    }

    pub fn fill(&mut self, out: &mut [f32]) {
        let step = self.frequency_hz / self.sample_rate_hz as f32;
        for sample in out {
            *sample = match self.waveform {
                Waveform::Sine => (self.phase * TAU).sin(),
                Waveform::Square => {
                    if self.phase < 0.5 {
                        1.0
                    } else {
                        -1.0
                    }
                }
            };
            self.phase = (self.phase + step).fract();
        }
    }
}

/// Splits a sample rate into whole per-tick frame counts, carrying the remainder.
#[derive(Clone, Copy, Debug)]
pub struct FrameBudget {
    sample_rate_hz: u32,
    ticks_per_second: u32,
    remainder: u32,
}

impl FrameBudget {
    pub fn new(sample_rate_hz: u32, ticks_per_second: u32) -> Self {
        Self {
            sample_rate_hz,
            ticks_per_second: ticks_per_second.max(1),
            remainder: 0,
        }
    }

    /// Frames owed for the next tick.
    pub fn next_tick(&mut self) -> usize {
        let total = self.remainder + self.sample_rate_hz;
        self.remainder = total % self.ticks_per_second;
        (total / self.ticks_per_second) as usize
    }
}

pub struct AudioBridge {
    sink: Box<dyn AudioSink>,
    tone: Option<Oscillator>,
    waveform: Waveform,
    tone_hz: f32,
    sample_rate_hz: u32,
    running: bool,
    scratch: Vec<f32>,
}

impl AudioBridge {
    pub fn new(sink: Box<dyn AudioSink>, tone_hz: f32, sample_rate_hz: u32) -> Self {
        Self {
            sink,
            tone: None,
            waveform: Waveform::Sine,
            tone_hz,
            sample_rate_hz,
            running: false,
            scratch: Vec::new(),
        }
    }

    pub fn set_sink(&mut self, sink: Box<dyn AudioSink>) {
        self.sink = sink;
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Start the tone. No-op if it is already playing.
    pub fn start(&mut self) {
        if self.tone.is_some() {
            return;
        }
        tracing::trace!(hz = self.tone_hz, "tone on");
        self.tone = Some(Oscillator::new(
            self.waveform,
            self.tone_hz,
            self.sample_rate_hz,
        ));
    }

    /// Stop and drop the tone. No-op if none is playing.
    pub fn stop(&mut self) {
        if self.tone.take().is_some() {
            tracing::trace!("tone off");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.tone.is_some()
    }

    /// Unsuspend output. Returns `true` only on the call that actually resumed it.
    pub fn resume(&mut self) -> bool {
        if self.running {
            return false;
        }
        tracing::debug!("audio output resumed");
        self.running = true;
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Render `frames` samples of the tone (or silence) into the sink.
    pub fn pump(&mut self, frames: usize) {
        if !self.running || frames == 0 {
            return;
        }
        self.scratch.clear();
        self.scratch.resize(frames, 0.0);
        if let Some(tone) = self.tone.as_mut() {
            tone.fill(&mut self.scratch);
        }
        self.sink.push_mono_f32(&self.scratch);
    }
}

impl std::fmt::Debug for AudioBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioBridge")
            .field("playing", &self.is_playing())
            .field("running", &self.running)
            .field("tone_hz", &self.tone_hz)
            .field("sample_rate_hz", &self.sample_rate_hz)
            .finish_non_exhaustive()
    }
}
