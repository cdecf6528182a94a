//! The subtractive instrument mode: white noise through per-note band-pass
//! resonators.
//!
//! This cannot be a plain voice because one channel sustains many
//! simultaneous filtered-noise notes, each with its own filter state and
//! envelope. The whole set renders behind a single proc slot; sub-voice
//! storage grows at note time, never inside `update`.

use biquad::{Biquad, Coefficients, DirectForm1};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::envelope::{Envelope, EnvelopeConfig};
use crate::helpers::FREQS;
use crate::proc::Processor;
use crate::UPDATE_CHUNK;

struct SubVoice {
    stage1: DirectForm1<f32>,
    stage2: DirectForm1<f32>,
    level: Envelope,
}

pub(crate) struct SubSynth {
    level: EnvelopeConfig,
    width1: f32, // Hz
    width2: f32, // Hz
    sample_rate: u32,
    rng: SmallRng,
    noise: Vec<f32>,
    voices: Vec<SubVoice>,
    releasing: bool,
}

impl SubSynth {
    pub(crate) fn new(
        sample_rate: u32,
        width1: u16,
        width2: u16,
        gain: u8,
        mut level: EnvelopeConfig,
        trim: f32,
        seed: u64,
    ) -> Self {
        // The resonators attenuate heavily; the gain constant makes up for
        // it, and per-sample clamping catches the hot spots.
        level.gain(gain as f32);
        level.gain(trim);
        SubSynth {
            level,
            width1: width1 as f32,
            width2: width2 as f32,
            sample_rate,
            rng: SmallRng::seed_from_u64(seed),
            noise: vec![0.0; UPDATE_CHUNK],
            voices: Vec::new(),
            releasing: false,
        }
    }

    /* Coefficients for a 3-point IIR band-pass resonator.
     * Reference:
     *   Steven W Smith: The Scientist and Engineer's Guide to Digital
     *   Signal Processing, Ch 19, p 326, Equation 19-7
     */
    fn resonator(&self, center_norm: f32, width_hz: f32) -> Coefficients<f32> {
        let wnorm = width_hz / self.sample_rate as f32;
        let r = 1.0 - 3.0 * wnorm;
        let cosf = (std::f32::consts::TAU * center_norm).cos();
        let k = (1.0 - 2.0 * r * cosf + r * r) / (2.0 - 2.0 * cosf);
        Coefficients {
            a1: -2.0 * r * cosf,
            a2: r * r,
            b0: 1.0 - k,
            b1: 2.0 * (k - r) * cosf,
            b2: r * r - k,
        }
    }
}

impl Processor for SubSynth {
    fn update(&mut self, buf: &mut [f32]) {
        if self.voices.is_empty() {
            return;
        }

        let n = buf.len().min(self.noise.len());
        for sample in self.noise[..n].iter_mut() {
            *sample = self.rng.gen::<f32>() * 2.0 - 1.0;
        }

        for voice in self.voices.iter_mut() {
            for (v, &x) in buf[..n].iter_mut().zip(&self.noise[..n]) {
                let filtered = voice
                    .stage2
                    .run(voice.stage1.run(x))
                    .clamp(-1.0, 1.0);
                *v += (filtered * voice.level.next()).clamp(-1.0, 1.0);
            }
        }

        // Finished sub-voices retire from the tail; stragglers in the
        // middle stay silent until the tail catches up to them.
        while self
            .voices
            .last()
            .map_or(false, |v| v.level.is_finished())
        {
            self.voices.pop();
        }
    }

    fn note(&mut self, noteid: u8, velocity: u8, dur_frames: i32) {
        if noteid >= 0x80 {
            return;
        }
        let center_norm = FREQS[noteid as usize] / self.sample_rate as f32;
        let mut level = Envelope::init(&self.level, velocity);
        level.set_sustain(dur_frames);
        let voice = SubVoice {
            stage1: DirectForm1::<f32>::new(self.resonator(center_norm, self.width1)),
            stage2: DirectForm1::<f32>::new(self.resonator(center_norm, self.width2)),
            level,
        };
        // Reuse a finished slot before growing the list.
        if let Some(slot) = self.voices.iter_mut().find(|v| v.level.is_finished()) {
            *slot = voice;
        } else {
            self.voices.push(voice);
        }
    }

    fn release(&mut self) {
        self.releasing = true;
        for voice in self.voices.iter_mut() {
            voice.level.release();
        }
    }

    fn finished(&self) -> bool {
        self.releasing && self.voices.iter().all(|v| v.level.is_finished())
    }
}
