use criterion::{criterion_group, criterion_main, Criterion};

use bleep_core::{AudioStreamParams, Synth};

fn full_voice_pool(c: &mut Criterion) {
    c.bench_function("render one second, full voice pool", |f| {
        f.iter(|| {
            let mut synth = Synth::new(AudioStreamParams::new(48000, 2), None).unwrap();
            for noteid in 0..16u8 {
                synth.channel_event(0, 0x90, 40 + noteid, 100);
            }
            let mut buffer = vec![0.0f32; 48000 * 2];
            synth.read_samples_f32(&mut buffer);
            buffer
        })
    });
}

fn quantized_output(c: &mut Criterion) {
    c.bench_function("render one second, i16 output", |f| {
        f.iter(|| {
            let mut synth = Synth::new(AudioStreamParams::new(48000, 2), None).unwrap();
            for noteid in 0..8u8 {
                synth.channel_event(0, 0x90, 52 + noteid, 120);
            }
            let mut buffer = vec![0i16; 48000 * 2];
            synth.read_samples_i16(&mut buffer);
            buffer
        })
    });
}

criterion_group!(benches, full_voice_pool, quantized_output);
criterion_main!(benches);
