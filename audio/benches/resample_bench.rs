use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use avkit_audio::pcm::{AudioBuffer, ChannelLayout, SampleFormat};
use avkit_audio::resampler::{AudioResampler, Quality, ResamplerOptions};

fn sine_block(frames: usize, channels: usize, rate: u32) -> Vec<i16> {
    let mut samples = Vec::with_capacity(frames * channels);
    for i in 0..frames {
        let t = i as f64 / rate as f64;
        let s = ((2.0 * std::f64::consts::PI * 440.0 * t).sin() * 10000.0) as i16;
        for _ in 0..channels {
            samples.push(s);
        }
    }
    samples
}

fn open_resampler(
    out_layout: ChannelLayout,
    out_rate: u32,
    in_layout: ChannelLayout,
    in_rate: u32,
    quality: Quality,
) -> AudioResampler {
    let mut rs = AudioResampler::new(
        out_layout,
        out_rate,
        SampleFormat::S16,
        in_layout,
        in_rate,
        SampleFormat::S16,
    )
    .unwrap()
    .with_options(ResamplerOptions::default().with_quality(quality));
    rs.open().unwrap();
    rs
}

/// One second of 44.1kHz stereo to 16kHz mono, fed in 20ms blocks.
fn bench_quality(c: &mut Criterion) {
    let block_frames = 882;
    let block = sine_block(block_frames, 2, 44100);
    let input = AudioBuffer::from_i16(&block, 44100, ChannelLayout::Stereo).unwrap();

    let mut group = c.benchmark_group("resample_44k1_stereo_to_16k_mono");
    for quality in [Quality::Fast, Quality::Normal, Quality::High] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", quality)),
            &quality,
            |b, &quality| {
                let mut rs = open_resampler(
                    ChannelLayout::Mono,
                    16000,
                    ChannelLayout::Stereo,
                    44100,
                    quality,
                );
                let mut out =
                    AudioBuffer::new(4096, 16000, ChannelLayout::Mono, SampleFormat::S16).unwrap();
                b.iter(|| {
                    for _ in 0..50 {
                        black_box(rs.resample(&mut out, Some(black_box(&input))).unwrap());
                    }
                    black_box(rs.resample(&mut out, None).unwrap());
                });
            },
        );
    }
    group.finish();
}

fn bench_passthrough(c: &mut Criterion) {
    let block = sine_block(960, 2, 48000);
    let input = AudioBuffer::from_i16(&block, 48000, ChannelLayout::Stereo).unwrap();
    let mut rs = open_resampler(
        ChannelLayout::Stereo,
        48000,
        ChannelLayout::Stereo,
        48000,
        Quality::Normal,
    );
    let mut out = AudioBuffer::new(960, 48000, ChannelLayout::Stereo, SampleFormat::S16).unwrap();

    c.bench_function("passthrough_48k_stereo_20ms", |b| {
        b.iter(|| black_box(rs.resample(&mut out, Some(black_box(&input))).unwrap()))
    });
}

fn bench_downmix(c: &mut Criterion) {
    let block = sine_block(960, 6, 48000);
    let input = AudioBuffer::from_i16(&block, 48000, ChannelLayout::FivePointOne).unwrap();
    let mut rs = open_resampler(
        ChannelLayout::Stereo,
        48000,
        ChannelLayout::FivePointOne,
        48000,
        Quality::Normal,
    );
    let mut out = AudioBuffer::new(960, 48000, ChannelLayout::Stereo, SampleFormat::S16).unwrap();

    c.bench_function("downmix_5_1_to_stereo_20ms", |b| {
        b.iter(|| black_box(rs.resample(&mut out, Some(black_box(&input))).unwrap()))
    });
}

criterion_group!(benches, bench_quality, bench_passthrough, bench_downmix);
criterion_main!(benches);
