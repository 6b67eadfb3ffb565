use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ifsynth::navbits::FramedNavBits;
use ifsynth::rt::WorkerPool;
use ifsynth::signal::{ChannelSpec, SignalKind, SvId};
use ifsynth::{
    ChannelGenerator, EpochTime, GaussianNoise, IfChannel, IqSample, NoiseSource, PhysicalParams,
    Quantization,
};
use std::sync::Arc;

const FS: f64 = 4_092_000.0;
const SPE: usize = 4092;

fn bench_quantize(c: &mut Criterion) {
    let mut noise = GaussianNoise::new(1.0, 1);
    let mut samples = vec![IqSample::new(0.0, 0.0); SPE];
    noise.fill(&mut samples);
    let mut out = Vec::with_capacity(SPE * 4);

    for q in [Quantization::Iq4, Quantization::Iq8, Quantization::Iq16] {
        c.bench_function(&format!("quantize_{}bit_4092", q.bits()), |b| {
            b.iter(|| {
                let clipped = q.quantize(black_box(&samples), 0.9, &mut out);
                black_box((clipped, &out));
            })
        });
    }
}

fn bench_noise(c: &mut Criterion) {
    let mut noise = GaussianNoise::new(1.0, 2);
    let mut buf = vec![IqSample::new(0.0, 0.0); SPE];
    c.bench_function("noise_fill_4092", |b| {
        b.iter(|| {
            noise.fill(black_box(&mut buf));
        })
    });
}

fn gps_channels(n: usize) -> Vec<Box<dyn ChannelGenerator>> {
    let nav = Arc::new(FramedNavBits::gps_lnav(0));
    (0..n)
        .map(|k| {
            let spec = ChannelSpec::new(SvId::gps(k as u8 + 1), SignalKind::GpsL1Ca, FS / 4.0);
            let mut ch = IfChannel::new(spec, FS, 1.0).unwrap();
            ch.initialize(EpochTime::start(), &PhysicalParams::new(1000.0 * k as f64, 45.0), nav.clone())
                .unwrap();
            Box::new(ch) as Box<dyn ChannelGenerator>
        })
        .collect()
}

fn bench_epoch(c: &mut Criterion) {
    let mut pool = WorkerPool::start(gps_channels(8), SPE).unwrap();
    let mut acc = vec![IqSample::new(0.0, 0.0); SPE];
    let mut time = EpochTime::start();

    c.bench_function("epoch_8ch_4092", |b| {
        b.iter(|| {
            pool.run_epoch(time).unwrap();
            pool.accumulate_into(black_box(&mut acc)).unwrap();
            pool.drain_completions();
            time = time.next();
        })
    });
    pool.shutdown().unwrap();
}

criterion_group!(benches, bench_quantize, bench_noise, bench_epoch);
criterion_main!(benches);
