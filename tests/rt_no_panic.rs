use ifsynth::harness::FixedGenerator;
use ifsynth::rt::WorkerPool;
use ifsynth::{ChannelGenerator, EpochTime, IqSample, Quantization};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn pool_survives_arbitrary_shapes(
        channels in 1usize..12,
        spe in 1usize..64,
        epochs in 0u64..20,
        value in -100.0f64..100.0,
    ) {
        let generators: Vec<Box<dyn ChannelGenerator>> = (0..channels)
            .map(|_| Box::new(FixedGenerator::constant("fx", IqSample::new(value, -value), spe)) as Box<dyn ChannelGenerator>)
            .collect();
        let mut pool = WorkerPool::start(generators, spe).unwrap();
        let mut acc = vec![IqSample::new(0.0, 0.0); spe];
        let mut time = EpochTime::start();
        for _ in 0..epochs {
            acc.fill(IqSample::new(0.0, 0.0));
            pool.run_epoch(time).unwrap();
            prop_assert_eq!(pool.accumulate_into(&mut acc).unwrap(), channels);
            time = time.next();
        }
        prop_assert_eq!(pool.drain_completions(), channels * epochs as usize);
        prop_assert_eq!(pool.shutdown().unwrap(), channels);
    }

    #[test]
    fn quantizer_total_for_finite_input(
        samples in prop::collection::vec((-1e6f64..1e6, -1e6f64..1e6), 0..128),
        gain in 1e-3f64..1.0,
    ) {
        let samples: Vec<IqSample> = samples.into_iter().map(|(r, i)| IqSample::new(r, i)).collect();
        for q in [Quantization::Iq4, Quantization::Iq8, Quantization::Iq16] {
            let mut out = Vec::new();
            let clipped = q.quantize(&samples, gain, &mut out);
            prop_assert!(clipped <= 2 * samples.len());
            prop_assert_eq!(out.len(), samples.len() * q.bytes_per_sample());
        }
    }
}
