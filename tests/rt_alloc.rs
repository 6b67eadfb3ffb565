use ifsynth::navbits::FramedNavBits;
use ifsynth::signal::{ChannelSpec, SignalKind, SvId};
use ifsynth::{
    ChannelGenerator, EpochTime, GaussianNoise, IfChannel, IqSample, NoiseSource, PhysicalParams,
    Quantization,
};
use std::alloc::{GlobalAlloc, Layout};
use std::cell::Cell;
use std::sync::Arc;

thread_local! {
    static ALLOC_COUNT: Cell<usize> = const { Cell::new(0) };
}

struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOC_COUNT.with(|c| c.set(c.get() + 1));
        unsafe { std::alloc::System.alloc(layout) }
    }
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { std::alloc::System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static A: CountingAllocator = CountingAllocator;

fn allocations() -> usize {
    ALLOC_COUNT.with(|c| c.get())
}

#[test]
fn steady_state_epoch_does_not_allocate() {
    const SPE: usize = 4092;
    let mut channel = IfChannel::new(
        ChannelSpec::new(SvId::gps(12), SignalKind::GpsL1Ca, 1_023_000.0),
        4_092_000.0,
        1.0,
    )
    .unwrap();
    channel
        .initialize(
            EpochTime::start(),
            &PhysicalParams::new(2500.0, 47.0),
            Arc::new(FramedNavBits::gps_lnav(5)),
        )
        .unwrap();
    let mut noise = GaussianNoise::new(1.0, 9);
    let mut acc = vec![IqSample::new(0.0, 0.0); SPE];
    let mut buffer = vec![IqSample::new(0.0, 0.0); SPE];
    let mut encoded = Vec::with_capacity(SPE * 4);

    let after_setup = allocations();
    let mut time = EpochTime::start();
    for _ in 0..200 {
        channel.update(&PhysicalParams::new(2500.0, 47.0));
        channel.generate_epoch(time, &mut buffer);
        noise.fill(&mut acc);
        for (a, s) in acc.iter_mut().zip(&buffer) {
            *a += *s;
        }
        for q in [Quantization::Iq4, Quantization::Iq8, Quantization::Iq16] {
            q.quantize(&acc, 0.8, &mut encoded);
        }
        time = time.next();
    }
    assert_eq!(
        allocations(),
        after_setup,
        "generate, noise and quantize must not allocate"
    );
}
