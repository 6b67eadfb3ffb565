//! Navigation bit sources and the (constellation, signal) lookup table.
//!
//! A source is built once at setup and shared read-only by every channel
//! broadcasting that signal. Symbols are ±1 with logical 0 → +1.
//!
//! ```text
//! GPS LNAV   50 bps, 300-bit subframes, 8-bit preamble 10001011
//! GLONASS    10 ms symbols, 2 s strings:
//!            85 data bits as meander pairs (b, -b) | 30-symbol time mark
//! ```

use crate::error::{SynthError, SynthResult};
use crate::signal::{Constellation, SignalKind, SvId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only provider of navigation data symbols.
pub trait NavBitSource: Send + Sync {
    /// Symbol (+1 or -1) at `index` for `sv`, where symbol `k` covers
    /// `[k·period, (k+1)·period)` milliseconds from the start of the run.
    fn bit_at(&self, sv: SvId, index: u64) -> i8;

    /// Symbol duration in milliseconds.
    fn bit_period_ms(&self) -> u32;
}

const LNAV_PREAMBLE: u32 = 0b1000_1011;
const LNAV_SUBFRAME_BITS: usize = 300;
const LNAV_SUBFRAMES: usize = 5;
const GLONASS_TIME_MARK: u32 = 0x3E37_5096;
const GLONASS_DATA_BITS: usize = 85;
const GLONASS_STRINGS: usize = 15;

#[inline]
fn symbol(bit: u32) -> i8 {
    if bit == 0 {
        1
    } else {
        -1
    }
}

/// Most significant `len` bits of `word` as symbols.
fn word_symbols(word: u32, len: u32) -> impl Iterator<Item = i8> {
    (0..len).rev().map(move |i| symbol((word >> i) & 1))
}

/// Cyclic per-SV symbol tables generated deterministically from a seed.
#[derive(Debug, Clone)]
pub struct FramedNavBits {
    period_ms: u32,
    /// Indexed by SV number; index 0 doubles as the fallback table.
    tables: Vec<Vec<i8>>,
}

impl FramedNavBits {
    /// GPS LNAV-shaped stream for PRN 1-32.
    pub fn gps_lnav(seed: u64) -> Self {
        let tables = (0..=32u64)
            .map(|prn| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed ^ (prn << 32));
                let mut bits = Vec::with_capacity(LNAV_SUBFRAME_BITS * LNAV_SUBFRAMES);
                for _ in 0..LNAV_SUBFRAMES {
                    bits.extend(word_symbols(LNAV_PREAMBLE, 8));
                    bits.extend((8..LNAV_SUBFRAME_BITS).map(|_| symbol(rng.gen_range(0..2))));
                }
                bits
            })
            .collect();
        Self {
            period_ms: 20,
            tables,
        }
    }

    /// GLONASS-shaped stream for slots 1-24.
    pub fn glonass(seed: u64) -> Self {
        let tables = (0..=24u64)
            .map(|slot| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed ^ (slot << 40) ^ 0x6C0);
                let mut symbols = Vec::with_capacity(200 * GLONASS_STRINGS);
                for _ in 0..GLONASS_STRINGS {
                    for _ in 0..GLONASS_DATA_BITS {
                        let b = symbol(rng.gen_range(0..2));
                        symbols.push(b);
                        symbols.push(-b);
                    }
                    symbols.extend(word_symbols(GLONASS_TIME_MARK, 30));
                }
                symbols
            })
            .collect();
        Self {
            period_ms: 10,
            tables,
        }
    }

    /// Symbols per repetition of the table.
    pub fn cycle_len(&self) -> usize {
        self.tables.first().map_or(0, Vec::len)
    }
}

impl NavBitSource for FramedNavBits {
    fn bit_at(&self, sv: SvId, index: u64) -> i8 {
        let table = self
            .tables
            .get(sv.number as usize)
            .or_else(|| self.tables.first());
        match table {
            Some(t) if !t.is_empty() => t[(index % t.len() as u64) as usize],
            _ => 1,
        }
    }

    fn bit_period_ms(&self) -> u32 {
        self.period_ms
    }
}

/// Lookup from (constellation, signal) to the shared bit source.
#[derive(Clone, Default)]
pub struct NavBitTable {
    sources: HashMap<(Constellation, SignalKind), Arc<dyn NavBitSource>>,
}

impl std::fmt::Debug for NavBitTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.sources.keys().collect();
        keys.sort();
        f.debug_struct("NavBitTable").field("signals", &keys).finish()
    }
}

impl NavBitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with sources for every signal that has a channel generator.
    pub fn standard(seed: u64) -> Self {
        let mut table = Self::new();
        table.insert(SignalKind::GpsL1Ca, Arc::new(FramedNavBits::gps_lnav(seed)));
        table.insert(SignalKind::GlonassG1, Arc::new(FramedNavBits::glonass(seed)));
        table
    }

    /// Register (or replace) the source for a signal.
    pub fn insert(&mut self, signal: SignalKind, source: Arc<dyn NavBitSource>) {
        self.sources.insert((signal.constellation(), signal), source);
    }

    /// Shared handle for a signal.
    pub fn lookup(&self, signal: SignalKind) -> SynthResult<Arc<dyn NavBitSource>> {
        let key = (signal.constellation(), signal);
        self.sources
            .get(&key)
            .cloned()
            .ok_or(SynthError::NavSourceMissing {
                constellation: key.0,
                signal,
            })
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
