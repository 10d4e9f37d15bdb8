//! Row shuffling.
//!
//! Seeded shuffles must produce the same permutation as every other client of
//! the platform for the same seed and length, so the generator and the
//! traversal order below are fixed: backward Fisher–Yates driven by an
//! xorshift32 stream reduced to six decimal digits.

use rand::Rng;

/// xorshift32 generator (shifts 13, 17, 5).
#[derive(Debug, Clone)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    /// The seed is reduced modulo 2^32.
    pub fn new(seed: i64) -> Self {
        Self { state: seed as u32 }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut s = self.state;
        s ^= s << 13;
        s ^= s >> 17;
        s ^= s << 5;
        self.state = s;
        s
    }

    /// Next draw in `[0, 1)`, quantised to 1e-6.
    pub fn next_unit(&mut self) -> f64 {
        f64::from(self.next_u32() % 1_000_000) / 1_000_000.0
    }
}

/// Shuffle `items` in place. A `seed` of 0 uses the thread-local generator.
pub fn shuffle<T>(items: &mut [T], seed: i64) {
    if seed == 0 {
        let mut rng = rand::thread_rng();
        fisher_yates(items, || rng.gen::<f64>());
    } else {
        let mut rng = XorShift32::new(seed);
        fisher_yates(items, || rng.next_unit());
    }
}

fn fisher_yates<T>(items: &mut [T], mut draw: impl FnMut() -> f64) {
    for i in (1..items.len()).rev() {
        let j = (draw() * (i + 1) as f64) as usize;
        items.swap(i, j.min(i));
    }
}
