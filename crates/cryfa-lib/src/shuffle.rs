//! Deterministic per-chunk byte permutation keyed by the password.
//!
//! The seed construction is part of the byte contract: a product/sum
//! walk over the password bytes through a minstd LCG yields a 32-bit
//! seed, which drives a Mersenne Twister for the Fisher–Yates swaps.
//! Every chunk of a given length receives the same permutation; the
//! cipher envelope, not the shuffle, supplies confidentiality.

use rand_core::RngCore;
use rand_mt::Mt19937GenRand32;

/// Minimal standard LCG (Lehmer / minstd): `state ← state·16807 mod 2³¹−1`.
///
/// Stands in for the C `srand`/`rand` pair behind the seed and key
/// derivations. State zero would be a fixed point, so seeding
/// normalizes into `[1, 2³¹−2]`.
#[derive(Clone, Debug)]
pub(crate) struct MinStd {
    state: u64,
}

const MINSTD_MODULUS: u64 = 0x7FFF_FFFF;

impl MinStd {
    pub(crate) fn new(seed: u64) -> MinStd {
        let mut state = seed % MINSTD_MODULUS;
        if state == 0 {
            state = 1;
        }
        MinStd { state }
    }

    pub(crate) fn next(&mut self) -> u32 {
        self.state = self.state * 16807 % MINSTD_MODULUS;
        self.state as u32
    }
}

/// Derive the 32-bit shuffle seed from the password.
pub fn seed_from_password(password: &[u8]) -> u32 {
    let m = password
        .iter()
        .fold(1u64, |acc, &b| acc.wrapping_mul(u64::from(b)));
    let mut lcg = MinStd::new(20543u64.wrapping_mul(m).wrapping_add(81647));
    let mut seed = 0u64;
    for &b in password {
        seed = seed.wrapping_add(u64::from(b).wrapping_mul(u64::from(lcg.next())));
    }
    (seed % 0xFFFF_FFFF) as u32
}

/// The sequence of Fisher–Yates swap targets for a buffer of `len` bytes,
/// highest index first.
fn swap_targets(seed: u32, len: usize) -> Vec<usize> {
    let mut rng = Mt19937GenRand32::new(seed);
    (1..len)
        .rev()
        .map(|i| rng.next_u32() as usize % (i + 1))
        .collect()
}

/// Permute `data` in place.
pub fn shuffle(data: &mut [u8], seed: u32) {
    let mut rng = Mt19937GenRand32::new(seed);
    for i in (1..data.len()).rev() {
        let j = rng.next_u32() as usize % (i + 1);
        data.swap(i, j);
    }
}

/// Invert [`shuffle`]: replay the same swaps in reverse order.
pub fn unshuffle(data: &mut [u8], seed: u32) {
    let targets = swap_targets(seed, data.len());
    for (i, &j) in (1..data.len()).rev().zip(targets.iter()).rev() {
        data.swap(i, j);
    }
}
