//! Deterministic random number generation utilities.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// A seed for deterministic random number generation.
///
/// A training run owns exactly one seed. Every random stream the run needs
/// (parameter initialization, input noise, per-epoch shuffling) is derived
/// from it, so two runs with the same seed, configuration and data produce
/// the same parameters and the same score.
///
/// # Example
///
/// ```rust
/// use frnn_core::Seed;
/// use rand::Rng;
///
/// let mut rng = Seed::new(1).derive("init").to_rng();
/// let mut rng2 = Seed::new(1).derive("init").to_rng();
///
/// let val1: f32 = rng.gen();
/// let val2: f32 = rng2.gen();
/// assert_eq!(val1, val2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seed(u64);

impl Seed {
    /// Create a new seed with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the underlying seed value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Create a new ChaCha8 random number generator from this seed.
    #[must_use]
    pub fn to_rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.0)
    }

    /// Derive an independent seed from this seed and a key.
    ///
    /// FNV-1a over the little-endian seed bytes and the key bytes, finished
    /// with the SplitMix64 mixer. The result is fixed across platforms and
    /// toolchains.
    ///
    /// ```rust
    /// use frnn_core::Seed;
    ///
    /// let run = Seed::new(1);
    /// assert_ne!(run.derive("init").value(), run.derive("noise").value());
    /// assert_eq!(run.derive("init"), run.derive("init"));
    /// ```
    #[must_use]
    pub fn derive(&self, key: &str) -> Self {
        let hash = self
            .0
            .to_le_bytes()
            .iter()
            .chain(key.as_bytes())
            .fold(FNV_OFFSET, |h, &b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME));
        Self(splitmix64(hash))
    }

    /// Seed of the shuffle stream for one training epoch.
    ///
    /// The epoch index is the shuffle seed; mixing in the run seed keeps
    /// runs with different seeds from sharing a shuffle order.
    #[must_use]
    pub fn for_epoch(&self, epoch: usize) -> Self {
        self.derive(&format!("epoch-{epoch}"))
    }
}

impl Default for Seed {
    /// Runs are seeded with 1 unless told otherwise.
    fn default() -> Self {
        Self::new(1)
    }
}

impl From<u64> for Seed {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<Seed> for u64 {
    fn from(seed: Seed) -> Self {
        seed.0
    }
}
