use rand::rngs::StdRng;
use rand::SeedableRng;

/// Seeded row sampler. Each call to [`Sampler::sample`] starts a fresh
/// generator from the same seed, so two calls over the same row count pick
/// the same rows.
#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    seed: u64,
}

impl Sampler {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// `⌊fraction × len⌋` distinct row indices in sampled order.
    pub fn sample(&self, len: usize, fraction: f64) -> Vec<usize> {
        let amount = sample_size(len, fraction);
        let mut rng = StdRng::seed_from_u64(self.seed);
        rand::seq::index::sample(&mut rng, len, amount).into_vec()
    }
}

/// `⌊fraction × len⌋`, with `fraction` clamped to `[0, 1]`.
pub fn sample_size(len: usize, fraction: f64) -> usize {
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    // nudge so 0.29 * 100 lands on 29, not 28.999…
    let n = (len as f64 * fraction + 1e-9).floor() as usize;
    n.min(len)
}
