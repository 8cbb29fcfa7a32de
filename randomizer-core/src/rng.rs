use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// The single shared random stream driving a randomization run.
///
/// Category passes reseed this from the run's base seed before executing, so
/// enabling or disabling one category never shifts another category's draws.
pub struct Stream {
    rng: StdRng,
}

impl Stream {
    pub fn from_seed(seed: u64) -> Self {
        Stream {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Uniform integer in `lo..=hi`.
    pub fn uniform_int(&mut self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }

    /// Uniform float in `[0, 1)`.
    pub fn uniform_float(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    pub fn coin(&mut self) -> bool {
        self.rng.gen::<bool>()
    }

    /// Triangular distribution over `[low, high]` with the given mode.
    pub fn triangular(&mut self, low: f64, high: f64, mode: f64) -> f64 {
        if high <= low {
            return low;
        }
        let mode = mode.clamp(low, high);
        let u = self.uniform_float();
        let c = (mode - low) / (high - low);
        if u < c {
            low + (u * (high - low) * (mode - low)).sqrt()
        } else {
            high - ((1.0 - u) * (high - low) * (high - mode)).sqrt()
        }
    }

    /// Bounded pseudo-normal perturbation of `value`, clamped to
    /// `[min, max]`.
    ///
    /// The delta is the mean of three uniform draws recentred to
    /// [-0.5, 0.5), scaled by the distance from `value` to the bound on the
    /// drawn side. The mode sits at the input value and the result can never
    /// escape the bounds.
    pub fn jitter_f64(&mut self, value: f64, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        let value = value.clamp(min, max);
        let d = (self.uniform_float() + self.uniform_float() + self.uniform_float()) / 3.0 - 0.5;
        let reach = if d < 0.0 { value - min } else { max - value };
        (value + 2.0 * d * reach).clamp(min, max)
    }

    /// Integer variant of [`Stream::jitter_f64`].
    pub fn jitter(&mut self, value: i64, min: i64, max: i64) -> i64 {
        let out = self.jitter_f64(value as f64, min as f64, max as f64);
        (out.round() as i64).clamp(min, max)
    }

    pub fn shuffle<T>(&mut self, values: &mut [T]) {
        values.shuffle(&mut self.rng);
    }

    pub fn pick<'a, T>(&mut self, values: &'a [T]) -> &'a T {
        let index = self.rng.gen_range(0..values.len());
        &values[index]
    }
}

#[cfg(test)]
mod tests {
    use super::Stream;

    #[test]
    fn same_seed_same_draws() {
        let mut a = Stream::from_seed(77);
        let mut b = Stream::from_seed(77);
        for _ in 0..32 {
            assert_eq!(a.uniform_int(0, 1000), b.uniform_int(0, 1000));
        }
    }

    #[test]
    fn reseed_restarts_the_sequence() {
        let mut s = Stream::from_seed(5);
        let first: Vec<i64> = (0..8).map(|_| s.uniform_int(0, 255)).collect();
        s.reseed(5);
        let second: Vec<i64> = (0..8).map(|_| s.uniform_int(0, 255)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn jitter_respects_bounds() {
        let mut s = Stream::from_seed(1234);
        for _ in 0..2000 {
            let v = s.jitter(50, 1, 99);
            assert!((1..=99).contains(&v));
        }
        for _ in 0..2000 {
            let v = s.jitter_f64(0.9, 0.0, 1.0);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn jitter_at_the_edge_stays_inside() {
        let mut s = Stream::from_seed(9);
        for _ in 0..500 {
            assert!(s.jitter(1, 1, 99) >= 1);
            assert!(s.jitter(99, 1, 99) <= 99);
        }
    }

    #[test]
    fn triangular_stays_in_range() {
        let mut s = Stream::from_seed(42);
        for _ in 0..2000 {
            let v = s.triangular(0.25, 0.75, 0.5);
            assert!((0.25..=0.75).contains(&v));
        }
    }

    #[test]
    fn degenerate_ranges_collapse() {
        let mut s = Stream::from_seed(0);
        assert_eq!(s.uniform_int(7, 7), 7);
        assert_eq!(s.jitter(10, 10, 10), 10);
        assert_eq!(s.triangular(0.5, 0.5, 0.5), 0.5);
    }
}
