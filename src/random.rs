
use rand::rngs::StdRng;
use rand::{thread_rng, Rng, RngCore, SeedableRng};

// raw draws are taken from the top 63 bits of the generator output
const MAX_RANDOM: u64 = 1 << 63;

pub struct RandomSource {
    rng: StdRng,
    seed: u64,
}

impl RandomSource {

    pub fn new(seed: Option<u64>) -> RandomSource {

        // without a seed, draw one so the run can still be reproduced from the logs
        let seed = match seed {
            Some(seed) => seed,
            None => thread_rng().gen::<u64>()
        };

        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: seed
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform draw from `[0, n)`.
    ///
    /// Raw draws at or above the largest multiple of `n` that fits in the raw range
    /// are rejected, so the final modulo carries no bias.
    pub fn rand_long(&mut self, n: u64) -> u64 {

        assert!(n > 0, "rand_long needs a non empty range");
        let limit = MAX_RANDOM - MAX_RANDOM % n;
        loop {
            let rnd = self.rng.next_u64() >> 1;
            if rnd < limit {
                return rnd % n
            }
        }
    }

    /// Fisher-Yates shuffle of the whole slice.
    pub fn shuffle<T>(&mut self, array: &mut [T]) {

        let n = array.len();
        for i in (1..n).rev() {
            let j = self.rand_long((i + 1) as u64) as usize;
            array.swap(i, j);
        }
    }

}


#[cfg(test)]
mod tests {

    use super::RandomSource;

    #[test]
    fn rand_long_stays_in_range() {

        let mut rng = RandomSource::new(Some(7));
        for n in [1u64, 2, 3, 10, 1000, u64::MAX >> 1] {
            for _ in 0..200 {
                assert!(rng.rand_long(n) < n);
            }
        }
    }

    #[test]
    fn rand_long_covers_small_range() {

        // every value of a small range should show up in a modest number of draws
        let mut rng = RandomSource::new(Some(11));
        let mut seen = [0usize; 6];
        for _ in 0..6000 {
            seen[rng.rand_long(6) as usize] += 1;
        }
        for count in seen {
            assert!(count > 800 && count < 1200, "skewed count {}", count);
        }
    }

    #[test]
    fn same_seed_same_permutation() {

        let mut a: Vec<usize> = (0..100).collect();
        let mut b: Vec<usize> = (0..100).collect();
        RandomSource::new(Some(42)).shuffle(&mut a);
        RandomSource::new(Some(42)).shuffle(&mut b);
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(sorted, (0..100).collect::<Vec<usize>>());
        assert_ne!(a, sorted);
    }

    #[test]
    fn shuffle_handles_tiny_slices() {

        let mut rng = RandomSource::new(None);
        let mut empty: Vec<u8> = Vec::new();
        rng.shuffle(&mut empty);
        assert!(empty.is_empty());

        let mut one = vec![9];
        rng.shuffle(&mut one);
        assert_eq!(one, vec![9]);
    }

    #[test]
    fn unseeded_source_reports_its_seed() {

        let first = RandomSource::new(None);
        let mut replay = RandomSource::new(Some(first.seed()));
        let mut original = first;
        assert_eq!(original.rand_long(1 << 40), replay.rand_long(1 << 40));
    }

}
