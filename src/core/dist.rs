/// Discrete distribution with O(1) sampling (Vose's alias method).
///
/// Used for triangle selection in area lights (probability proportional
/// to surface area) and texel selection in environment lights.
pub struct AliasTable {
    probs: Vec<f32>,
    cutoff: Vec<f32>,
    alias: Vec<usize>,
}

impl AliasTable {
    /// Build from non-negative weights. Weights are normalized
    /// internally; the table of an all-zero input samples uniformly.
    pub fn new(weights: &[f32]) -> Self {
        let n = weights.len();
        assert!(n > 0);
        let sum: f32 = weights.iter().sum();
        let probs: Vec<f32> = if sum > 0.0 {
            weights.iter().map(|w| w / sum).collect()
        } else {
            vec![1.0 / n as f32; n]
        };

        let mut cutoff: Vec<f32> = probs.iter().map(|p| p * n as f32).collect();
        let mut alias: Vec<usize> = (0..n).collect();

        let mut small: Vec<usize> = (0..n).filter(|&i| cutoff[i] < 1.0).collect();
        let mut large: Vec<usize> = (0..n).filter(|&i| cutoff[i] >= 1.0).collect();
        while let (Some(&s), Some(&l)) = (small.last(), large.last()) {
            small.pop();
            alias[s] = l;
            cutoff[l] -= 1.0 - cutoff[s];
            if cutoff[l] < 1.0 {
                large.pop();
                small.push(l);
            }
        }
        // Numerical leftovers keep their own bucket.
        for &i in small.iter().chain(large.iter()) {
            cutoff[i] = 1.0;
        }

        Self {
            probs,
            cutoff,
            alias,
        }
    }

    /// Sample an index; returns `(index, probability(index))`.
    pub fn sample(&self, u: f32) -> (usize, f32) {
        let scaled = u * self.probs.len() as f32;
        let i = (scaled as usize).min(self.probs.len() - 1);
        let frac = scaled - i as f32;
        let index = if frac < self.cutoff[i] { i } else { self.alias[i] };
        (index, self.probs[index])
    }

    pub fn probability(&self, index: usize) -> f32 {
        self.probs[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rng::Rng;

    #[test]
    fn probabilities_are_normalized() {
        let table = AliasTable::new(&[1.0, 2.0, 3.0, 4.0]);
        let total: f32 = (0..4).map(|i| table.probability(i)).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!((table.probability(3) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn sampling_matches_weights() {
        let table = AliasTable::new(&[0.5, 0.0, 1.5]);
        let mut rng = Rng::seeded(11);
        let mut counts = [0u32; 3];
        let n = 200_000;
        for _ in 0..n {
            let (i, _) = table.sample(rng.u());
            counts[i] += 1;
        }
        assert_eq!(counts[1], 0);
        let f0 = counts[0] as f32 / n as f32;
        assert!((f0 - 0.25).abs() < 0.01);
    }

    #[test]
    fn zero_weights_fall_back_to_uniform() {
        let table = AliasTable::new(&[0.0, 0.0]);
        assert!((table.probability(0) - 0.5).abs() < 1e-6);
    }
}
