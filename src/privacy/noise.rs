use log::trace;
use rand::Rng;

use super::error::PrivacyError;

/// Laplace mechanism: perturbs `true_value` with noise of scale
/// `sensitivity / epsilon`, drawn from the thread-local generator.
pub fn add_noise(true_value: f64, epsilon: f64, sensitivity: f64) -> f64 {
    add_noise_with(&mut rand::thread_rng(), true_value, epsilon, sensitivity)
}

/// Same as [`add_noise`] with a caller-supplied generator, so results can
/// be reproduced from a seed.
pub fn add_noise_with<R: Rng + ?Sized>(
    rng: &mut R,
    true_value: f64,
    epsilon: f64,
    sensitivity: f64,
) -> f64 {
    let noise = sample_laplace(rng, sensitivity / epsilon);
    trace!("laplace noise {} (epsilon {}, sensitivity {})", noise, epsilon, sensitivity);
    true_value + noise
}

/// Draws one zero-centred Laplace sample by inverse-CDF transform.
pub fn sample_laplace<R: Rng + ?Sized>(rng: &mut R, scale: f64) -> f64 {
    // u == 0 would give ln(0).
    let u = loop {
        let u: f64 = rng.gen();
        if u > 0.0 {
            break u;
        }
    };

    if u < 0.5 {
        scale * (2.0 * u).ln()
    } else {
        -scale * (2.0 * (1.0 - u)).ln()
    }
}

/// Sequential geometric split of a fixed epsilon budget: the n-th query
/// receives `total * (1 - r) * r^(n-1)`.
///
/// The shares sum to at most `total`, but this is a simple allocation
/// heuristic. It does no composition accounting and makes no formal
/// differential-privacy claim about the batch as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct PrivacyBudget {
    total: f64,
    decay: f64,
    issued: u32,
}

impl PrivacyBudget {
    pub fn new(total: f64, decay: f64) -> Result<Self, PrivacyError> {
        if !(total.is_finite() && total > 0.0) {
            return Err(PrivacyError::InvalidEpsilon(total));
        }
        if !(decay > 0.0 && decay < 1.0) {
            return Err(PrivacyError::InvalidDecay(decay));
        }
        Ok(Self {
            total,
            decay,
            issued: 0,
        })
    }

    /// Epsilon for the next query; advances the sequence.
    pub fn next_epsilon(&mut self) -> f64 {
        self.issued += 1;
        self.total * (1.0 - self.decay) * self.decay.powi(self.issued as i32 - 1)
    }

    pub fn issued(&self) -> u32 {
        self.issued
    }

    /// Sum of every epsilon handed out so far.
    pub fn spent(&self) -> f64 {
        self.total * (1.0 - self.decay.powi(self.issued as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_noise_mean_and_variance() {
        let mut rng = StdRng::seed_from_u64(42);
        let (epsilon, sensitivity) = (0.5, 1.0);
        let n = 200_000;

        let samples: Vec<f64> = (0..n)
            .map(|_| add_noise_with(&mut rng, 10.0, epsilon, sensitivity) - 10.0)
            .collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;

        let expected = 2.0 * (sensitivity / epsilon).powi(2);
        assert!(mean.abs() < 0.05, "mean {}", mean);
        assert!((variance - expected).abs() / expected < 0.05, "variance {}", variance);
    }

    #[test]
    fn test_noise_is_finite() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            assert!(sample_laplace(&mut rng, 3.0).is_finite());
        }
    }

    #[test]
    fn test_thread_rng_variant() {
        let noisy = add_noise(100.0, 1000.0, 1.0);
        assert!((noisy - 100.0).abs() < 1.0);
    }

    #[test]
    fn test_geometric_budget() {
        let mut budget = PrivacyBudget::new(1.0, 0.5).unwrap();
        assert_eq!(budget.next_epsilon(), 0.5);
        assert_eq!(budget.next_epsilon(), 0.25);
        assert_eq!(budget.next_epsilon(), 0.125);
        assert_eq!(budget.issued(), 3);
        assert!((budget.spent() - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_budget_validation() {
        assert_eq!(
            PrivacyBudget::new(0.0, 0.5).unwrap_err(),
            PrivacyError::InvalidEpsilon(0.0)
        );
        assert_eq!(
            PrivacyBudget::new(1.0, 1.0).unwrap_err(),
            PrivacyError::InvalidDecay(1.0)
        );
    }
}
