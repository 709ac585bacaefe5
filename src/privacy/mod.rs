//! Post-processing applied to SELECT results before they are released:
//! k-anonymity row suppression, l-diversity filtering and Laplace noise on
//! aggregate outputs, in that order.

pub mod anonymity;
pub mod error;
pub mod noise;

pub use anonymity::{
    enforce_k_anonymity, enforce_l_diversity, enforce_l_diversity_per_class, LDiversityMode,
};
pub use error::PrivacyError;
pub use noise::{add_noise, add_noise_with, sample_laplace, PrivacyBudget};

use log::debug;
use rand::Rng;

use crate::storage::table::{Table, Value};

/// Where the epsilon for each released result comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum EpsilonSource {
    /// The same epsilon for every query.
    Fixed(f64),
    /// A shrinking share of a total budget per query.
    Budget(PrivacyBudget),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrivacyPolicy {
    epsilon: Option<EpsilonSource>,
    sensitivity: f64,
    k: Option<usize>,
    quasi_identifiers: Vec<String>,
    l: Option<usize>,
    sensitive: Vec<String>,
    l_mode: LDiversityMode,
}

impl Default for PrivacyPolicy {
    fn default() -> Self {
        Self {
            epsilon: None,
            sensitivity: 1.0,
            k: None,
            quasi_identifiers: Vec::new(),
            l: None,
            sensitive: Vec::new(),
            l_mode: LDiversityMode::Column,
        }
    }
}

impl PrivacyPolicy {
    /// A policy that releases results untouched.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Result<Self, PrivacyError> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(PrivacyError::InvalidEpsilon(epsilon));
        }
        self.epsilon = Some(EpsilonSource::Fixed(epsilon));
        Ok(self)
    }

    pub fn with_budget(mut self, total: f64, decay: f64) -> Result<Self, PrivacyError> {
        self.epsilon = Some(EpsilonSource::Budget(PrivacyBudget::new(total, decay)?));
        Ok(self)
    }

    pub fn with_sensitivity(mut self, sensitivity: f64) -> Result<Self, PrivacyError> {
        if !(sensitivity.is_finite() && sensitivity > 0.0) {
            return Err(PrivacyError::InvalidSensitivity(sensitivity));
        }
        self.sensitivity = sensitivity;
        Ok(self)
    }

    pub fn with_k_anonymity(
        mut self,
        k: usize,
        quasi_identifiers: Vec<String>,
    ) -> Result<Self, PrivacyError> {
        if k == 0 {
            return Err(PrivacyError::InvalidThreshold { parameter: "k" });
        }
        self.k = Some(k);
        self.quasi_identifiers = quasi_identifiers;
        Ok(self)
    }

    pub fn with_l_diversity(
        mut self,
        l: usize,
        sensitive: Vec<String>,
        mode: LDiversityMode,
    ) -> Result<Self, PrivacyError> {
        if l == 0 {
            return Err(PrivacyError::InvalidThreshold { parameter: "l" });
        }
        self.l = Some(l);
        self.sensitive = sensitive;
        self.l_mode = mode;
        Ok(self)
    }

    pub fn is_noop(&self) -> bool {
        self.epsilon.is_none() && self.k.is_none() && self.l.is_none()
    }

    /// Runs the configured filters over one SELECT result. Each call draws
    /// the next epsilon when a budget is configured.
    pub fn apply<R: Rng + ?Sized>(&mut self, table: Table, rng: &mut R) -> Table {
        let mut table = table;

        if let Some(k) = self.k {
            table = enforce_k_anonymity(table, &self.quasi_identifiers, k);
        }

        if let Some(l) = self.l {
            table = match self.l_mode {
                LDiversityMode::Column => enforce_l_diversity(table, &self.sensitive, l),
                LDiversityMode::EquivalenceClass => {
                    enforce_l_diversity_per_class(table, &self.quasi_identifiers, &self.sensitive, l)
                }
            };
        }

        let epsilon = match &mut self.epsilon {
            Some(EpsilonSource::Fixed(epsilon)) => *epsilon,
            Some(EpsilonSource::Budget(budget)) => budget.next_epsilon(),
            None => return table,
        };
        debug!("adding noise with epsilon {}", epsilon);

        let targets: Vec<usize> = table
            .schema
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.visible && c.function_result)
            .map(|(i, _)| i)
            .collect();

        for row in &mut table.rows {
            for &idx in &targets {
                // MIN/MAX over text columns yield text; those are left as is.
                if let Some(true_value) = row.values[idx].as_float() {
                    row.values[idx] =
                        Value::Float(add_noise_with(rng, true_value, epsilon, self.sensitivity));
                }
            }
        }

        table
    }
}
