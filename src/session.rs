use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::Result;
use crate::privacy::PrivacyPolicy;
use crate::sql::executor::{execute_script, StatementOutcome};
use crate::storage::Catalog;

/// A catalog plus the privacy policy every SELECT result is released
/// through.
pub struct Session {
    catalog: Catalog,
    policy: PrivacyPolicy,
    rng: StdRng,
}

impl Session {
    pub fn new(policy: PrivacyPolicy) -> Self {
        Self {
            catalog: Catalog::new(),
            policy,
            rng: StdRng::from_entropy(),
        }
    }

    /// Noise draws become reproducible for a given seed.
    pub fn with_seed(policy: PrivacyPolicy, seed: u64) -> Self {
        Self {
            catalog: Catalog::new(),
            policy,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Runs every statement in `sql`, one result per statement.
    pub fn execute(&mut self, sql: &str) -> Vec<Result<StatementOutcome>> {
        let results = execute_script(&mut self.catalog, sql);
        debug!("batch of {} statements executed", results.len());

        results
            .into_iter()
            .map(|result| match result {
                Ok(StatementOutcome::Selected(table)) => Ok(StatementOutcome::Selected(
                    self.policy.apply(table, &mut self.rng),
                )),
                other => other,
            })
            .collect()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(PrivacyPolicy::new())
    }
}
