use clap::Parser;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use crate::error::Result;
use crate::privacy::{LDiversityMode, PrivacyPolicy};

#[derive(Parser, Debug)]
#[command(name = "veilsql")]
#[command(
    author,
    version,
    about = "A miniature SQL engine with differential-privacy and anonymization filters"
)]
pub struct Cli {
    /// SQL script to execute; reads stdin when absent or "-"
    pub script: Option<PathBuf>,

    /// Execute inline SQL instead of a script
    #[arg(short, long, conflicts_with = "script")]
    pub query: Option<String>,

    /// Output format for SELECT results
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Laplace noise epsilon applied to every aggregate result
    #[arg(long, conflicts_with = "budget")]
    pub epsilon: Option<f64>,

    /// Query sensitivity used to scale the noise
    #[arg(long, default_value_t = 1.0)]
    pub sensitivity: f64,

    /// Total epsilon split geometrically across the SELECTs of the batch
    #[arg(long, requires = "decay")]
    pub budget: Option<f64>,

    /// Decay rate of the geometric budget split, in (0, 1)
    #[arg(long, requires = "budget")]
    pub decay: Option<f64>,

    /// Minimum quasi-identifier class size for released rows
    #[arg(short = 'k', long = "k-anonymity")]
    pub k_anonymity: Option<usize>,

    /// Comma-separated quasi-identifier columns (default: all visible columns)
    #[arg(long, value_delimiter = ',')]
    pub quasi_identifiers: Vec<String>,

    /// Minimum number of distinct sensitive values
    #[arg(short = 'l', long = "l-diversity", requires = "sensitive")]
    pub l_diversity: Option<usize>,

    /// Comma-separated sensitive columns checked by l-diversity
    #[arg(long, value_delimiter = ',')]
    pub sensitive: Vec<String>,

    /// Whether l-diversity suppresses whole columns or whole classes
    #[arg(long, default_value = "column")]
    pub l_diversity_mode: LDiversityArg,

    /// Seed for reproducible noise
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log executed statements (RUST_LOG overrides)
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LDiversityArg {
    #[default]
    Column,
    Class,
}

impl From<LDiversityArg> for LDiversityMode {
    fn from(arg: LDiversityArg) -> Self {
        match arg {
            LDiversityArg::Column => LDiversityMode::Column,
            LDiversityArg::Class => LDiversityMode::EquivalenceClass,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Builds the privacy policy described by the flags, validating every
    /// parameter.
    pub fn privacy_policy(&self) -> Result<PrivacyPolicy> {
        let mut policy = PrivacyPolicy::new().with_sensitivity(self.sensitivity)?;

        if let Some(epsilon) = self.epsilon {
            policy = policy.with_epsilon(epsilon)?;
        }
        if let (Some(budget), Some(decay)) = (self.budget, self.decay) {
            policy = policy.with_budget(budget, decay)?;
        }
        if let Some(k) = self.k_anonymity {
            policy = policy.with_k_anonymity(k, self.quasi_identifiers.clone())?;
        }
        if let Some(l) = self.l_diversity {
            policy = policy.with_l_diversity(
                l,
                self.sensitive.clone(),
                self.l_diversity_mode.into(),
            )?;
        }

        Ok(policy)
    }

    /// The SQL text to run: the inline query, the script file, or stdin.
    pub fn read_source(&self) -> Result<String> {
        if let Some(query) = &self.query {
            return Ok(query.clone());
        }
        match &self.script {
            Some(path) if path.as_os_str() != "-" => Ok(fs::read_to_string(path)?),
            _ => {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf)?;
                Ok(buf)
            }
        }
    }
}
