use log::LevelFilter;

use veilsql::cli::Cli;
use veilsql::format::render;
use veilsql::session::Session;
use veilsql::StatementOutcome;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();

    let default_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    let policy = cli.privacy_policy()?;
    let sql = cli.read_source()?;

    let mut session = match cli.seed {
        Some(seed) => Session::with_seed(policy, seed),
        None => Session::new(policy),
    };

    let mut failures = 0;
    for (i, result) in session.execute(&sql).into_iter().enumerate() {
        match result {
            Ok(StatementOutcome::Created { table, created: true }) => {
                println!("Table {} created", table)
            }
            Ok(StatementOutcome::Created { table, created: false }) => {
                println!("Table {} already exists, skipped", table)
            }
            Ok(StatementOutcome::Inserted { table }) => println!("1 row inserted into {}", table),
            Ok(StatementOutcome::Selected(table)) => println!("{}", render(&table, cli.format)),
            Err(e) => {
                failures += 1;
                eprintln!("Error in statement {}: {}", i + 1, e);
            }
        }
    }

    if failures > 0 {
        return Err(format!("{} statement(s) failed", failures).into());
    }

    Ok(())
}
