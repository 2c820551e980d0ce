use clap::Parser;
use std::process::ExitCode;

use investment_accrual::{accrue_investments, local_today, Config, RunOutcome};

fn main() -> ExitCode {
    env_logger::init();

    let config = Config::parse();
    let today = local_today();
    let mut stdout = std::io::stdout().lock();

    match accrue_investments(&config.db_path, today, &mut stdout) {
        Ok(RunOutcome::Completed(_)) | Ok(RunOutcome::StoreMissing) => ExitCode::SUCCESS,
        Err(e) if e.is_storage() => {
            eprintln!("Database error: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
