use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "db.sqlite";

/// Process daily investment accruals
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "accrue", version, about = "Process daily investment accruals")]
pub struct Config {
    /// Path to SQLite database file
    #[arg(long = "db", env = "ACCRUAL_DB", default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,
}
