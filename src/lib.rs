// Investment Accrual - Core Library
// Daily interest accrual for active investments, used by the `accrue` binary and tests

pub mod accrual;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod money;

// Re-export commonly used types
pub use accrual::{
    accrue_investments, local_today, AccrualEntry, AccrualProcessor, AccrualReport, RunOutcome,
};
pub use config::{Config, DEFAULT_DB_PATH};
pub use db::{open_database, setup_database, SelectionBoundary};
pub use error::AccrualError;
pub use models::{ActiveInvestment, Investment, InvestmentStatus, TransactionRecord, TransactionType};
