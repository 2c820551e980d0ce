// 📒 Accrual records
//
// The store owns three tables: investments, packages, transactions.
// This module gives their rows names instead of positional tuples.

use chrono::NaiveDate;
use rust_decimal::Decimal;

// ============================================================================
// STATUS / TYPE TAGS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvestmentStatus {
    /// Accruing daily
    Active,

    /// Reached maturity date, no further accrual
    Matured,

    /// Any other tag written by the application that owns the store
    Other(String),
}

impl InvestmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InvestmentStatus::Active => "active",
            InvestmentStatus::Matured => "matured",
            InvestmentStatus::Other(tag) => tag,
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "active" => InvestmentStatus::Active,
            "matured" => InvestmentStatus::Matured,
            other => InvestmentStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionType {
    Accrual,
    Other(String),
}

impl TransactionType {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionType::Accrual => "accrual",
            TransactionType::Other(tag) => tag,
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "accrual" => TransactionType::Accrual,
            other => TransactionType::Other(other.to_string()),
        }
    }
}

// ============================================================================
// ROWS
// ============================================================================

/// One row of the selection query: an active investment joined with the
/// daily rate of its package.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveInvestment {
    pub id: i64,
    pub user_id: i64,
    pub deposit_amount: Decimal,
    pub total_accruals: Decimal,
    pub daily_rate: Decimal,
    pub maturity_date: NaiveDate,
}

impl ActiveInvestment {
    /// Whether `today` is the last day of the term
    pub fn matures_on(&self, today: NaiveDate) -> bool {
        self.maturity_date == today
    }
}

/// Investment as stored, used for inspection after a run
#[derive(Debug, Clone, PartialEq)]
pub struct Investment {
    pub id: i64,
    pub user_id: i64,
    pub package_id: i64,
    pub deposit_amount: Decimal,
    pub total_accruals: Decimal,
    pub status: InvestmentStatus,
    pub maturity_date: NaiveDate,
}

/// Ledger entry appended for an investment.
/// `id` and `date` are assigned by the store on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub id: i64,
    pub user_id: i64,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub investment_id: i64,
    pub date: String,
}

/// Parse a stored maturity date. Values with a time suffix
/// (`2025-03-01 00:00:00`) are read by their date prefix.
pub fn parse_maturity_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
