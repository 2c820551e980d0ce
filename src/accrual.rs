// 📈 Accrual Processor - one day of interest for every active investment
//
// Per run:
//   1. select active investments still inside their term
//   2. daily_accrual = deposit_amount × daily_rate
//   3. total_accruals += daily_accrual
//   4. append an 'accrual' ledger entry
//   5. mark matured when maturity_date == today
//   6. commit the whole batch at once
//
// Any error before step 6 drops the rusqlite transaction, which rolls the
// batch back. There is no per-row isolation and no retry.

use chrono::NaiveDate;
use log::{debug, info, warn};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use crate::db::{self, SelectionBoundary};
use crate::error::{AccrualError, Result};
use crate::models::ActiveInvestment;
use crate::money::{daily_accrual, format_amount};

// ============================================================================
// REPORT
// ============================================================================

/// What one investment received in a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccrualEntry {
    pub investment_id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub new_total: Decimal,
    pub transaction_id: i64,
    pub matured: bool,
}

/// Summary of a committed run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccrualReport {
    pub run_date: NaiveDate,
    pub entries: Vec<AccrualEntry>,
}

impl AccrualReport {
    pub fn processed(&self) -> usize {
        self.entries.len()
    }

    pub fn matured_count(&self) -> usize {
        self.entries.iter().filter(|e| e.matured).count()
    }

    /// Sum of all amounts credited in this run
    pub fn total_accrued(&self) -> Decimal {
        self.entries.iter().map(|e| e.amount).sum()
    }
}

/// Result of a run against a store path
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The store file does not exist; nothing was touched
    StoreMissing,

    Completed(AccrualReport),
}

// ============================================================================
// PROCESSOR
// ============================================================================

pub struct AccrualProcessor<'conn> {
    conn: &'conn mut Connection,
    boundary: SelectionBoundary,
}

impl<'conn> AccrualProcessor<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self {
            conn,
            boundary: SelectionBoundary::default(),
        }
    }

    /// Override which maturity dates the selection query admits
    pub fn with_boundary(mut self, boundary: SelectionBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    /// Run one accrual pass for `today`, writing progress lines to `out`.
    ///
    /// Either every selected investment is accrued and committed, or nothing
    /// is.
    pub fn run<W: Write>(&mut self, today: NaiveDate, out: &mut W) -> Result<AccrualReport> {
        let tx = self.conn.transaction()?;

        let investments = db::fetch_accruable_investments(&tx, today, self.boundary)?;
        info!(
            "accrual run for {}: {} investments selected ({:?})",
            today,
            investments.len(),
            self.boundary
        );
        writeln!(out, "Processing {} active investments...", investments.len())?;

        let mut entries = Vec::with_capacity(investments.len());
        for investment in &investments {
            let entry = accrue_one(&tx, investment, today)?;

            writeln!(
                out,
                "Investment #{}: Added {} (Total: {})",
                entry.investment_id,
                format_amount(entry.amount),
                format_amount(entry.new_total)
            )?;
            if entry.matured {
                writeln!(out, "Investment #{}: Matured", entry.investment_id)?;
            }

            entries.push(entry);
        }

        tx.commit()?;
        writeln!(out, "Accrual processing complete!")?;

        let report = AccrualReport {
            run_date: today,
            entries,
        };
        info!(
            "accrual run for {} committed: {} accrued, {} matured, {} credited",
            today,
            report.processed(),
            report.matured_count(),
            report.total_accrued()
        );

        Ok(report)
    }
}

fn accrue_one(
    conn: &Connection,
    investment: &ActiveInvestment,
    today: NaiveDate,
) -> Result<AccrualEntry> {
    let id = investment.id;

    let amount = daily_accrual(investment.deposit_amount, investment.daily_rate)
        .ok_or(AccrualError::Overflow { investment_id: id })?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AccrualError::invalid_row(
            id,
            format!("negative daily accrual {}", amount),
        ));
    }

    let new_total = investment
        .total_accruals
        .checked_add(amount)
        .ok_or(AccrualError::Overflow { investment_id: id })?;

    db::update_total_accruals(conn, id, new_total)?;
    let transaction_id = db::insert_accrual_transaction(conn, investment.user_id, id, amount)?;
    debug!(
        "investment #{}: +{} -> {} (transaction #{})",
        id, amount, new_total, transaction_id
    );

    let matured = investment.matures_on(today);
    if matured {
        db::mark_matured(conn, id)?;
        debug!("investment #{}: matured on {}", id, today);
    }

    Ok(AccrualEntry {
        investment_id: id,
        user_id: investment.user_id,
        amount,
        new_total,
        transaction_id,
        matured,
    })
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Run one pass against the store at `db_path`.
///
/// A missing store is reported on `out` and returned as
/// `RunOutcome::StoreMissing` rather than as an error.
pub fn accrue_investments<W: Write>(
    db_path: &Path,
    today: NaiveDate,
    out: &mut W,
) -> Result<RunOutcome> {
    let Some(mut conn) = db::open_database(db_path)? else {
        warn!("store {} does not exist, skipping accrual run", db_path.display());
        writeln!(out, "Database file not found: {}", db_path.display())?;
        return Ok(RunOutcome::StoreMissing);
    };

    let report = AccrualProcessor::new(&mut conn).run(today, out)?;
    Ok(RunOutcome::Completed(report))
}

/// Today's date in the local timezone, the day a scheduled run accrues for
pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
