use chrono::NaiveDate;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

use crate::error::{AccrualError, Result};
use crate::models::{
    parse_maturity_date, ActiveInvestment, Investment, InvestmentStatus, TransactionRecord,
    TransactionType,
};
use crate::money::decimal_from_value;

/// Which investments the selection query treats as still accruing today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionBoundary {
    /// `maturity_date > today`: an investment maturing today is not selected
    #[default]
    ExcludeMaturingToday,

    /// `maturity_date >= today`: the maturity day earns its accrual and the
    /// investment is marked matured in the same pass
    IncludeMaturingToday,
}

impl SelectionBoundary {
    fn operator(&self) -> &'static str {
        match self {
            SelectionBoundary::ExcludeMaturingToday => ">",
            SelectionBoundary::IncludeMaturingToday => ">=",
        }
    }
}

/// Open an existing store read-write.
///
/// Returns `Ok(None)` when the file does not exist. The create flag is not
/// passed, so a missing store is never created as a side effect, and the
/// path is always a plain filename, never a SQLite URI.
pub fn open_database(path: &Path) -> Result<Option<Connection>> {
    if !path.exists() {
        return Ok(None);
    }

    // A leading "./" keeps a relative name like "file:x" from parsing as a URI
    let path = if path.is_relative() {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    };

    let conn = Connection::open_with_flags(
        &path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    Ok(Some(conn))
}

/// Create the tables the accrual pass reads and writes.
///
/// Production stores are provisioned by the application that owns them;
/// this exists for local setups and tests.
pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS packages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            daily_rate REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS investments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            package_id INTEGER NOT NULL REFERENCES packages(id),
            deposit_amount REAL NOT NULL,
            total_accruals REAL NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            maturity_date TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            type TEXT NOT NULL,
            amount REAL NOT NULL,
            investment_id INTEGER REFERENCES investments(id),
            date DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_investments_status ON investments(status, maturity_date);
        CREATE INDEX IF NOT EXISTS idx_transactions_investment ON transactions(investment_id);",
    )?;

    Ok(())
}

// ============================================================================
// SELECTION
// ============================================================================

/// Raw selection row before amounts and dates are validated
struct SelectedRow {
    id: i64,
    user_id: Value,
    deposit_amount: Value,
    total_accruals: Value,
    daily_rate: Value,
    maturity_date: Option<String>,
}

/// Active investments still inside their term, joined with their package's
/// daily rate, in id order.
pub fn fetch_accruable_investments(
    conn: &Connection,
    today: NaiveDate,
    boundary: SelectionBoundary,
) -> Result<Vec<ActiveInvestment>> {
    let sql = format!(
        "SELECT i.id, i.user_id, i.deposit_amount, i.total_accruals,
                p.daily_rate, i.maturity_date
         FROM investments i
         JOIN packages p ON i.package_id = p.id
         WHERE i.status = ?1 AND i.maturity_date {} ?2
         ORDER BY i.id",
        boundary.operator()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![InvestmentStatus::Active.as_str(), today.format("%Y-%m-%d").to_string()],
            |row| {
                Ok(SelectedRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    deposit_amount: row.get(2)?,
                    total_accruals: row.get(3)?,
                    daily_rate: row.get(4)?,
                    maturity_date: row.get(5)?,
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(validate_row).collect()
}

fn validate_row(row: SelectedRow) -> Result<ActiveInvestment> {
    let id = row.id;
    let amount = |value: &Value, column: &str| {
        decimal_from_value(ValueRef::from(value))
            .map_err(|reason| AccrualError::invalid_row(id, format!("{}: {}", column, reason)))
    };

    let user_id = match row.user_id {
        Value::Integer(user_id) => user_id,
        Value::Null => return Err(AccrualError::invalid_row(id, "user_id is NULL")),
        other => {
            return Err(AccrualError::invalid_row(
                id,
                format!("user_id is not an integer: {:?}", other),
            ))
        }
    };

    let raw_date = row
        .maturity_date
        .ok_or_else(|| AccrualError::invalid_row(id, "maturity_date is NULL"))?;
    let maturity_date = parse_maturity_date(&raw_date).ok_or_else(|| {
        AccrualError::invalid_row(id, format!("unparseable maturity_date '{}'", raw_date))
    })?;

    Ok(ActiveInvestment {
        id,
        user_id,
        deposit_amount: amount(&row.deposit_amount, "deposit_amount")?,
        total_accruals: amount(&row.total_accruals, "total_accruals")?,
        daily_rate: amount(&row.daily_rate, "daily_rate")?,
        maturity_date,
    })
}

// ============================================================================
// MUTATIONS
// ============================================================================

/// Overwrite an investment's running accrual total
pub fn update_total_accruals(
    conn: &Connection,
    investment_id: i64,
    new_total: rust_decimal::Decimal,
) -> Result<()> {
    conn.execute(
        "UPDATE investments SET total_accruals = ?1 WHERE id = ?2",
        params![new_total.to_string(), investment_id],
    )?;
    Ok(())
}

/// Append an accrual ledger entry stamped with the store's current time.
/// Returns the new transaction id.
pub fn insert_accrual_transaction(
    conn: &Connection,
    user_id: i64,
    investment_id: i64,
    amount: rust_decimal::Decimal,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions (user_id, type, amount, investment_id, date)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))",
        params![
            user_id,
            TransactionType::Accrual.as_str(),
            amount.to_string(),
            investment_id
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn mark_matured(conn: &Connection, investment_id: i64) -> Result<()> {
    conn.execute(
        "UPDATE investments SET status = ?1 WHERE id = ?2",
        params![InvestmentStatus::Matured.as_str(), investment_id],
    )?;
    Ok(())
}

// ============================================================================
// INSPECTION
// ============================================================================

pub fn get_investment(conn: &Connection, investment_id: i64) -> Result<Option<Investment>> {
    let row = conn
        .query_row(
            "SELECT id, user_id, package_id, deposit_amount, total_accruals, status, maturity_date
             FROM investments WHERE id = ?1",
            [investment_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Value>(3)?,
                    row.get::<_, Value>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        )
        .optional()?;

    let Some((id, user_id, package_id, deposit, total, status, maturity)) = row else {
        return Ok(None);
    };

    let invalid = |reason: String| AccrualError::invalid_row(id, reason);
    Ok(Some(Investment {
        id,
        user_id,
        package_id,
        deposit_amount: decimal_from_value(ValueRef::from(&deposit)).map_err(invalid)?,
        total_accruals: decimal_from_value(ValueRef::from(&total)).map_err(invalid)?,
        status: InvestmentStatus::from_tag(&status),
        maturity_date: parse_maturity_date(&maturity)
            .ok_or_else(|| invalid(format!("unparseable maturity_date '{}'", maturity)))?,
    }))
}

/// Ledger entries for one investment, oldest first
pub fn get_transactions_for_investment(
    conn: &Connection,
    investment_id: i64,
) -> Result<Vec<TransactionRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, type, amount, investment_id, date
         FROM transactions
         WHERE investment_id = ?1
         ORDER BY id",
    )?;

    let rows = stmt
        .query_map([investment_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Value>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, user_id, tx_type, amount, investment_id, date)| -> Result<TransactionRecord> {
            let amount = decimal_from_value(ValueRef::from(&amount))
                .map_err(|reason| AccrualError::invalid_row(investment_id, reason))?;
            Ok(TransactionRecord {
                id,
                user_id,
                transaction_type: TransactionType::from_tag(&tx_type),
                amount,
                investment_id,
                date: date.unwrap_or_default(),
            })
        })
        .collect()
}

pub fn count_transactions(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO packages (id, name, daily_rate) VALUES (1, 'Gold', 0.001);
             INSERT INTO investments (id, user_id, package_id, deposit_amount, total_accruals, status, maturity_date)
             VALUES
                (1, 10, 1, 1000, 50, 'active', '2025-12-31'),
                (2, 11, 1, 500, 0, 'active', '2025-06-01'),
                (3, 12, 1, 800, 0, 'matured', '2025-12-31'),
                (4, 13, 1, 200, 0, 'active', '2025-05-31');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_selection_excludes_maturing_today_by_default() {
        let conn = seeded();
        let rows = fetch_accruable_investments(
            &conn,
            date("2025-06-01"),
            SelectionBoundary::ExcludeMaturingToday,
        )
        .unwrap();

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(rows[0].deposit_amount, dec!(1000));
        assert_eq!(rows[0].total_accruals, dec!(50));
        assert_eq!(rows[0].daily_rate, dec!(0.001));
        assert_eq!(rows[0].maturity_date, date("2025-12-31"));
    }

    #[test]
    fn test_selection_inclusive_boundary() {
        let conn = seeded();
        let rows = fetch_accruable_investments(
            &conn,
            date("2025-06-01"),
            SelectionBoundary::IncludeMaturingToday,
        )
        .unwrap();

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_selection_rejects_bad_amount() {
        let conn = seeded();
        conn.execute(
            "UPDATE investments SET deposit_amount = 'lots' WHERE id = 1",
            [],
        )
        .unwrap();

        let err = fetch_accruable_investments(&conn, date("2025-06-01"), SelectionBoundary::default())
            .unwrap_err();
        assert!(!err.is_storage());
        assert!(err.to_string().contains("deposit_amount"));
    }

    #[test]
    fn test_selection_rejects_null_user_id() {
        // Stores provisioned elsewhere may not declare user_id NOT NULL
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE packages (id INTEGER PRIMARY KEY, daily_rate REAL);
             CREATE TABLE investments (
                id INTEGER PRIMARY KEY, user_id INTEGER, package_id INTEGER,
                deposit_amount REAL, total_accruals REAL, status TEXT, maturity_date TEXT
             );
             INSERT INTO packages (id, daily_rate) VALUES (1, 0.001);
             INSERT INTO investments VALUES (1, NULL, 1, 1000, 50, 'active', '2025-12-31');",
        )
        .unwrap();

        let err = fetch_accruable_investments(&conn, date("2025-06-01"), SelectionBoundary::default())
            .unwrap_err();
        assert!(!err.is_storage());
        assert!(matches!(err, AccrualError::InvalidRow { investment_id: 1, .. }));
        assert!(err.to_string().contains("user_id is NULL"));
    }

    #[test]
    fn test_selection_rejects_non_integer_user_id() {
        let conn = seeded();
        conn.execute("UPDATE investments SET user_id = 'alice' WHERE id = 1", [])
            .unwrap();

        let err = fetch_accruable_investments(&conn, date("2025-06-01"), SelectionBoundary::default())
            .unwrap_err();
        assert!(!err.is_storage());
        assert!(err.to_string().contains("user_id"));
    }

    #[test]
    fn test_mutations_and_inspection() {
        let conn = seeded();

        update_total_accruals(&conn, 1, dec!(51.000)).unwrap();
        let tx_id = insert_accrual_transaction(&conn, 10, 1, dec!(1.000)).unwrap();
        mark_matured(&conn, 1).unwrap();

        let inv = get_investment(&conn, 1).unwrap().unwrap();
        assert_eq!(inv.total_accruals, dec!(51));
        assert_eq!(inv.status, InvestmentStatus::Matured);
        assert_eq!(inv.package_id, 1);

        let txs = get_transactions_for_investment(&conn, 1).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].id, tx_id);
        assert_eq!(txs[0].user_id, 10);
        assert_eq!(txs[0].transaction_type, TransactionType::Accrual);
        assert_eq!(txs[0].amount, dec!(1));
        assert!(!txs[0].date.is_empty());

        assert_eq!(count_transactions(&conn).unwrap(), 1);
        assert!(get_investment(&conn, 99).unwrap().is_none());
    }

    #[test]
    fn test_open_database_missing_file_is_not_created() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.sqlite");

        assert!(open_database(&path).unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_open_database_existing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("db.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            setup_database(&conn).unwrap();
        }

        let conn = open_database(&path).unwrap().unwrap();
        assert_eq!(count_transactions(&conn).unwrap(), 0);
    }
}
