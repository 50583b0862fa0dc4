//! Bonus command for the weekly consistency check.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use tempo_core::ledger;
use tempo_core::LedgerStore;
use tempo_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &mut Database, today: NaiveDate) -> Result<()> {
    let awarded = ledger::check_weekly_bonus(db, today)?;
    if awarded > 0 {
        writeln!(
            writer,
            "Weekly consistency bonus: +{awarded} points (balance {})",
            db.balance()?
        )?;
    } else {
        writeln!(
            writer,
            "No bonus awarded. It needs 80% of habit days done over the last 7 days, once per week."
        )?;
    }
    Ok(())
}
