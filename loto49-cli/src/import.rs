use anyhow::{Context, Result};
use chrono::NaiveDate;
use loto49_db::rusqlite::Connection;
use std::path::Path;
use tracing::warn;

use loto49_db::db::insert_draw;
use loto49_db::models::{validate_draw, Draw, WINNING_COUNT};

/// Expected layout: `draw_id;dd/mm/yyyy;n1;n2;n3;n4;n5;n6;special`.
fn parse_record(record: &csv::StringRecord) -> Result<Draw> {
    let get = |idx: usize| -> Result<String> {
        record
            .get(idx)
            .map(|s| s.trim().to_string())
            .with_context(|| format!("Missing field at index {}", idx))
    };

    let get_u8 = |idx: usize| -> Result<u8> {
        let s = get(idx)?;
        s.parse::<u8>()
            .with_context(|| format!("Cannot parse '{}' (index {})", s, idx))
    };

    let draw_id = get(0)?;
    let date = parse_date(&get(1)?)?;

    let mut numbers = [0u8; WINNING_COUNT];
    for (i, n) in numbers.iter_mut().enumerate() {
        *n = get_u8(2 + i)?;
    }
    let special = get_u8(2 + WINNING_COUNT)?;

    validate_draw(&numbers, special)
        .with_context(|| format!("Invalid draw {}", draw_id))?;

    Ok(Draw {
        draw_id,
        date,
        numbers,
        special,
    })
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y")
        .with_context(|| format!("Invalid date format: '{}'", raw))
}

pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

pub fn import_csv(conn: &Connection, path: &Path) -> Result<ImportResult> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Cannot open {:?}", path))?;

    let tx = conn.unchecked_transaction()
        .context("Cannot start transaction")?;

    let mut result = ImportResult {
        total_records: 0,
        inserted: 0,
        skipped: 0,
        errors: 0,
    };

    for record_result in reader.records() {
        result.total_records += 1;
        let line = result.total_records;
        let draw = match record_result {
            Ok(record) => parse_record(&record),
            Err(e) => Err(e.into()),
        };
        match draw {
            Ok(draw) => match insert_draw(&tx, &draw) {
                Ok(true) => result.inserted += 1,
                Ok(false) => result.skipped += 1,
                Err(e) => {
                    warn!(line, error = %e, "insert failed");
                    result.errors += 1;
                }
            },
            Err(e) => {
                warn!(line, error = %format!("{:#}", e), "unreadable record");
                result.errors += 1;
            }
        }
    }

    tx.commit().context("Commit failed")?;
    Ok(result)
}
