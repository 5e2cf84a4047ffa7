use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;

use crate::models::{Combination, Draw};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    draw_id   TEXT PRIMARY KEY,
    date      TEXT NOT NULL,
    number_1  INTEGER NOT NULL,
    number_2  INTEGER NOT NULL,
    number_3  INTEGER NOT NULL,
    number_4  INTEGER NOT NULL,
    number_5  INTEGER NOT NULL,
    number_6  INTEGER NOT NULL,
    special   INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS batches (
    batch_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at    TEXT NOT NULL,
    method        TEXT NOT NULL,
    is_double     INTEGER NOT NULL,
    lucky_number  INTEGER NOT NULL,
    selected      TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS combinations (
    batch_id         INTEGER NOT NULL REFERENCES batches(batch_id),
    sequence_number  INTEGER NOT NULL,
    numbers          TEXT NOT NULL,
    PRIMARY KEY (batch_id, sequence_number)
);
";

const DRAW_COLUMNS: &str =
    "draw_id, date, number_1, number_2, number_3, number_4, number_5, number_6, special";

/// A generated batch as stored in the `batches` and `combinations` tables.
#[derive(Debug, Clone)]
pub struct BatchRecord {
    pub batch_id: i64,
    pub created_at: NaiveDateTime,
    pub method: String,
    pub is_double: bool,
    pub lucky_number: u8,
    pub selected: Vec<u8>,
    pub combinations: Vec<Combination>,
}

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("loto49.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Cannot open database {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Migration failed")?;
    Ok(())
}

pub fn insert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (draw_id, date, number_1, number_2, number_3, number_4, number_5, number_6, special)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            draw.draw_id,
            draw.date,
            draw.numbers[0],
            draw.numbers[1],
            draw.numbers[2],
            draw.numbers[3],
            draw.numbers[4],
            draw.numbers[5],
            draw.special,
        ],
    ).context("Insert failed")?;
    Ok(changed > 0)
}

fn draw_from_row(row: &Row) -> rusqlite::Result<Draw> {
    Ok(Draw {
        draw_id: row.get(0)?,
        date: row.get(1)?,
        numbers: [
            row.get::<_, u8>(2)?,
            row.get::<_, u8>(3)?,
            row.get::<_, u8>(4)?,
            row.get::<_, u8>(5)?,
            row.get::<_, u8>(6)?,
            row.get::<_, u8>(7)?,
        ],
        special: row.get(8)?,
    })
}

/// The `limit` most recent draws, oldest first.
pub fn fetch_last_draws(conn: &Connection, limit: u32) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DRAW_COLUMNS} FROM draws ORDER BY date DESC, draw_id DESC LIMIT ?1"
    ))?;
    let mut draws = stmt
        .query_map([limit], draw_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    draws.reverse();
    Ok(draws)
}

/// Draws dated on or after `since`, oldest first.
pub fn fetch_draws_since(conn: &Connection, since: NaiveDate) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DRAW_COLUMNS} FROM draws WHERE date >= ?1 ORDER BY date ASC, draw_id ASC"
    ))?;
    let draws = stmt
        .query_map([since], draw_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

pub fn fetch_latest_draw(conn: &Connection) -> Result<Option<Draw>> {
    let draw = conn
        .query_row(
            &format!("SELECT {DRAW_COLUMNS} FROM draws ORDER BY date DESC, draw_id DESC LIMIT 1"),
            [],
            draw_from_row,
        )
        .optional()?;
    Ok(draw)
}

pub fn count_draws(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count)
}

fn join_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn split_numbers(s: &str) -> Result<Vec<u8>> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|part| {
            part.parse::<u8>()
                .with_context(|| format!("Corrupt number list '{}'", s))
        })
        .collect()
}

/// Stores a generated batch with its combinations. Returns the new batch id.
pub fn insert_batch(
    conn: &Connection,
    method: &str,
    is_double: bool,
    lucky_number: u8,
    selected: &[u8],
    combinations: &[Combination],
) -> Result<i64> {
    if combinations.is_empty() {
        bail!("Refusing to store an empty batch");
    }
    let tx = conn.unchecked_transaction()
        .context("Cannot start transaction")?;

    tx.execute(
        "INSERT INTO batches (created_at, method, is_double, lucky_number, selected)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            chrono::Local::now().naive_local(),
            method,
            is_double,
            lucky_number,
            join_numbers(selected),
        ],
    ).context("Batch insert failed")?;
    let batch_id = tx.last_insert_rowid();

    for combination in combinations {
        tx.execute(
            "INSERT INTO combinations (batch_id, sequence_number, numbers) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                batch_id,
                combination.sequence_number,
                join_numbers(&combination.numbers),
            ],
        ).context("Combination insert failed")?;
    }

    tx.commit().context("Commit failed")?;
    Ok(batch_id)
}

/// The `limit` most recent batches, newest first.
pub fn fetch_batches(conn: &Connection, limit: u32) -> Result<Vec<BatchRecord>> {
    let mut stmt = conn.prepare(
        "SELECT batch_id, created_at, method, is_double, lucky_number, selected
         FROM batches ORDER BY batch_id DESC LIMIT ?1"
    )?;
    let headers = stmt.query_map([limit], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, NaiveDateTime>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, bool>(3)?,
            row.get::<_, u8>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?.collect::<Result<Vec<_>, _>>()?;

    let mut combo_stmt = conn.prepare(
        "SELECT sequence_number, numbers FROM combinations
         WHERE batch_id = ?1 ORDER BY sequence_number ASC"
    )?;

    let mut batches = Vec::with_capacity(headers.len());
    for (batch_id, created_at, method, is_double, lucky_number, selected) in headers {
        let rows = combo_stmt.query_map([batch_id], |row| {
            Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?))
        })?.collect::<Result<Vec<_>, _>>()?;

        let combinations = rows
            .into_iter()
            .map(|(sequence_number, numbers)| {
                Ok(Combination { sequence_number, numbers: split_numbers(&numbers)? })
            })
            .collect::<Result<Vec<_>>>()?;

        batches.push(BatchRecord {
            batch_id,
            created_at,
            method,
            is_double,
            lucky_number,
            selected: split_numbers(&selected)?,
            combinations,
        });
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_draw(id: &str, date: &str) -> Draw {
        Draw {
            draw_id: id.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            numbers: [1, 2, 3, 4, 5, 6],
            special: 7,
        }
    }

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_count() {
        let conn = memory_db();
        assert_eq!(count_draws(&conn).unwrap(), 0);

        insert_draw(&conn, &test_draw("001", "2024-01-01")).unwrap();
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_ignored() {
        let conn = memory_db();

        let inserted = insert_draw(&conn, &test_draw("001", "2024-01-01")).unwrap();
        assert!(inserted);
        let inserted = insert_draw(&conn, &test_draw("001", "2024-01-01")).unwrap();
        assert!(!inserted);
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_fetch_last_draws_chronological() {
        let conn = memory_db();

        insert_draw(&conn, &test_draw("001", "2024-01-01")).unwrap();
        insert_draw(&conn, &test_draw("002", "2024-01-05")).unwrap();
        insert_draw(&conn, &test_draw("003", "2024-01-03")).unwrap();

        let draws = fetch_last_draws(&conn, 2).unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].draw_id, "003");
        assert_eq!(draws[1].draw_id, "002");
    }

    #[test]
    fn test_fetch_draws_since() {
        let conn = memory_db();

        insert_draw(&conn, &test_draw("001", "2024-01-01")).unwrap();
        insert_draw(&conn, &test_draw("002", "2024-01-05")).unwrap();
        insert_draw(&conn, &test_draw("003", "2024-01-03")).unwrap();

        let since = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let draws = fetch_draws_since(&conn, since).unwrap();
        let ids: Vec<&str> = draws.iter().map(|d| d.draw_id.as_str()).collect();
        assert_eq!(ids, vec!["003", "002"]);
    }

    #[test]
    fn test_fetch_latest_draw() {
        let conn = memory_db();
        assert!(fetch_latest_draw(&conn).unwrap().is_none());

        insert_draw(&conn, &test_draw("001", "2024-01-01")).unwrap();
        insert_draw(&conn, &test_draw("002", "2024-01-05")).unwrap();
        let latest = fetch_latest_draw(&conn).unwrap().unwrap();
        assert_eq!(latest.draw_id, "002");
        assert_eq!(latest.numbers, [1, 2, 3, 4, 5, 6]);
        assert_eq!(latest.special, 7);
    }

    #[test]
    fn test_batch_roundtrip() {
        let conn = memory_db();
        let combos = vec![
            Combination { sequence_number: 1, numbers: vec![3, 7, 11, 20, 42, 49] },
            Combination { sequence_number: 2, numbers: vec![1, 7, 15, 28, 36, 42] },
        ];
        let id = insert_batch(&conn, "classic", false, 42, &[7], &combos).unwrap();

        let batches = fetch_batches(&conn, 10).unwrap();
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.batch_id, id);
        assert_eq!(batch.method, "classic");
        assert!(!batch.is_double);
        assert_eq!(batch.lucky_number, 42);
        assert_eq!(batch.selected, vec![7]);
        assert_eq!(batch.combinations, combos);
    }

    #[test]
    fn test_empty_batch_rejected() {
        let conn = memory_db();
        assert!(insert_batch(&conn, "classic", false, 42, &[], &[]).is_err());
    }
}
