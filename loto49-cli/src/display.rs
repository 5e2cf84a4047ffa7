use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL, Cell, Color};

use crate::import::ImportResult;
use loto49_db::db::BatchRecord;
use loto49_db::models::Draw;
use loto49_engine::analysis::frequency::{FrequencyMode, NumberStats};
use loto49_engine::analysis::{tag_weights, WeightTag};
use loto49_engine::{GenerationBatch, Method, WeightVector};

fn format_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{:2}", n))
        .collect::<Vec<_>>()
        .join(" - ")
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn display_draws(draws: &[Draw]) {
    if draws.is_empty() {
        println!("No draws to show.");
        return;
    }

    let mut table = new_table(vec!["Draw", "Date", "Numbers", "Special"]);
    for draw in draws.iter().rev() {
        let mut sorted = draw.numbers;
        sorted.sort();
        table.add_row(vec![
            draw.draw_id.clone(),
            draw.date.to_string(),
            format_numbers(&sorted),
            format!("{:2}", draw.special),
        ]);
    }

    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import finished:");
    println!("  Lines read        : {}", result.total_records);
    println!("  Inserted          : {}", result.inserted);
    println!("  Duplicates skipped: {}", result.skipped);
    if result.errors > 0 {
        println!("  Errors            : {}", result.errors);
    }
}

/// `ranked` gives the row order; `stats` is indexed by number - 1.
pub fn display_stats(ranked: &[(u8, u32)], stats: &[NumberStats], mode: FrequencyMode, n_draws: usize) {
    println!("\nStatistics over {} draws ({:?})\n", n_draws, mode);

    let mut table = new_table(vec!["Number", "Frequency", "Gap"]);
    for &(number, frequency) in ranked {
        let gap = stats
            .get((number as usize).wrapping_sub(1))
            .map_or(n_draws as u32, |s| s.gap);
        table.add_row(vec![
            format!("{:2}", number),
            frequency.to_string(),
            gap.to_string(),
        ]);
    }
    println!("{table}");
}

pub fn display_weights(weights: &WeightVector, method: Method) {
    println!("\nSampling weights ({method})\n");

    let mut tagged = tag_weights(weights);
    tagged.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut table = new_table(vec!["Number", "Weight", "Tag"]);
    for (number, weight, tag) in &tagged {
        let color = match tag {
            WeightTag::Hot => Color::Green,
            WeightTag::Cold => Color::Red,
            WeightTag::Normal => Color::White,
        };
        table.add_row(vec![
            Cell::new(format!("{:2}", number)),
            Cell::new(format!("{:.4}", weight)),
            Cell::new(tag.to_string()).fg(color),
        ]);
    }
    println!("{table}");
}

pub fn display_batch(batch: &GenerationBatch) {
    println!("\nCombinations ({})\n", batch.method);

    let mut table = new_table(vec!["#", "Numbers"]);
    for combo in &batch.combinations {
        table.add_row(vec![combo.sequence_number.to_string(), format_numbers(&combo.numbers)]);
    }
    println!("{table}");

    if batch.duplicates_accepted > 0 {
        println!(
            "Note: {} duplicate combination(s) kept, the remaining pool is too small.",
            batch.duplicates_accepted
        );
    }
}

pub fn display_saved_batches(batches: &[BatchRecord]) {
    if batches.is_empty() {
        println!("No saved batches.");
        return;
    }

    for batch in batches {
        let selected = if batch.selected.is_empty() {
            "none".to_string()
        } else {
            format_numbers(&batch.selected)
        };
        println!(
            "\nBatch {} | {} | {}{} | lucky {} | selected {}",
            batch.batch_id,
            batch.created_at.format("%Y-%m-%d %H:%M"),
            batch.method,
            if batch.is_double { " (double)" } else { "" },
            batch.lucky_number,
            selected,
        );

        let mut table = new_table(vec!["#", "Numbers"]);
        for combo in &batch.combinations {
            table.add_row(vec![combo.sequence_number.to_string(), format_numbers(&combo.numbers)]);
        }
        println!("{table}");
    }
}
