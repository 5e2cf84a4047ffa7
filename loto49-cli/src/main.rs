mod display;
mod import;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, TimeDelta};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use loto49_db::db::{
    count_draws, db_path, fetch_batches, fetch_draws_since, fetch_last_draws, fetch_latest_draw,
    insert_batch, insert_draw, migrate, open_db,
};
use loto49_db::models::{validate_draw, Draw, WINNING_COUNT};
use loto49_db::rusqlite::Connection;
use loto49_engine::analysis::frequency::{compute_frequency, compute_stats, FrequencyMode};
use loto49_engine::generator::strategy_weights;
use loto49_engine::{generate_seeded, GenerationRequest, GeneratorConfig, Method};

use crate::display::{
    display_batch, display_draws, display_import_summary, display_saved_batches, display_stats,
    display_weights,
};

#[derive(Parser)]
#[command(name = "loto49", about = "Combination generator for 6/49 draws")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import draws from a CSV file
    Import {
        /// Path to the CSV file (id;dd/mm/yyyy;n1..n6;special)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print the database path
    DbPath,

    /// List the latest draws
    List {
        /// Number of draws to show
        #[arg(short, long, default_value = "10")]
        last: u32,
    },

    /// Frequency and gap statistics
    Stats {
        /// Analysis window in days
        #[arg(short, long, default_value = "365")]
        window: i64,

        /// Ordering of the table
        #[arg(short, long, default_value = "hot")]
        mode: FrequencyMode,
    },

    /// Show the weight vector a method samples from
    Weights {
        #[arg(short, long, default_value = "ensemble")]
        method: Method,

        /// Analysis window in days
        #[arg(short, long, default_value = "365")]
        window: i64,

        /// JSON generator config
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Generate a batch of combinations
    Generate {
        #[arg(short, long, default_value = "classic")]
        method: Method,

        /// Number of combinations
        #[arg(short, long, default_value = "5")]
        count: u32,

        /// Numbers every combination must contain (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        selected: Vec<u8>,

        /// Lucky number included in every combination
        #[arg(short, long)]
        lucky: u8,

        /// 7-number combinations instead of 6
        #[arg(long)]
        double: bool,

        /// Analysis window in days
        #[arg(short, long, default_value = "365")]
        window: i64,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Assemble the batch on all cores
        #[arg(long)]
        parallel: bool,

        /// Store the batch in the database
        #[arg(long)]
        save: bool,

        /// Print the batch as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// JSON generator config
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show saved batches
    History {
        /// Number of batches
        #[arg(short, long, default_value = "5")]
        last: u32,
    },

    /// Add a draw manually
    Add,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let path = db_path();
    let conn = open_db(&path)?;
    migrate(&conn)?;

    match cli.command {
        Command::Import { file } => cmd_import(&conn, &file),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::List { last } => cmd_list(&conn, last),
        Command::Stats { window, mode } => cmd_stats(&conn, window, mode),
        Command::Weights { method, window, config } => cmd_weights(&conn, method, window, config.as_deref()),
        Command::Generate {
            method,
            count,
            selected,
            lucky,
            double,
            window,
            seed,
            parallel,
            save,
            json,
            config,
        } => {
            let request = GenerationRequest {
                combination_count: count,
                selected_numbers: selected,
                lucky_number: lucky,
                is_double: double,
                method,
            };
            let mut config = load_config(config.as_deref())?;
            config.parallel |= parallel;
            cmd_generate(&conn, &request, window, seed, &config, save, json)
        }
        Command::History { last } => cmd_history(&conn, last),
        Command::Add => cmd_add(&conn),
    }
}

fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    let Some(path) = path else {
        return Ok(GeneratorConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config {:?}", path))?;
    let config: GeneratorConfig = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config {:?}", path))?;
    Ok(config)
}

fn window_start(days: i64) -> Result<NaiveDate> {
    window_start_from(Local::now().date_naive(), days)
}

fn window_start_from(today: NaiveDate, days: i64) -> Result<NaiveDate> {
    if days < 1 {
        bail!("The window must cover at least one day");
    }
    match TimeDelta::try_days(days).and_then(|span| today.checked_sub_signed(span)) {
        Some(start) => Ok(start),
        None => bail!("Window of {days} days is out of range"),
    }
}

fn cmd_import(conn: &Connection, file: &Path) -> Result<()> {
    let result = import::import_csv(conn, file)?;
    display_import_summary(&result);
    Ok(())
}

fn cmd_list(conn: &Connection, last: u32) -> Result<()> {
    if count_draws(conn)? == 0 {
        println!("Empty database. Run first: loto49 import --file <csv>");
        return Ok(());
    }
    let draws = fetch_last_draws(conn, last)?;
    display_draws(&draws);
    Ok(())
}

fn cmd_stats(conn: &Connection, days: i64, mode: FrequencyMode) -> Result<()> {
    if count_draws(conn)? == 0 {
        println!("Empty database. Run first: loto49 import --file <csv>");
        return Ok(());
    }
    let draws = fetch_draws_since(conn, window_start(days)?)?;
    let ranked = compute_frequency(&draws, mode);
    let stats = compute_stats(&draws);
    display_stats(&ranked, &stats, mode, draws.len());
    Ok(())
}

fn cmd_weights(conn: &Connection, method: Method, days: i64, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let history = fetch_draws_since(conn, window_start(days)?)?;
    let last = fetch_latest_draw(conn)?;
    let weights = strategy_weights(method, &history, last.as_ref(), &config)?;
    display_weights(&weights, method);
    Ok(())
}

fn cmd_generate(
    conn: &Connection,
    request: &GenerationRequest,
    days: i64,
    seed: Option<u64>,
    config: &GeneratorConfig,
    save: bool,
    json: bool,
) -> Result<()> {
    let history = fetch_draws_since(conn, window_start(days)?)?;
    let last = fetch_latest_draw(conn)?;

    let batch = generate_seeded(request, &history, last.as_ref(), config, seed)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&batch)?);
    } else {
        display_batch(&batch);
    }

    if save {
        let id = insert_batch(
            conn,
            batch.method.as_str(),
            request.is_double,
            request.lucky_number,
            &request.selected_numbers,
            &batch.combinations,
        )?;
        if !json {
            println!("Saved as batch {}.", id);
        }
    }
    Ok(())
}

fn cmd_history(conn: &Connection, last: u32) -> Result<()> {
    let batches = fetch_batches(conn, last)?;
    display_saved_batches(&batches);
    Ok(())
}

fn cmd_add(conn: &Connection) -> Result<()> {
    println!("Add a draw manually\n");

    let draw_id = prompt("Draw id (e.g. 24/015): ")?;
    let date = import::parse_date(&prompt("Date (DD/MM/YYYY): ")?)?;

    let numbers = prompt_numbers()?;
    let special = prompt_special(&numbers)?;

    validate_draw(&numbers, special)?;

    let draw = Draw {
        draw_id,
        date,
        numbers,
        special,
    };

    println!("\nDraw to insert:");
    display_draws(std::slice::from_ref(&draw));

    let confirm = prompt("\nConfirm insertion? (y/n): ")?;
    if confirm.trim().eq_ignore_ascii_case("y") {
        if insert_draw(conn, &draw)? {
            println!("Draw inserted.");
        } else {
            println!("This draw already exists (duplicate ignored).");
        }
    } else {
        println!("Insertion cancelled.");
    }

    Ok(())
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Read error")?;
    Ok(input.trim().to_string())
}

fn prompt_numbers() -> Result<[u8; WINNING_COUNT]> {
    loop {
        let input = prompt("6 numbers (space separated, 1-49): ")?;
        let nums: Result<Vec<u8>, _> = input.split_whitespace().map(|s| s.parse::<u8>()).collect();
        match nums {
            Ok(v) if v.len() == WINNING_COUNT => {
                let mut arr = [0u8; WINNING_COUNT];
                arr.copy_from_slice(&v);
                // any in-range special that is not among the numbers
                let probe = (1..=49).find(|n| !arr.contains(n)).unwrap_or(49);
                if validate_draw(&arr, probe).is_ok() {
                    return Ok(arr);
                }
                println!("Invalid numbers (1-49, no duplicates). Try again.");
            }
            _ => println!("Enter exactly 6 numbers. Try again."),
        }
    }
}

fn prompt_special(numbers: &[u8; WINNING_COUNT]) -> Result<u8> {
    loop {
        let input = prompt("Special number (1-49): ")?;
        match input.parse::<u8>() {
            Ok(s) if validate_draw(numbers, s).is_ok() => return Ok(s),
            _ => println!("Invalid special number (1-49, not among the numbers). Try again."),
        }
    }
}
