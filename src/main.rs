//! Command-line interface for the yomidict_rs dictionary loader.
//!
//! Takes a term bank (file or directory) and a tag bank file, and
//! materializes them into a SQLite database with normalized lookup and
//! join tables.

use clap::Parser;
use colored::*;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{LevelFilter, error, info};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use yomidict_rs::{
    Dictionary, LoadOptions,
    error::Result,
    progress::{ProgressCallback, ProgressUpdate},
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Dictionary bank loader", long_about = None)]
struct Cli {
    /// A term bank JSON file, or a directory containing term_bank_*.json files
    term_bank_path: PathBuf,

    /// The tag bank JSON file defining the controlled vocabularies
    tag_bank_path: PathBuf,

    /// Path to the database file to create or update (default: dictionary.db)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Set verbosity level (use -v, -vv, or -vvv for increasing verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Sets up logging based on verbosity level.
fn setup_logging(verbose: u8) {
    let log_level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter(None, log_level)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

/// Creates a progress callback for displaying load progress.
fn create_progress_callback(
    multi_progress: MultiProgress,
    progress_bars: Arc<Mutex<HashMap<String, ProgressBar>>>,
) -> ProgressCallback {
    Box::new(move |update: ProgressUpdate| {
        let mut bars = progress_bars.lock().unwrap();

        if update.current_item == 0 && !bars.contains_key(&update.stage_description) {
            // Create new progress bar for this stage
            let pb = multi_progress.add(ProgressBar::new(update.total_items.unwrap_or(0)));
            let style_template = if update.total_items.is_some() {
                "{prefix:>12.cyan.bold} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} ({percent}%) {msg}"
            } else {
                "{prefix:>12.cyan.bold} [{elapsed_precise}] {spinner} {msg}"
            };

            pb.set_style(
                ProgressStyle::default_bar()
                    .template(style_template)
                    .unwrap()
                    .progress_chars("##-"),
            );
            pb.set_prefix(update.stage_description.clone());
            pb.set_message(update.message.unwrap_or_default());
            pb.enable_steady_tick(Duration::from_millis(100));
            bars.insert(update.stage_description.clone(), pb);
        } else if let Some(pb) = bars.get(&update.stage_description) {
            // Update existing progress bar
            pb.set_position(update.current_item);
            if let Some(msg) = update.message {
                pb.set_message(msg);
            }
            if let Some(total) = update.total_items {
                if update.current_item >= total {
                    pb.finish_and_clear();
                }
            }
        }
        true
    })
}

/// Main entry point for the CLI application.
fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    info!("Loading dictionary banks...");

    let multi_progress = MultiProgress::new();
    let progress_bars = Arc::new(Mutex::new(HashMap::<String, ProgressBar>::new()));
    let callback = create_progress_callback(multi_progress.clone(), progress_bars.clone());

    let load_options = LoadOptions {
        term_bank_path: cli.term_bank_path,
        tag_bank_path: cli.tag_bank_path,
        db_path: cli.db_path,
    };

    let dict = match Dictionary::load_with_options(load_options, Some(callback)) {
        Ok(dict) => dict,
        Err(e) => {
            error!("Failed to load dictionary: {}", e);
            eprintln!("{}", format!("Error: {}", e).red());
            std::process::exit(1);
        }
    };

    // Clean up progress bars
    {
        let bars = progress_bars.lock().unwrap();
        for (_, pb) in bars.iter() {
            pb.finish_and_clear();
        }
    }
    drop(multi_progress); // Explicitly drop to ensure cleanup
    std::io::stdout().flush().ok();

    match dict.table_counts() {
        Ok(counts) => {
            println!(
                "{} {}",
                "Dictionary loaded into".green(),
                dict.db_path().display().to_string().bold()
            );
            for (table, count) in counts {
                println!("  {:>20}: {}", table, count);
            }
        }
        Err(e) => {
            error!("Failed to read table counts: {}", e);
            eprintln!("{}", format!("Error reading summary: {}", e).red());
            std::process::exit(1);
        }
    }

    Ok(())
}
