//! Command-line interface for importing Lexin dictionaries into SQLite.
//!
//! Reads a Lexin XML export and stores it in a normalized SQLite database,
//! appending to an existing dictionary for the same language pair.

use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use lexin_rs::{
    ImportConfig, ImportSummary,
    config::DEFAULT_DB_PATH,
    error::Result,
    progress::{ProgressCallback, ProgressUpdate},
};
use log::{LevelFilter, error, info};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Import Lexin XML dictionaries into SQLite", long_about = None)]
struct Cli {
    /// Path to the XML dictionary file (.xml or .xml.gz)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Path to the SQLite database file
    #[arg(long, default_value = DEFAULT_DB_PATH)]
    db: PathBuf,

    /// Target language code, e.g. "en"
    #[arg(long)]
    target: Option<String>,

    /// Hide the progress bar
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    /// Set verbosity level (use -v, -vv, or -vvv for increasing verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Sets up logging based on verbosity level. `RUST_LOG` takes precedence.
fn setup_logging(verbose: u8) {
    let log_level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter(None, log_level)
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

/// Creates a progress callback that drives a single progress bar.
fn create_progress_callback(pb: ProgressBar) -> ProgressCallback {
    Box::new(move |update: ProgressUpdate| {
        if update.current_item == 0 {
            pb.set_length(update.total_items.unwrap_or(0));
            pb.set_prefix(update.stage_description);
            pb.set_position(0);
        } else {
            pb.set_position(update.current_item);
            if let Some(msg) = update.message {
                pb.set_message(msg);
            }
        }
        true
    })
}

fn new_progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template(
            "{prefix:>12.cyan.bold} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_summary(summary: &ImportSummary) {
    let action = if summary.created { "Created" } else { "Updated" };
    println!(
        "{} dictionary {} -> {} ({} words parsed in {:.2?}, stored in {:.2?})",
        action.green().bold(),
        summary.base_lang.cyan(),
        summary.target_lang.cyan(),
        summary.words_parsed,
        summary.parse_time,
        summary.store_time,
    );
    println!(
        "Successfully imported {} entries. Dictionary from {} to {} is now available in {}",
        summary.entry_count.to_string().bold(),
        summary.base_lang,
        summary.target_lang,
        summary.db_path.display().to_string().yellow(),
    );
}

fn run(cli: Cli) -> Result<()> {
    let config = ImportConfig::new(cli.file, cli.db, cli.target)?;
    info!("Importing {:?} into {:?}", config.source, config.db_path);

    let pb = new_progress_bar(cli.quiet);
    let mut callback = create_progress_callback(pb.clone());
    let result = lexin_rs::run_import(&config, Some(&mut callback));
    pb.finish_and_clear();
    std::io::stdout().flush().ok();

    print_summary(&result?);
    Ok(())
}

/// Main entry point for the CLI application.
fn main() {
    // --version / -V is handled by clap and exits with status 0
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        error!("Import failed: {}", e);
        eprintln!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}
