mod batch;
mod db;
mod error;
mod http;
mod infinitives;
mod model;
mod output;
mod parser;
mod settings;
mod source;
mod variants;

use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use crate::batch::BatchOptions;
use crate::settings::{Overrides, Settings};
use crate::source::CacheSource;

#[derive(Parser)]
#[command(name = "verbes_academie", about = "French verb conjugation tables from the Académie dictionary")]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[arg(long, global = true)]
    max_retry: Option<u32>,
    /// Milliseconds between requests
    #[arg(long, global = true)]
    requests_delay: Option<u64>,
    #[arg(long, global = true)]
    max_threads: Option<usize>,
    #[arg(long, global = true)]
    user_agent: Option<String>,
    /// Reuse an existing dictionary session instead of opening one
    #[arg(long, global = true)]
    jsession_id: Option<String>,
    /// Download pages even when they are cached
    #[arg(long, global = true)]
    ignore_cache: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ProcessArgs {
    /// Also write the SQLite database
    #[arg(long)]
    gen_sqlite3: bool,
    /// Also write the flat legacy export
    #[arg(long)]
    legacy: bool,
    /// Max verbs to process (default: all)
    #[arg(short = 'n', long)]
    limit: Option<usize>,
}

impl From<ProcessArgs> for BatchOptions {
    fn from(args: ProcessArgs) -> Self {
        BatchOptions {
            gen_sqlite3: args.gen_sqlite3,
            legacy: args.legacy,
            limit: args.limit,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Download conjugation pages into the cache
    Fetch {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Parse cached pages and write the outputs
    Process(ProcessArgs),
    /// Fetch + process in one pipeline
    Run(ProcessArgs),
    /// Show database statistics
    Stats,
    /// Print the stored conjugation of one verb
    Lookup { infinitive: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();

    let t0 = Instant::now();
    let settings = Settings::load(&Overrides {
        user_agent: cli.user_agent,
        jsession_id: cli.jsession_id,
        max_retry: cli.max_retry,
        requests_delay: cli.requests_delay,
        max_threads: cli.max_threads,
        ignore_cache: cli.ignore_cache,
    })?;
    let cache = CacheSource::new(&settings.cache_dir);

    let result = match cli.command {
        Commands::Fetch { limit } => fetch(&settings, &cache, limit).await,
        Commands::Process(args) => {
            let report = batch::process(&settings, &cache, &args.into())?;
            report.print();
            Ok(())
        }
        Commands::Run(args) => {
            let t_fetch = Instant::now();
            fetch(&settings, &cache, args.limit).await?;
            println!("Fetched in {}", format_duration(t_fetch.elapsed()));

            let t_process = Instant::now();
            let report = batch::process(&settings, &cache, &args.into())?;
            println!("Processed in {}", format_duration(t_process.elapsed()));
            report.print();
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.database)?;
            let s = db::get_stats(&conn)?;
            println!("Verbs:         {}", s.verbs);
            println!("Conjugations:  {}", s.conjugations);
            println!("Participles:   {}", s.participles);
            println!("Variant pairs: {}", s.variant_pairs);
            Ok(())
        }
        Commands::Lookup { infinitive } => lookup(&settings, &infinitive),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn fetch(settings: &Settings, cache: &CacheSource, limit: Option<usize>) -> anyhow::Result<()> {
    let mut verbs = infinitives::fetch_infinitive_list(&settings.infinitives_file)?;
    if let Some(limit) = limit {
        verbs.truncate(limit);
    }
    println!("Fetching {} verbs into {}...", verbs.len(), cache.dir().display());
    let stats = http::fetch_all(settings, cache, &verbs).await?;
    println!(
        "Done: {} verbs ({} downloaded, {} cached, {} not found, {} errors).",
        stats.total, stats.ok, stats.cached, stats.not_found, stats.errors
    );
    Ok(())
}

fn lookup(settings: &Settings, infinitive: &str) -> anyhow::Result<()> {
    let conn = db::connect(&settings.database)?;
    let Some(verb) = db::fetch_verb(&conn, infinitive)? else {
        println!("'{}' is not in {}", infinitive, settings.database.display());
        return Ok(());
    };

    let mut flags = Vec::new();
    if verb.h_aspire {
        flags.push("h aspiré".to_string());
    }
    if let Some(variant) = &verb.rectification_1990_variante {
        flags.push(format!("1990 spelling pair: {}", variant));
    }
    if flags.is_empty() {
        println!("{}", verb.infinitive);
    } else {
        println!("{} ({})", verb.infinitive, flags.join(", "));
    }

    for line in db::fetch_tense_rows(&conn, verb.id)? {
        println!("\n{} / {} / {}", line.voice, line.mood, line.tense);
        for (person, form) in &line.persons {
            println!("  {:<4} {}", person, form.replace(output::relational::FORM_DELIMITER, ", "));
        }
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
