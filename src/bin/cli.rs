//! trails-cli - Debug tool for travel aggregation and trail scheduling
//!
//! Usage:
//!   trails-cli plan <corpus> [--author <a>] [--title <t>] [--from <year>] [--to <year>]
//!   trails-cli stats <corpus>
//!
//! Loads a corpus resource (a JSON file, or a URL when built with the
//! `http` feature), applies one filter and prints the ranked cities, the
//! deduplicated travel segments and the reveal schedule of the animation.

use clap::{Args, Parser, Subcommand};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;
use travel_trails::{
    great_circle_distance, instant_plan, Corpus, CorpusStats, FilterPredicate, FilterQuery,
    OptionExt, Result, TrailConfig, TrailEngine, TrailError,
};

#[derive(Parser)]
#[command(name = "trails-cli")]
#[command(about = "Debug tool for travel aggregation and trail scheduling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter the corpus and print cities, segments and the reveal schedule
    Plan(PlanArgs),

    /// Print corpus statistics
    Stats {
        /// Corpus JSON file (or URL with the `http` feature)
        corpus: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct PlanArgs {
    /// Corpus JSON file (or URL with the `http` feature)
    corpus: String,

    /// Author substring (case-insensitive)
    #[arg(short, long, default_value = "")]
    author: String,

    /// Title substring (case-insensitive)
    #[arg(short, long, default_value = "")]
    title: String,

    /// First year included
    #[arg(long, default_value = "")]
    from: String,

    /// Last year included
    #[arg(long, default_value = "")]
    to: String,

    /// Maximum number of cities (defaults to the configuration)
    #[arg(long)]
    max_results: Option<usize>,

    /// Map zoom level
    #[arg(long)]
    zoom: Option<f64>,

    /// Draw-speed slider value (points per ms = speed / 40)
    #[arg(long)]
    speed: Option<f64>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reveal everything at once instead of animating
    #[arg(long = "static")]
    static_display: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Plan(args) => run_plan(&args, cli.verbose),
        Commands::Stats { corpus, json } => run_stats(&corpus, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "http")]
fn fetch_remote(source: &str) -> Option<Result<Corpus>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        Some(travel_trails::fetch_corpus_blocking(source))
    } else {
        None
    }
}

#[cfg(not(feature = "http"))]
fn fetch_remote(_source: &str) -> Option<Result<Corpus>> {
    None
}

fn load_corpus(source: &str) -> Result<Corpus> {
    fetch_remote(source).unwrap_or_else(|| Corpus::from_file(source))
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| TrailError::Internal {
        message: e.to_string(),
    })
}

fn heading(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
}

fn run_plan(args: &PlanArgs, verbose: bool) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => TrailConfig::from_file(path)?,
        None => TrailConfig::default(),
    };
    if let Some(speed) = args.speed {
        config.set_draw_speed(speed)?;
    }

    let mut engine = TrailEngine::with_config(config);
    engine.load_corpus(load_corpus(&args.corpus)?);
    if let Some(zoom) = args.zoom {
        engine.set_zoom(zoom)?;
    }

    let predicate = FilterPredicate::from_form(&args.author, &args.title, &args.from, &args.to)?;
    let mut query = FilterQuery::new(predicate);
    if let Some(max_results) = args.max_results {
        query = query.with_max_results(max_results);
    }

    let id = engine.add_filter();
    let summary = engine.filter(id, query)?;
    let plan = if args.static_display {
        instant_plan(engine.session(id)?.segments().as_slice())
    } else {
        engine.animate(id)?
    };

    let session = engine.session(id)?;

    if args.json {
        let output = serde_json::json!({
            "summary": summary,
            "cities": session.cities(),
            "segments": session.segments().as_slice(),
            "plan": plan,
        });
        println!("{}", to_pretty_json(&output)?);
        return Ok(());
    }

    heading(&format!(
        "Cities: {} ({} citations, zoom {})",
        summary.cities,
        summary.entries,
        engine.zoom()
    ));
    for city in session.cities() {
        let visible = if engine.is_city_visible(city) { "" } else { "  (hidden)" };
        println!(
            "  {:<40} width {:>6.1}{}",
            city.label(),
            engine.city_width(city.occurrence_count()),
            visible
        );
        if verbose && !city.alternate_descriptions.is_empty() {
            println!("      also: {}", city.alternate_descriptions.join(", "));
        }
    }

    heading(&format!("Segments: {}", summary.segments));
    for segment in session.segments().iter() {
        println!(
            "  {:<40} {:>7.0} km  stroke {:>5.1}  {} fragment(s), {} points",
            segment.label(),
            great_circle_distance(segment.from, segment.to) / 1000.0,
            engine.travel_width(segment.occurrence_count()),
            segment.fragments.len(),
            segment.point_count()
        );
    }

    heading(&format!(
        "Reveal schedule: {} steps, finished at {:.0} ms",
        plan.len(),
        plan.finish_ms
    ));
    for step in &plan.steps {
        let segment = session
            .segments()
            .as_slice()
            .get(step.segment)
            .ok_or_internal("reveal step refers to a missing segment")?;
        println!(
            "  {:>9.1} ms  +{:>7.1} ms  {} [{}]",
            step.delay_ms, step.draw_ms, segment.description, step.fragment
        );
    }

    if verbose && !args.static_display {
        let reveals = engine.advance(plan.finish_ms);
        println!(
            "\nReplayed {} reveals, state {:?}",
            reveals.len(),
            engine.session_state(id)?
        );
    }

    Ok(())
}

fn run_stats(source: &str, json: bool) -> Result<()> {
    let corpus = load_corpus(source)?;
    let stats: CorpusStats = corpus.stats;

    let entries = corpus
        .mentions
        .iter()
        .map(|m| &m.entry)
        .chain(corpus.travels.iter().flat_map(|t| t.entries.iter()));
    let mut authors = BTreeSet::new();
    let mut titles = BTreeSet::new();
    let mut years: Option<(i32, i32)> = None;
    for entry in entries {
        authors.insert(entry.author.as_str());
        titles.insert(entry.title.as_str());
        years = Some(match years {
            Some((lo, hi)) => (lo.min(entry.year), hi.max(entry.year)),
            None => (entry.year, entry.year),
        });
    }

    if json {
        let output = serde_json::json!({
            "stats": stats,
            "authors": authors.len(),
            "titles": titles.len(),
            "years": years,
        });
        println!("{}", to_pretty_json(&output)?);
        return Ok(());
    }

    heading(&format!("Corpus: {}", source));
    println!("  City rows:     {}", stats.city_rows);
    println!("  Travel rows:   {}", stats.travel_rows);
    println!("  Mentions:      {}", stats.mentions);
    println!("  Travels:       {}", stats.travels);
    println!("  Skipped:       {}", stats.skipped);
    println!("  Authors:       {}", authors.len());
    println!("  Titles:        {}", titles.len());
    if let Some((lo, hi)) = years {
        println!("  Years:         {}-{}", lo, hi);
    }
    Ok(())
}
