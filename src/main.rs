//! critic-consensus - reduce several LLM critiques into one verdict
//!
//! A CLI tool that reads captured critic outputs, normalizes them against
//! a rubric and writes a single consensus report.
//!
//! Exit codes:
//!   0 - Success (verdict below threshold, or no --fail-on set)
//!   1 - Runtime error (config, rubric, unreadable input, etc.)
//!   2 - Consensus at or above the --fail-on threshold

use anyhow::{Context, Result};
use chrono::Utc;
use critic_consensus::analysis::{historical_average, ConsensusEngine};
use critic_consensus::cli::{Args, OutputFormat};
use critic_consensus::collect::{self, CriticSource, RetryPolicy};
use critic_consensus::config::{Config, CONFIG_FILE_NAME};
use critic_consensus::models::{Report, ReportMetadata};
use critic_consensus::report;
use critic_consensus::scanner::ScanConfig;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("critic-consensus v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Consensus failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default config file.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml()?;
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize critic order, retries and the rubric.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so a report written to stdout stays clean.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete consensus workflow. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let rubric = config.rubric.resolve()?;

    if args.print_rubric {
        let rendered = rubric.to_toml().context("Failed to render rubric")?;
        print!("{}", rendered);
        return Ok(0);
    }

    let engine = ConsensusEngine::new(rubric).context("Invalid rubric")?;
    info!("Using rubric: {}", engine.rubric().name);

    let scan_config = ScanConfig::from(&config.collect);
    let policy = RetryPolicy::from(&config.collect);

    // Step 1: Gather the critic outputs
    let sources = gather_sources(&args, &scan_config)?;
    if sources.is_empty() {
        anyhow::bail!("No critic outputs found");
    }
    let responses = collect::collect_critiques(&sources, &policy).await;

    // Step 2: Reduce them
    let mut consensus = engine.evaluate(&responses);

    if let Some(ref history_dir) = args.history {
        let past = collect::collect_history(&engine, history_dir, &scan_config, &policy).await?;
        consensus.historical_average = historical_average(&past);
    }

    let (flagged_sentences, highlighted_draft) = match args.draft {
        Some(ref draft_path) => {
            let draft = std::fs::read_to_string(draft_path)
                .with_context(|| format!("Failed to read draft {}", draft_path.display()))?;
            (
                report::flagged_sentences(&draft, &consensus),
                report::highlighted_draft(&draft, &consensus),
            )
        }
        None => (Vec::new(), None),
    };

    // Step 3: Build and write the report
    let source = match args.dir {
        Some(ref dir) => dir.display().to_string(),
        None => "command line".to_string(),
    };
    let metadata = ReportMetadata {
        source,
        generated_at: Utc::now(),
        critics_supplied: responses.len(),
        critics_failed: responses.len() - consensus.participants(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let report = Report {
        metadata,
        consensus,
        flagged_sentences,
        highlighted_draft,
    };

    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to {}", path.display());
        }
        None => print!("{}", output),
    }

    let consensus = &report.consensus;
    if !args.quiet {
        eprintln!("\n📊 Consensus Summary:");
        eprintln!(
            "   Critics: {} supplied, {} excluded",
            report.metadata.critics_supplied, report.metadata.critics_failed
        );
        eprintln!(
            "   Verdict: {} {} ({})",
            consensus.severity.emoji(),
            consensus.verdict,
            consensus.verdict_rule
        );
        if let Some(score) = consensus.overall_score {
            eprintln!("   Overall score: {}", score);
        }
    }

    if let Some(fail_level) = args.fail_on {
        if consensus.severity >= fail_level.severity() {
            eprintln!(
                "\n⛔ Consensus is {} (at or above {:?}). Failing (exit code 2).",
                consensus.verdict, fail_level
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Directory critics first, then `--critic` pairs. A `--critic` naming a
/// critic already found in the directory replaces its file.
fn gather_sources(args: &Args, scan_config: &ScanConfig) -> Result<Vec<CriticSource>> {
    let mut sources = match args.dir {
        Some(ref dir) => collect::discover(dir, scan_config)?,
        None => Vec::new(),
    };

    for critic in &args.critics {
        let source = CriticSource::new(critic.name.clone(), critic.path.clone());
        match sources
            .iter_mut()
            .find(|s| s.critic.eq_ignore_ascii_case(&critic.name))
        {
            Some(existing) => {
                warn!("--critic {} overrides {}", critic.name, existing.path.display());
                *existing = source;
            }
            None => sources.push(source),
        }
    }

    Ok(sources)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
