//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use sitedigest_core::{
    IngestCommand, Job, JobManager, JobOutput, Pipeline, account_id, save_artifacts,
};
use sitedigest_shared::{AppConfig, JobKind, JobStatus, JobsConfig, init_config, load_config};
use tracing::info;
use url::Url;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SiteDigest: web pages in, clean Markdown and business facts out.
#[derive(Parser)]
#[command(
    name = "sitedigest",
    version,
    about = "Turn a web page or a small site into cleaned Markdown plus structured facts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Convert one page to Markdown and extract its facts.
    Single {
        /// Page URL.
        url: String,

        /// Output directory (defaults to `[output].dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Crawl a seed page plus its topical sub-pages.
    Crawl {
        /// Seed URL.
        url: String,

        /// Output directory (defaults to `[output].dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Hand the full report to the ingestion process.
        #[arg(long)]
        ingest: bool,

        /// Ingestion table (defaults to one derived from the seed host). Implies --ingest.
        #[arg(long)]
        ingest_table: Option<String>,

        /// Ask the ingestion process to clear the table first.
        #[arg(long)]
        clear: bool,
    },

    /// Run the ingestion process on an existing Markdown file.
    Ingest {
        /// Markdown file to ingest.
        file: PathBuf,

        /// Target table.
        #[arg(long)]
        table: String,

        /// Clear the table before inserting.
        #[arg(long)]
        clear: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sitedigest=info",
        1 => "sitedigest=debug",
        _ => "sitedigest=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Single { url, out } => cmd_single(&url, out).await,
        Command::Crawl {
            url,
            out,
            ingest,
            ingest_table,
            clear,
        } => {
            let table = match (ingest, ingest_table) {
                (_, Some(table)) => Some(table),
                (true, None) => Some(account_id(&url)),
                (false, None) => None,
            };
            cmd_crawl(&url, out, table, clear).await
        }
        Command::Ingest { file, table, clear } => cmd_ingest(&file, &table, clear).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Job commands
// ---------------------------------------------------------------------------

async fn cmd_single(url: &str, out: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let job = run_job(&config, JobKind::Single, url).await?;

    let out_dir = out.unwrap_or_else(|| PathBuf::from(&config.output.dir));
    let paths = save_artifacts(&out_dir, &job)?;

    if let Some(JobOutput::Single { facts, .. }) = job.result() {
        println!("{}", serde_json::to_string_pretty(facts)?);
    }
    print_paths(&paths);
    Ok(())
}

async fn cmd_crawl(
    url: &str,
    out: Option<PathBuf>,
    ingest_table: Option<String>,
    clear: bool,
) -> Result<()> {
    let config = load_config()?;
    let job = run_job(&config, JobKind::Crawl, url).await?;

    let out_dir = out.unwrap_or_else(|| PathBuf::from(&config.output.dir));
    let paths = save_artifacts(&out_dir, &job)?;

    if let Some(JobOutput::Crawl(report)) = job.result() {
        println!();
        for page in &report.pages {
            let mark = if page.fetch_succeeded { "ok  " } else { "FAIL" };
            println!("  [{mark}] {} <{}>", page.link.text, page.link.url);
        }
        println!();
    }
    print_paths(&paths);

    let Some(table) = ingest_table else {
        return Ok(());
    };
    let report_path = paths
        .first()
        .ok_or_else(|| eyre!("no report was written for ingestion"))?;

    info!(table = %table, clear, "handing report to ingestion");
    let output = IngestCommand::from(&config.ingest)
        .run(report_path, &table, clear)
        .await?;
    print!("{}", output.stdout);
    println!("  Ingested into table `{table}`.");
    Ok(())
}

/// Submit one job, poll it to a terminal status behind a spinner, and shut down.
async fn run_job(config: &AppConfig, kind: JobKind, url: &str) -> Result<Job> {
    Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;

    let pipeline = Pipeline::from_config(config)?;
    let manager = JobManager::start(&JobsConfig::from(config), Arc::new(pipeline));
    let id = manager.submit(kind, url).await?;

    let spinner = spinner()?;
    spinner.set_message(format!("{kind} {url}: PENDING"));

    let job = loop {
        let job = manager
            .get_job(id)
            .await
            .ok_or_else(|| eyre!("job {id} disappeared"))?;
        spinner.set_message(format!("{kind} {url}: {}", job.status()));
        if job.status().is_terminal() {
            break job;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    };

    spinner.finish_and_clear();
    manager.shutdown().await;

    println!("  Job:    {id}");
    println!("  Status: {}", job.status());
    if let Some(done) = job.completed_at() {
        let elapsed = done - job.created_at();
        println!("  Time:   {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
    }

    match job.status() {
        JobStatus::Completed => Ok(job),
        _ => Err(eyre!(
            "job failed: {}",
            job.error().unwrap_or("no error message recorded")
        )),
    }
}

fn spinner() -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    Ok(spinner)
}

fn print_paths(paths: &[PathBuf]) {
    for path in paths {
        println!("  Saved:  {}", path.display());
    }
}

// ---------------------------------------------------------------------------
// Ingestion and config
// ---------------------------------------------------------------------------

async fn cmd_ingest(file: &Path, table: &str, clear: bool) -> Result<()> {
    if !file.is_file() {
        return Err(eyre!("no such file: {}", file.display()));
    }
    let config = load_config()?;
    let output = IngestCommand::from(&config.ingest)
        .run(file, table, clear)
        .await?;

    print!("{}", output.stdout);
    if !output.stderr.is_empty() {
        eprint!("{}", output.stderr);
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawl_flags_parse() {
        let cli = Cli::try_parse_from([
            "sitedigest",
            "-v",
            "crawl",
            "https://loja.example/",
            "--ingest-table",
            "loja",
            "--clear",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Crawl {
                url,
                ingest,
                ingest_table,
                clear,
                out,
            } => {
                assert_eq!(url, "https://loja.example/");
                assert!(!ingest);
                assert_eq!(ingest_table.as_deref(), Some("loja"));
                assert!(clear);
                assert!(out.is_none());
            }
            _ => panic!("expected crawl"),
        }
    }

    #[test]
    fn ingest_requires_table() {
        assert!(Cli::try_parse_from(["sitedigest", "ingest", "report.md"]).is_err());
    }
}
