//! CLI binary for web2zip.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `HarvestConfig` and writes the resulting archive to disk.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use web2zip::{
    harvest, FilterRange, HarvestConfig, HarvestProgressCallback, ProgressCallback,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar that tracks the fetch stage, then is
/// re-armed for the analysis stage. Positions arrive in completion order
/// from concurrent workers; the counters themselves are monotonic.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Extracting");
        bar.set_message("Fetching page…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn arm(&self, prefix: &'static str, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos:>3}/{len}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(style);
        self.bar.set_prefix(prefix);
    }
}

impl HarvestProgressCallback for CliProgressCallback {
    fn on_extract_complete(&self, candidate_count: usize) {
        self.bar
            .println(format!("  {} candidate images found", bold(&candidate_count.to_string())));
        self.arm("Fetching", candidate_count);
    }

    fn on_fetch_progress(&self, completed: usize, _total: usize) {
        self.bar.set_position(completed as u64);
    }

    fn on_analyze_start(&self, total: usize) {
        self.arm("Describing", total);
    }

    fn on_analyze_progress(&self, completed: usize, _total: usize) {
        self.bar.set_position(completed as u64);
    }

    fn on_harvest_complete(&self, kept: usize, described: usize) {
        self.bar.finish_and_clear();
        if described > 0 {
            eprintln!(
                "{} {} images kept, {} described",
                green("✔"),
                bold(&kept.to_string()),
                bold(&described.to_string())
            );
        } else {
            eprintln!("{} {} images kept", green("✔"), bold(&kept.to_string()));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Grab every image from a page into images.zip
  web2zip https://example.com/gallery

  # Only images at least 300px in both dimensions
  web2zip --min-width 300 --min-height 300 https://example.com/gallery

  # Also generate an AI description per image (needs GEMINI_API_KEY)
  web2zip --describe https://example.com/gallery -o gallery.zip

  # Stats as JSON on stdout
  web2zip --json https://example.com/gallery

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY    API key for the description service

The archive contains one {i}_{width}x{height}.{jpg|png} member per image,
plus a matching {i}_{width}x{height}_description.txt when --describe ran.
"#;

/// Download, filter, and describe the images referenced by a web page.
#[derive(Parser, Debug)]
#[command(
    name = "web2zip",
    version,
    about = "Harvest a web page's images into a ZIP archive",
    long_about = "Harvest the images referenced by a web page: fetch them concurrently, keep the \
ones matching the requested pixel-dimension range, optionally describe each with a vision model, \
and package images plus descriptions into one ZIP archive.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// HTTP/HTTPS URL of the page to harvest.
    url: String,

    /// Write the archive to this file.
    #[arg(short, long, env = "WEB2ZIP_OUTPUT", default_value = "images.zip")]
    output: PathBuf,

    /// Minimum image width in pixels (inclusive).
    #[arg(long, default_value_t = 0)]
    min_width: u32,

    /// Maximum image width in pixels (inclusive; unbounded if omitted).
    #[arg(long)]
    max_width: Option<u32>,

    /// Minimum image height in pixels (inclusive).
    #[arg(long, default_value_t = 0)]
    min_height: u32,

    /// Maximum image height in pixels (inclusive; unbounded if omitted).
    #[arg(long)]
    max_height: Option<u32>,

    /// Describe each kept image with the vision model.
    #[arg(long, env = "WEB2ZIP_DESCRIBE")]
    describe: bool,

    /// Number of concurrent fetches / description calls.
    #[arg(short, long, env = "WEB2ZIP_CONCURRENCY", default_value_t = 10)]
    concurrency: usize,

    /// Maximum attempts per description call.
    #[arg(long, env = "WEB2ZIP_MAX_ATTEMPTS", default_value_t = 5)]
    max_attempts: u32,

    /// Description-service API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Description-service endpoint override.
    #[arg(long, env = "WEB2ZIP_ENDPOINT")]
    endpoint: Option<String>,

    /// Custom description prompt.
    #[arg(long, env = "WEB2ZIP_PROMPT")]
    prompt: Option<String>,

    /// Source-page request timeout in seconds.
    #[arg(long, env = "WEB2ZIP_PAGE_TIMEOUT", default_value_t = 15)]
    page_timeout: u64,

    /// Per-image request timeout in seconds.
    #[arg(long, env = "WEB2ZIP_IMAGE_TIMEOUT", default_value_t = 10)]
    image_timeout: u64,

    /// Per-description-call timeout in seconds.
    #[arg(long, env = "WEB2ZIP_API_TIMEOUT", default_value_t = 30)]
    api_timeout: u64,

    /// Print run statistics as JSON on stdout.
    #[arg(long, env = "WEB2ZIP_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "WEB2ZIP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "WEB2ZIP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "WEB2ZIP_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn HarvestProgressCallback>)
    } else {
        None
    };

    let filter_range = FilterRange::new(
        cli.min_width,
        cli.max_width.unwrap_or(u32::MAX),
        cli.min_height,
        cli.max_height.unwrap_or(u32::MAX),
    );

    let mut builder = HarvestConfig::builder()
        .filter(filter_range)
        .analyze(cli.describe)
        .concurrency(cli.concurrency)
        .max_attempts(cli.max_attempts)
        .page_timeout_secs(cli.page_timeout)
        .image_timeout_secs(cli.image_timeout)
        .api_timeout_secs(cli.api_timeout);
    if let Some(key) = cli.api_key.clone() {
        builder = builder.api_key(key);
    }
    if let Some(endpoint) = cli.endpoint.clone() {
        builder = builder.api_endpoint(endpoint);
    }
    if let Some(prompt) = cli.prompt.clone() {
        builder = builder.prompt(prompt);
    }
    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let output = harvest(&cli.url, &config).await.context("Harvest failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output.stats).context("Failed to serialise stats")?
        );
    }

    // A page that yielded no matching images is a normal outcome, just not
    // one worth writing an empty archive for.
    if output.is_empty() {
        if !cli.quiet {
            eprintln!(
                "{} No images matched the filter on {} ({} candidates, {} fetch failures)",
                yellow("⚠"),
                cli.url,
                output.stats.candidate_urls,
                output.stats.fetch_failures,
            );
        }
        return Ok(());
    }

    let bytes = output.to_zip().context("Failed to build archive")?;

    // Atomic write: temp file + rename
    if let Some(parent) = cli.output.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let tmp_path = cli.output.with_extension("zip.tmp");
    tokio::fs::write(&tmp_path, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    tokio::fs::rename(&tmp_path, &cli.output)
        .await
        .with_context(|| format!("Failed to move archive into {}", cli.output.display()))?;

    if !cli.quiet {
        let described = output.stats.described;
        eprintln!(
            "{}  {} images{}  {}  →  {}",
            green("✔"),
            output.images.len(),
            if described > 0 {
                format!(" ({described} described)")
            } else {
                String::new()
            },
            dim(&format!("{} bytes", bytes.len())),
            bold(&cli.output.display().to_string()),
        );
    }

    Ok(())
}
