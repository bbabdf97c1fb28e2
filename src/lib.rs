//! # web2zip
//!
//! Harvest the images referenced by a web page, filter them by pixel
//! dimensions, optionally describe each with a remote vision model, and
//! package everything into a single downloadable ZIP archive.
//!
//! ## Pipeline Overview
//!
//! ```text
//! page URL
//!  │
//!  ├─ 1. Extract   fetch the page, collect deduplicated <img> URLs
//!  ├─ 2. Fetch     concurrent download + decode, true pixel dimensions
//!  ├─ 3. Filter    inclusive width/height range supplied by the caller
//!  ├─ 4. Describe  (optional) vision-model call per image, retry + backoff
//!  └─ 5. Archive   deterministic in-memory ZIP of images + descriptions
//! ```
//!
//! Per-image failures never abort a run: a bad image is logged and dropped,
//! a failed description becomes that image's status text. Only the page
//! itself is fatal.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use web2zip::{harvest, FilterRange, HarvestConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key for descriptions read from GEMINI_API_KEY
//!     let config = HarvestConfig::builder()
//!         .filter(FilterRange::new(300, 4000, 300, 4000))
//!         .analyze(true)
//!         .build()?;
//!     let output = harvest("https://example.com/gallery", &config).await?;
//!     eprintln!("{} images kept", output.images.len());
//!     std::fs::write("images.zip", output.to_zip()?)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `web2zip` binary (clap + anyhow + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! web2zip = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod archive;
pub mod config;
pub mod error;
pub mod harvest;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use archive::build_archive;
pub use config::{HarvestConfig, HarvestConfigBuilder, DEFAULT_USER_AGENT};
pub use error::{HarvestError, ItemError};
pub use harvest::{harvest, harvest_to_file};
pub use output::{AnalyzedImage, DescriptionStatus, FetchedImage, HarvestOutput, HarvestStats};
pub use pipeline::filter::FilterRange;
pub use progress::{HarvestProgressCallback, NoopProgressCallback, ProgressCallback};
