//! Error types for the web2zip library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`HarvestError`] — **Fatal**: the run cannot proceed at all (bad page
//!   URL, the page itself unreachable, broken configuration). Returned as
//!   `Err(HarvestError)` from the top-level `harvest*` functions.
//!
//! * [`ItemError`] — **Non-fatal**: a single image failed (origin returned
//!   an error page, body is not a decodable image) but all other images are
//!   fine. Failed items are logged and dropped from the result set; the run
//!   continues.
//!
//! Description-service failures are not errors at all: they are terminal
//! values carried in [`crate::output::DescriptionStatus`], because one
//! image's description failure must never abort the batch.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the web2zip library.
///
/// Per-image failures use [`ItemError`] and never surface here.
#[derive(Debug, Error)]
pub enum HarvestError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The page URL is not syntactically valid.
    #[error("Invalid page URL '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    /// The source page could not be retrieved or read.
    #[error("Failed to fetch page '{url}': {reason}\nCheck the URL and your network connection.")]
    PageFetch { url: String, reason: String },

    /// The source page request exceeded the configured timeout.
    #[error("Page fetch timed out after {secs}s for '{url}'")]
    PageTimeout { url: String, secs: u64 },

    /// The source page responded with a non-success status.
    #[error("Page '{url}' returned HTTP {status}")]
    PageStatus { url: String, status: u16 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Run control ───────────────────────────────────────────────────────
    /// The caller cancelled the run via the configured cancellation token.
    #[error("Harvest cancelled")]
    Cancelled,

    // ── Archive errors ────────────────────────────────────────────────────
    /// Archive assembly hit an internal limit or write fault. Should not
    /// occur for well-formed inputs.
    #[error("Archive build failed: {detail}")]
    ArchiveBuild { detail: String },

    /// Could not create or write the output archive file.
    #[error("Failed to write archive '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
///
/// Logged at `warn` level when the item is dropped. The overall harvest
/// continues regardless of how many items fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The image origin responded with a non-success status.
    #[error("'{url}' returned HTTP {status}")]
    Http { url: String, status: u16 },

    /// Connection-level failure fetching the image.
    #[error("network error fetching '{url}': {reason}")]
    Network { url: String, reason: String },

    /// The image request exceeded the configured timeout.
    #[error("fetch of '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The response body is not a decodable image.
    #[error("could not decode image from '{url}': {reason}")]
    Decode { url: String, reason: String },
}
