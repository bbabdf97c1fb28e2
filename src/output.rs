//! Result types produced by a harvest run.
//!
//! Everything here is plain data: the pipeline builds these values once and
//! never mutates them afterwards. [`HarvestOutput`] is the top-level result;
//! it owns one [`AnalyzedImage`] per surviving image in stable page order,
//! plus run statistics.

use crate::error::HarvestError;
use serde::{Deserialize, Serialize};

/// A successfully fetched, decoded, and re-encoded image.
///
/// Created by the fetch stage; immutable thereafter. `width`/`height` are
/// read from the decoded pixels, never from HTTP headers. `mime_type` is
/// always exactly `image/png` or `image/jpeg` after normalisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedImage {
    /// The absolute URL the image was fetched from.
    pub source_url: String,
    /// The raw response body as served by the origin. Archived as-is.
    pub raw_bytes: Vec<u8>,
    /// True pixel width of the decoded image.
    pub width: u32,
    /// True pixel height of the decoded image.
    pub height: u32,
    /// Base64 of the re-encoded (PNG or JPEG) bytes, ready for inline
    /// transport to the description service.
    pub encoded_payload: String,
    /// Normalised transport mime type: `image/png` or `image/jpeg`.
    pub mime_type: String,
}

impl FetchedImage {
    /// Render the image as a `data:` URL, the form display layers embed
    /// directly into an `<img>` tag.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.encoded_payload)
    }
}

/// Terminal state of the description stage for one image.
///
/// `Pending` means the analysis stage did not run for this image. `Done` and
/// `Failed` both carry text: the generated description, or the human-readable
/// failure detail. A failure is a value, not an error — it never aborts the
/// batch, and its text still ships in the archive so the user can see what
/// happened to each image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescriptionStatus {
    /// Analysis was not requested or has not reached this image.
    Pending,
    /// The description service produced text.
    Done(String),
    /// All attempts failed; the payload is the failure detail.
    Failed(String),
}

impl DescriptionStatus {
    /// The carried text, if the status is terminal.
    pub fn text(&self) -> Option<&str> {
        match self {
            DescriptionStatus::Pending => None,
            DescriptionStatus::Done(t) | DescriptionStatus::Failed(t) => Some(t),
        }
    }

    /// True for `Done`.
    pub fn is_done(&self) -> bool {
        matches!(self, DescriptionStatus::Done(_))
    }
}

/// A filtered image together with its description outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedImage {
    pub image: FetchedImage,
    pub description: DescriptionStatus,
}

/// Statistics about a completed harvest run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarvestStats {
    /// Deduplicated candidate URLs extracted from the page.
    pub candidate_urls: usize,
    /// Candidates that fetched and decoded successfully.
    pub fetched: usize,
    /// Candidates dropped on fetch or decode failure.
    pub fetch_failures: usize,
    /// Fetched images rejected by the dimension filter.
    pub filter_rejected: usize,
    /// Images that survived the filter (`fetched - filter_rejected`).
    pub kept: usize,
    /// Images with a `Done` description.
    pub described: usize,
    /// Images whose description attempts all failed.
    pub description_failures: usize,
    /// Wall-clock duration of the fetch stage in milliseconds.
    pub fetch_duration_ms: u64,
    /// Wall-clock duration of the analysis stage in milliseconds.
    pub analyze_duration_ms: u64,
    /// Total wall-clock duration in milliseconds.
    pub total_duration_ms: u64,
}

/// The complete result of a harvest run.
///
/// `images` holds the surviving images in stable page order. When the
/// analysis stage did not run every status is
/// [`DescriptionStatus::Pending`]; downstream consumers (the archive, a
/// display layer) treat `Pending` as "no description available" and carry
/// the images alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestOutput {
    pub images: Vec<AnalyzedImage>,
    pub stats: HarvestStats,
}

impl HarvestOutput {
    /// Package the surviving images (and any terminal descriptions) into a
    /// deterministic in-memory ZIP archive.
    pub fn to_zip(&self) -> Result<Vec<u8>, HarvestError> {
        crate::archive::build_archive(&self.images)
    }

    /// True when no image survived fetching and filtering. An empty result
    /// is a normal outcome, distinct from a failed run.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
