//! Top-level harvest orchestration.
//!
//! Drives the pipeline stages in order — page fetch, reference extraction,
//! concurrent image fetch + filter, optional concurrent description — and
//! assembles the final [`HarvestOutput`].
//!
//! ## Partial-failure tolerance
//!
//! Only the page itself is load-bearing: if it cannot be retrieved the run
//! aborts with a fatal error. Every per-image failure (fetch, decode,
//! description) is isolated to that image; the batch always runs to
//! completion and reports what survived.
//!
//! ## Ordering
//!
//! Both fan-out stages use bounded concurrency (`buffer_unordered`), so
//! items complete in arbitrary order. Results land in write-once slots
//! indexed by input position, which keeps the final output in stable page
//! order without any cross-worker locking.

use crate::config::{HarvestConfig, DEFAULT_USER_AGENT};
use crate::error::HarvestError;
use crate::output::{AnalyzedImage, DescriptionStatus, FetchedImage, HarvestOutput, HarvestStats};
use crate::pipeline::{describe, extract, fetch, filter};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Harvest a web page's images.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `page_url` — Absolute HTTP/HTTPS URL of the page to harvest
/// * `config`   — Harvest configuration
///
/// # Returns
/// `Ok(HarvestOutput)` on success, even when individual images failed or
/// nothing matched the filter (check `output.images` / `output.stats`).
/// A run that finds zero matching images is a normal empty result.
///
/// # Errors
/// Returns `Err(HarvestError)` only for fatal conditions: an invalid page
/// URL, the page itself unreachable, or cancellation.
pub async fn harvest(
    page_url: impl AsRef<str>,
    config: &HarvestConfig,
) -> Result<HarvestOutput, HarvestError> {
    let total_start = Instant::now();
    let page_url = page_url.as_ref();
    info!("Starting harvest: {}", page_url);

    // ── Step 1: Validate input, build the shared client ──────────────────
    let base = Url::parse(page_url).map_err(|e| HarvestError::InvalidUrl {
        input: page_url.to_string(),
        reason: e.to_string(),
    })?;
    let client = build_client(config)?;

    if config.cancel.is_cancelled() {
        return Err(HarvestError::Cancelled);
    }

    // ── Step 2: Retrieve the page and extract candidates ─────────────────
    let html = extract::fetch_page(&client, page_url, config.page_timeout_secs).await?;
    let candidates = extract::extract_image_urls(&html, &base);
    info!("Extracted {} candidate image URLs", candidates.len());
    if let Some(ref cb) = config.progress_callback {
        cb.on_extract_complete(candidates.len());
    }

    // ── Step 3: Fetch, decode, and filter concurrently ───────────────────
    let fetch_start = Instant::now();
    let total = candidates.len();
    let mut slots: Vec<Option<FetchedImage>> = Vec::with_capacity(total);
    slots.resize_with(total, || None);
    let mut fetched = 0usize;
    let mut fetch_failures = 0usize;
    let mut filter_rejected = 0usize;
    {
        let mut results = stream::iter(candidates.iter().enumerate().map(|(idx, url)| {
            let client = client.clone();
            let cancel = config.cancel.clone();
            let timeout = config.image_timeout_secs;
            async move {
                if cancel.is_cancelled() {
                    return (idx, None);
                }
                match fetch::fetch_image(&client, url, timeout).await {
                    Ok(img) => (idx, Some(img)),
                    Err(e) => {
                        warn!("Dropping image: {}", e);
                        (idx, None)
                    }
                }
            }
        }))
        .buffer_unordered(config.concurrency);

        let mut completed = 0usize;
        while let Some((idx, result)) = results.next().await {
            match result {
                Some(img) => {
                    fetched += 1;
                    if filter::keep(img.width, img.height, &config.filter) {
                        slots[idx] = Some(img);
                    } else {
                        debug!(
                            "Filtered out {} ({}x{})",
                            img.source_url, img.width, img.height
                        );
                        filter_rejected += 1;
                    }
                }
                None => fetch_failures += 1,
            }
            completed += 1;
            if let Some(ref cb) = config.progress_callback {
                cb.on_fetch_progress(completed, total);
            }
        }
    }

    let images: Vec<FetchedImage> = slots.into_iter().flatten().collect();
    let kept = images.len();
    let fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;
    info!(
        "Fetch stage complete: {}/{} kept ({} failed, {} filtered out) in {}ms",
        kept, total, fetch_failures, filter_rejected, fetch_duration_ms
    );

    if config.cancel.is_cancelled() {
        return Err(HarvestError::Cancelled);
    }

    // ── Step 4: Describe the filtered set (optional) ─────────────────────
    let analyze_start = Instant::now();
    let mut described = 0usize;
    let mut description_failures = 0usize;
    let analyzed: Vec<AnalyzedImage> = if config.analyze && !images.is_empty() {
        let analyze_total = images.len();
        if let Some(ref cb) = config.progress_callback {
            cb.on_analyze_start(analyze_total);
        }

        let mut statuses: Vec<Option<DescriptionStatus>> = Vec::with_capacity(analyze_total);
        statuses.resize_with(analyze_total, || None);
        {
            let mut results = stream::iter(images.iter().enumerate().map(|(idx, img)| {
                let client = client.clone();
                async move {
                    let status = describe::describe_image(
                        &client,
                        &img.encoded_payload,
                        &img.mime_type,
                        config,
                    )
                    .await;
                    (idx, status)
                }
            }))
            .buffer_unordered(config.concurrency);

            let mut completed = 0usize;
            while let Some((idx, status)) = results.next().await {
                statuses[idx] = Some(status);
                completed += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_analyze_progress(completed, analyze_total);
                }
            }
        }

        images
            .into_iter()
            .zip(statuses)
            .map(|(image, status)| {
                let description = status.unwrap_or(DescriptionStatus::Pending);
                match description {
                    DescriptionStatus::Done(_) => described += 1,
                    DescriptionStatus::Failed(_) => description_failures += 1,
                    DescriptionStatus::Pending => {}
                }
                AnalyzedImage { image, description }
            })
            .collect()
    } else {
        images
            .into_iter()
            .map(|image| AnalyzedImage {
                image,
                description: DescriptionStatus::Pending,
            })
            .collect()
    };
    let analyze_duration_ms = if config.analyze {
        analyze_start.elapsed().as_millis() as u64
    } else {
        0
    };

    if config.cancel.is_cancelled() {
        return Err(HarvestError::Cancelled);
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_harvest_complete(kept, described);
    }

    let stats = HarvestStats {
        candidate_urls: total,
        fetched,
        fetch_failures,
        filter_rejected,
        kept,
        described,
        description_failures,
        fetch_duration_ms,
        analyze_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Harvest complete: {} images kept, {} described, {}ms total",
        kept, described, stats.total_duration_ms
    );

    Ok(HarvestOutput {
        images: analyzed,
        stats,
    })
}

/// Harvest a page and write the resulting archive directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial archives.
pub async fn harvest_to_file(
    page_url: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &HarvestConfig,
) -> Result<HarvestStats, HarvestError> {
    let output = harvest(page_url, config).await?;
    let bytes = output.to_zip()?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| HarvestError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("zip.tmp");
    tokio::fs::write(&tmp_path, &bytes)
        .await
        .map_err(|e| HarvestError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| HarvestError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output.stats)
}

/// Build the HTTP client shared by every worker in the run.
///
/// One pooled client serves the page fetch, all image fetches, and all
/// description calls; per-request timeouts differ per stage, so the client
/// itself carries none.
fn build_client(config: &HarvestConfig) -> Result<reqwest::Client, HarvestError> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
        .build()
        .map_err(|e| HarvestError::Internal(format!("failed to build HTTP client: {e}")))
}
