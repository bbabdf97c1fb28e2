//! Reference extraction: retrieve the source page and collect image URLs.
//!
//! Page-level failures are fatal (the run cannot continue without HTML), so
//! [`fetch_page`] returns [`HarvestError`] variants directly. Extraction
//! itself never fails: a valid page with no image references yields an empty
//! list.
//!
//! ## Which references count?
//!
//! Every `<img>` contributes its `src`, or its lazy-load `data-src` when
//! `src` is absent — lazy-loading sites park the real URL there and leave
//! `src` pointing at a 1×1 placeholder, or omit it entirely. Pseudo-scheme
//! values (`mailto:`, `tel:`, `#…`) are discarded; scheme-less values are
//! resolved against the page URL. The result is deduplicated by exact
//! resolved-URL equality while preserving first-seen document order, which
//! gives the fetch stage a stable input order to anchor its output to.

use crate::error::HarvestError;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;
use url::Url;

static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("static selector"));

/// Retrieve the source page as text.
///
/// # Errors
/// [`HarvestError::PageTimeout`] when the request exceeds `timeout_secs`,
/// [`HarvestError::PageStatus`] on a non-2xx response,
/// [`HarvestError::PageFetch`] for any other transport failure.
pub async fn fetch_page(
    client: &reqwest::Client,
    url: &str,
    timeout_secs: u64,
) -> Result<String, HarvestError> {
    let response = client
        .get(url)
        .timeout(Duration::from_secs(timeout_secs))
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                HarvestError::PageTimeout {
                    url: url.to_string(),
                    secs: timeout_secs,
                }
            } else {
                HarvestError::PageFetch {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::PageStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|e| HarvestError::PageFetch {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Collect deduplicated absolute image URLs from an HTML document.
///
/// Returns them in first-seen document order.
pub fn extract_image_urls(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for element in document.select(&IMG_SELECTOR) {
        // An empty src counts as absent: lazy-loading sites often ship
        // src="" alongside the real URL in data-src.
        let attr = |name| {
            element
                .value()
                .attr(name)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        let src = match attr("src").or_else(|| attr("data-src")) {
            Some(s) => s,
            None => continue,
        };
        if src.starts_with("mailto:") || src.starts_with("tel:") || src.starts_with('#') {
            continue;
        }

        let resolved = if src.starts_with("http://") || src.starts_with("https://") {
            src.to_string()
        } else {
            match base.join(src) {
                Ok(u) => u.to_string(),
                Err(e) => {
                    debug!("Skipping unresolvable reference '{}': {}", src, e);
                    continue;
                }
            }
        };

        if seen.insert(resolved.clone()) {
            urls.push(resolved);
        }
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn absolute_urls_kept_as_is() {
        let html = r#"<img src="https://cdn.test/a.jpg">"#;
        let urls = extract_image_urls(html, &base("https://x.test/page"));
        assert_eq!(urls, vec!["https://cdn.test/a.jpg"]);
    }

    #[test]
    fn relative_url_resolves_against_base() {
        let html = r#"<img src="../a.jpg">"#;
        let urls = extract_image_urls(html, &base("https://x.test/dir/page"));
        assert_eq!(urls, vec!["https://x.test/a.jpg"]);
    }

    #[test]
    fn duplicate_resolved_urls_appear_once() {
        let html = r#"
            <img src="https://x.test/a.jpg">
            <img src="/a.jpg">
            <img src="https://x.test/a.jpg">
        "#;
        let urls = extract_image_urls(html, &base("https://x.test/page"));
        assert_eq!(urls, vec!["https://x.test/a.jpg"]);
    }

    #[test]
    fn pseudo_schemes_discarded() {
        let html = r##"
            <img src="mailto:someone@x.test">
            <img src="tel:+123456">
            <img src="#anchor">
            <img src="real.png">
        "##;
        let urls = extract_image_urls(html, &base("https://x.test/page"));
        assert_eq!(urls, vec!["https://x.test/real.png"]);
    }

    #[test]
    fn data_src_used_when_src_absent() {
        let html = r#"<img data-src="https://cdn.test/lazy.png">"#;
        let urls = extract_image_urls(html, &base("https://x.test/page"));
        assert_eq!(urls, vec!["https://cdn.test/lazy.png"]);
    }

    #[test]
    fn empty_src_falls_back_to_data_src() {
        let html = r#"<img src="" data-src="/lazy.png">"#;
        let urls = extract_image_urls(html, &base("https://x.test/"));
        assert_eq!(urls, vec!["https://x.test/lazy.png"]);
    }

    #[test]
    fn page_without_images_yields_empty_list() {
        let html = "<html><body><p>nothing here</p></body></html>";
        assert!(extract_image_urls(html, &base("https://x.test/")).is_empty());
    }

    #[test]
    fn first_seen_order_is_preserved() {
        let html = r#"
            <img src="/c.png">
            <img src="/a.png">
            <img src="/b.png">
            <img src="/a.png">
        "#;
        let urls = extract_image_urls(html, &base("https://x.test/"));
        assert_eq!(
            urls,
            vec![
                "https://x.test/c.png",
                "https://x.test/a.png",
                "https://x.test/b.png"
            ]
        );
    }
}
