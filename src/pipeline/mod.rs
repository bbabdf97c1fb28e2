//! Pipeline stages for page-to-archive harvesting.
//!
//! Each submodule implements exactly one transformation step. Keeping the
//! stages separate makes each independently testable and lets us swap an
//! implementation (e.g. a different description backend) without touching
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ fetch ──▶ filter ──▶ describe
//! (scraper)  (reqwest)  (pure fn)  (vision API)
//! ```
//!
//! 1. [`extract`]  — retrieve the page and collect deduplicated absolute
//!    image URLs
//! 2. [`fetch`]    — download one image, decode it for true dimensions,
//!    re-encode to PNG/JPEG, base64-wrap for transport
//! 3. [`filter`]   — the inclusive dimension predicate
//! 4. [`describe`] — drive the vision-model call with retry/backoff; the
//!    only stage whose failures are returned as values
//!
//! No stage depends on a later one; orchestration lives in
//! [`crate::harvest`].

pub mod describe;
pub mod extract;
pub mod fetch;
pub mod filter;
