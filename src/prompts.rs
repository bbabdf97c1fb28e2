//! The instruction prompt sent with every description request.
//!
//! Centralising the prompt here keeps it testable and gives callers a single
//! override point ([`crate::config::HarvestConfig::prompt`]); the constant is
//! used only when no override is provided.

/// Default instruction prompt for describing one image.
pub const DEFAULT_DESCRIPTION_PROMPT: &str = "Describe this image in precise detail. \
Focus on the objects present, the actions taking place, and the setting or context. \
Write a single fluent paragraph with no preamble.";
