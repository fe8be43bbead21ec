//! Explain Module - Root-cause narratives

pub mod narrative;
pub mod prompt;
pub mod types;

pub use narrative::{fallback_summary, NarrativeSummarizer};
pub use prompt::{build_prompt, format_records};
pub use types::{Narrative, NarrativeSource};
