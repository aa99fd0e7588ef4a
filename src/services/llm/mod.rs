pub mod client;
pub mod parse;

pub use client::{build_prompt, ExtractionClient, InferenceBackend, LlamaCompletionBackend};
pub use parse::{extract_json_array, parse_candidates};
