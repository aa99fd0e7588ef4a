pub mod normalize;
pub mod types;

pub use normalize::{content_key, normalize_value};
pub use types::*;
