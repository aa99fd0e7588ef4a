pub mod commit;
pub mod semantic_http;
pub mod sqlite;
pub mod store;
pub mod types;

pub use commit::*;
pub use semantic_http::HttpSemanticStore;
pub use sqlite::SqlitePreferenceStore;
pub use store::*;
pub use types::*;
