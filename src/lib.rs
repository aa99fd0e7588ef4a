pub mod config;
pub mod driver;
pub mod error;
pub mod facts;
pub mod kernel;
pub mod memory;
pub mod services;

// Re-export specific items if needed for convenient access
pub use config::PipelineConfig;
pub use driver::SessionDriver;
pub use kernel::session::Session;
pub use services::trigger::PreferencePipeline;
