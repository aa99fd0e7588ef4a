pub mod llm;
pub mod trigger;
