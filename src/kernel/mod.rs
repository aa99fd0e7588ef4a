pub mod confirm;
pub mod debounce;
pub mod event;
pub mod router;
pub mod scheduler;
pub mod session;
pub mod telemetry;
pub mod time;
