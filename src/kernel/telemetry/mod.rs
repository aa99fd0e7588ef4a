//! Pipeline telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer. Routing, confirmation and
//! commit logic never read it.
//!
//! # PRIVACY INVARIANT
//! Events carry no transcript text, fact values or owner ids. Only lanes,
//! states, outcomes and counts.

pub mod event;
pub mod metrics;
pub mod recorder;
