//! Acquisition runtime: the collector loop and its recovery policy

pub mod collector;
pub mod recovery;

pub use collector::{AcquisitionStats, Collector, PlausibilityFilter, TickOutcome};
pub use recovery::{RecoveryPolicy, RecoveryStats, RecoveryTracker};
