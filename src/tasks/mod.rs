//! Background Tasks Module
//!
//! Contains background tasks spawned on behalf of preload consumers.
//!
//! # Tasks
//! - Scheduled preload: runs a consumer's batch preload after a start delay,
//!   cancellable through its handle

mod schedule;

pub use schedule::{spawn_scheduled_preload, ScheduledPreload};
