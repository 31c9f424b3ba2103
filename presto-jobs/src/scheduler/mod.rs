//! Scheduler layer for the job engine
//!
//! Background housekeeping that runs independently of requests. Stale jobs
//! and artifacts are also evicted lazily on access; the sweeper only bounds
//! how long nobody-asked-again entries linger.

pub mod sweeper;

pub use sweeper::{CacheSweeper, SweepReport};
