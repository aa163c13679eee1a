//! Concurrency primitives shared by the converter and the tile loader.
//!
//! Both subsystems open a [`WorkerPool`] per call, submit one job per file,
//! and drain it before returning. Pools are never held open across calls.

mod pool;

pub use pool::{clamp_workers, PoolError, WorkerPool, DEFAULT_WORKERS, MAX_WORKERS};
