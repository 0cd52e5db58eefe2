//! Analysis worker: configuration and the bounded-concurrency pool that
//! drains the job queue.

pub mod config;
pub mod pool;
