pub mod client;
pub mod config;
pub mod executor;
pub mod worker;

pub use client::{CoordinatorClient, HttpCoordinator};
pub use config::WorkerConfig;
pub use worker::{run_worker, WorkerOptions, WorkerSummary};
