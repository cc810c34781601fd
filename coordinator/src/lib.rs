pub mod config;
pub mod handlers;
pub mod lease;
pub mod registry;
pub mod scheduler;
pub mod server;
pub mod state;
pub mod sweeper;

pub use config::CoordinatorConfig;
pub use registry::{JobError, JobSpec, TaskRegistry};
pub use scheduler::Scheduler;
pub use server::{serve, ServeOptions};
pub use state::AppState;
