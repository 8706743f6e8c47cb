//! Threadline service: link extraction and grounded chat over HTTP.
//!
//! - [`orchestrator::Orchestrator`]: initialize / chat / debug use cases
//! - [`routes`]: axum router and JSON envelopes
//! - [`tether::Tether`]: builds everything from configuration and runs it

pub mod error;
pub mod orchestrator;
pub mod prompts;
pub mod routes;
pub mod tether;

pub use error::AppError;
pub use orchestrator::Orchestrator;
