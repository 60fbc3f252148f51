//! Local execution of generation requests.
//!
//! [`LocalGenerator`] turns a [`GenerationRequest`](genvid_core::request::GenerationRequest)
//! into a `generate.py` invocation, runs it as a child process and
//! reports the video file it produced.

pub mod error;
pub mod generator;
pub mod outputs;
mod subprocess;

pub use error::GenerationError;
pub use generator::{Generator, LocalGenerator, RunnerConfig};
