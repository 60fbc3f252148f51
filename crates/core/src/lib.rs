//! Domain types for orchestrating video generation jobs.
//!
//! Everything here is pure: task catalogue, resolution allow-lists,
//! request validation, job status classification and the `generate.py`
//! command builder. Network and process I/O live in the
//! `genvid-remote`, `genvid-worker` and `genvid-api` crates.

pub mod command;
pub mod error;
pub mod job;
pub mod request;
pub mod resolution;
pub mod task;
pub mod types;
