//! Local job-queue front-end for video generation.
//!
//! Exposes the building blocks (config, state, store, error handling,
//! routes) so integration tests and the binary entrypoint can both use
//! them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod runner;
pub mod state;
pub mod store;
