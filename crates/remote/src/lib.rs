//! Remote job lifecycle: submit a generation, poll it to a terminal
//! state, and retrieve the produced video.
//!
//! The network side is abstracted behind [`backend::JobBackend`], with two
//! HTTP implementations: [`serverless::ServerlessBackend`] for a
//! scale-to-zero GPU endpoint and [`queue::QueueBackend`] for the local
//! job-queue front-end.

pub mod backend;
pub mod error;
pub mod fetcher;
pub mod lifecycle;
pub mod output;
pub mod poller;
pub mod queue;
pub mod serverless;
pub mod submitter;

mod http;
