//! Shared client for the remote marketplace API.
//!
//! Implementation details are split into submodules under `src/client/`:
//! admission and request preparation, single-attempt execution, the retry
//! loop, and the facade that ties them together.

pub mod builder;
pub mod core;
mod execution;
mod policy;
mod preflight;

pub use builder::ApiClientBuilder;
pub use core::{ApiClient, PING_PATH};
