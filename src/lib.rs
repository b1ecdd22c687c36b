// Person PoC - Rust Edition
// Blocking vs. non-blocking request handling over two server runtimes

//! # Person PoC Library
//!
//! This crate compares blocking and non-blocking ways of serving the same
//! slow call. The same person API is served by two runtime flavors (see
//! [`RuntimeFlavor`]) and exercised by a client that fans out HTTP calls with a
//! concurrency cap and times each batch.
//!
//! ## Core Components
//!
//! ### Domain Model
//! - [`Person`]: the synthesized record every endpoint returns
//!
//! ### Service
//! - [`PersonService`]: looks up (synthesizes) a person and simulates a slow
//!   downstream with a fixed sleep. It exposes three flavors of the same call:
//!   - `retrieve_sync` blocks the calling thread
//!   - `retrieve_async` moves the blocking work to the blocking pool
//!   - `retrieve_async_blocking` *looks* async but blocks before returning
//!
//! ### Client and Fan-out
//! - [`PersonClient`]: typed HTTP calls against a person server
//! - [`fan_out`] / [`search`]: at most `limit` calls in flight, one outcome
//!   per input, input order preserved
//!
//! ### Server
//! - [`PersonServerBuilder`]: axum router plus runtime flavor
//!
//! ### Bench
//! - [`BenchRunner`]: runs every endpoint against every target and reports
//!   batch latencies
//!
//! ## Rust Learning Notes:
//!
//! ### Blocking inside async code
//! An `async fn` that calls `std::thread::sleep` still returns a future, but
//! polling that future parks the worker thread. Nothing else scheduled on that
//! worker can make progress until the sleep ends. `spawn_blocking` hands the
//! work to a separate pool so the worker stays free.

pub mod models;

pub mod config;

pub mod service;

pub mod client;

pub mod api;

pub mod server;

pub mod bench;

// Re-export core types so callers don't need to know the module layout
pub use models::Person;

pub use config::PocConfig;

pub use service::{PersonService, MAX_ID};

pub use client::{
    fanout::{fan_out, search, SearchOutcome},
    PersonClient, PersonLookup,
};

pub use api::{create_router, types::ErrorResponse, AppState};

pub use server::{PersonServerBuilder, RuntimeFlavor};

pub use bench::{BatchReport, BenchPlan, BenchRunner, BenchSummary, Target};

use thiserror::Error;

/// Error type for every fallible operation in the crate
///
/// ## Rust Learning Notes:
///
/// ### The `thiserror` Crate
/// - `#[derive(Error)]` implements `std::error::Error`
/// - `#[error("...")]` provides the `Display` message
/// - `{field}` in the message interpolates struct-variant fields
#[derive(Error, Debug)]
pub enum PocError {
    /// The simulated "not found": ids at or above [`MAX_ID`]
    #[error("Cannot find person with id {id}")]
    PersonNotFound { id: i64 },

    /// A person server answered with a non-success status
    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Connection refused, timeout, or other transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Request path or body could not be understood
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be loaded or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for PocError {
    fn from(err: std::io::Error) -> Self {
        PocError::Internal(err.to_string())
    }
}

impl From<reqwest::Error> for PocError {
    fn from(err: reqwest::Error) -> Self {
        PocError::Network(err.to_string())
    }
}

impl From<::config::ConfigError> for PocError {
    fn from(err: ::config::ConfigError) -> Self {
        PocError::Config(err.to_string())
    }
}

/// Shorthand for results carrying [`PocError`]
pub type Result<T> = std::result::Result<T, PocError>;
