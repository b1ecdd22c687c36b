// Person PoC server
// The person API served on a chosen runtime flavor

//! # Server Module
//!
//! ```text
//! bench / curl
//!        ↓ HTTP
//! PersonServer (this module) ← axum router on a RuntimeFlavor
//!        ↓ function calls          ↓ HTTP (client routes)
//! PersonService              upstream PersonServer
//! ```
//!
//! The usual setup runs three servers: an upstream on 8080 that the client
//! routes call, a thread-per-request server on 8081 and an event-loop server
//! on 8082. The bench then hits 8081 and 8082 with the same calls.

pub mod http;
pub mod runtime;

#[cfg(test)]
mod flavor_tests;

pub use http::{PersonServer, PersonServerBuilder};
pub use runtime::{BlockingMode, RuntimeFlavor, DEFAULT_REQUEST_THREADS};
