//! Bounded-concurrency fan-out
//!
//! ## Rust Learning Notes:
//!
//! ### `buffered` vs `buffer_unordered`
//! Both keep at most `n` futures of a stream in flight. `buffer_unordered`
//! yields results as they finish; `buffered` holds early finishers back so the
//! output order matches the input order. Callers here compare outcomes
//! against the ids they sent, so order matters and `buffered` is used.

use futures::stream::{self, StreamExt};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::PersonLookup;
use crate::models::Person;
use crate::Result;

/// Run `f` for every item with at most `limit` calls in flight
///
/// Returns one outcome per item, in input order, once every call has settled.
/// Outcomes are usually `Result`s; a failed call never cancels the others.
/// `limit == 0` is treated as 1.
pub async fn fan_out<I, F, Fut>(items: I, limit: usize, f: F) -> Vec<Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    stream::iter(items)
        .map(f)
        .buffered(limit.max(1))
        .collect()
        .await
}

/// Per-id outcomes of one [`search`] batch
#[derive(Debug)]
pub struct SearchOutcome {
    pub results: Vec<(i64, Result<Person>)>,
    pub elapsed: Duration,
}

impl SearchOutcome {
    pub fn successes(&self) -> impl Iterator<Item = &Person> {
        self.results.iter().filter_map(|(_, r)| r.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (i64, &crate::PocError)> {
        self.results
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|e| (*id, e)))
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// All persons in input order, or the first failure in input order
    pub fn into_all_ok(self) -> Result<Vec<Person>> {
        self.results.into_iter().map(|(_, r)| r).collect()
    }
}

/// Fetch every id through `lookup`, `limit` at a time, and time the batch
pub async fn search<L>(lookup: &L, ids: &[i64], limit: usize) -> SearchOutcome
where
    L: PersonLookup + ?Sized,
{
    info!("search {:?} with at most {} in flight", ids, limit.max(1));
    let start = Instant::now();

    let results = fan_out(ids.iter().copied(), limit, |id| async move {
        (id, lookup.fetch(id).await)
    })
    .await;

    let outcome = SearchOutcome {
        results,
        elapsed: start.elapsed(),
    };

    let failures = outcome.failure_count();
    if failures > 0 {
        warn!("search finished with {} of {} failed", failures, ids.len());
    }
    info!("search of {} ids finished in {:?}", ids.len(), outcome.elapsed);
    outcome
}
