// HTTP client side of the PoC
// Typed calls against a person server plus the bounded fan-out built on them

pub mod blocking;
pub mod fanout;
pub mod person_client;

use async_trait::async_trait;

use crate::models::Person;
use crate::Result;

pub use person_client::PersonClient;

/// Anything that can resolve a person by id, usually over the network
///
/// The API handlers and [`fanout::search`] depend on this trait rather than on
/// [`PersonClient`], so tests can plug in an in-process lookup.
#[async_trait]
pub trait PersonLookup: Send + Sync {
    async fn fetch(&self, id: i64) -> Result<Person>;
}
