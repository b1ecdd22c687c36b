//! The three ways this service answers the same slow call
//!
//! | method | returns | calling thread |
//! |---|---|---|
//! | [`PersonService::retrieve_sync`] | `Result<Person>` | blocked for `delay` |
//! | [`PersonService::retrieve_async`] | future | free; sleep runs on the blocking pool |
//! | [`PersonService::retrieve_async_blocking`] | ready future | blocked for `delay` *before* the future exists |

use std::future::{ready, Future};
use std::time::Duration;
use tracing::info;

use crate::config::ServiceSettings;
use crate::models::Person;
use crate::{PocError, Result};

/// Ids at or above this value are "not found"
pub const MAX_ID: i64 = 10_000;

/// Simulated person backend with a fixed per-call delay
#[derive(Debug, Clone)]
pub struct PersonService {
    delay: Duration,
}

impl Default for PersonService {
    fn default() -> Self {
        Self::from_settings(&ServiceSettings::default())
    }
}

impl PersonService {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_settings(settings: &ServiceSettings) -> Self {
        Self::new(settings.delay())
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Non-blocking retrieval
    ///
    /// The blocking lookup is moved to tokio's blocking pool, so awaiting this
    /// parks only the task, never the worker thread.
    pub async fn retrieve_async(&self, id: i64) -> Result<Person> {
        info!("retrieve_async {}", id);
        let service = self.clone();
        let person = tokio::task::spawn_blocking(move || service.retrieve_sync(id))
            .await
            .map_err(|e| PocError::Internal(format!("Blocking lookup for {} failed: {}", id, e)))??;
        info!("retrieve_async {}, result {:?}", id, person);
        Ok(person)
    }

    /// Async signature, blocking body
    ///
    /// The sleep happens here, when the method is *called*, and an already
    /// completed future is handed back. Whoever calls this from an async
    /// handler blocks their worker thread for the whole delay.
    pub fn retrieve_async_blocking(&self, id: i64) -> impl Future<Output = Result<Person>> {
        info!("retrieve_async_blocking {}", id);
        let result = self.retrieve_sync(id);
        info!("retrieve_async_blocking {}, result {:?}", id, result);
        ready(result)
    }

    /// Blocking retrieval: lookup, then sleep on the calling thread
    ///
    /// Not-found is reported before sleeping.
    pub fn retrieve_sync(&self, id: i64) -> Result<Person> {
        info!("retrieve_sync {}", id);
        let person = self.lookup(id)?;

        if !self.delay.is_zero() {
            info!("retrieve_sync {}, sleeping for {:?}", id, self.delay);
            std::thread::sleep(self.delay);
        }

        info!("retrieve_sync {}, result {:?}", id, person);
        Ok(person)
    }

    /// Synthesize the person for `id` without any delay
    pub fn lookup(&self, id: i64) -> Result<Person> {
        if id >= MAX_ID {
            return Err(PocError::PersonNotFound { id });
        }
        Ok(Person::synthesize(id))
    }
}
