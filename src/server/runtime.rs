//! The two runtimes the person API is compared on
//!
//! Both are tokio multi-thread runtimes. They differ in where a blocking
//! handler runs, which [`BlockingMode`] carries into the handlers.
//!
//! - [`RuntimeFlavor::ThreadPerRequest`] behaves like a servlet container
//!   with a pool of `workers` request threads. A blocking handler is moved
//!   off the async worker onto its own pool thread (`block_in_place` hands
//!   the worker's queue to a fresh thread), so N slow calls take about one
//!   delay as long as N stays below the pool size.
//! - [`RuntimeFlavor::EventLoop`] has `workers` event-loop threads and
//!   nothing else. Non-blocking handlers scale the same way, but every
//!   blocking handler takes a whole worker out of rotation and the rest
//!   queue up behind it.

use std::fmt;
use std::str::FromStr;
use std::thread::available_parallelism;
use tokio::runtime::{Builder, Runtime};

use crate::{PocError, Result};

/// Request threads of the thread-per-request flavor (a servlet container's usual max)
pub const DEFAULT_REQUEST_THREADS: usize = 200;

/// Where a handler's blocking section runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockingMode {
    /// On the worker that polls the handler, stalling everything queued on it
    #[default]
    Inline,
    /// On a dedicated thread from the blocking pool; needs a multi-thread runtime
    Isolated,
}

impl BlockingMode {
    /// Run a blocking closure according to this mode
    pub fn run<F, T>(self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        match self {
            BlockingMode::Inline => f(),
            BlockingMode::Isolated => tokio::task::block_in_place(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeFlavor {
    ThreadPerRequest { workers: usize },
    EventLoop { workers: usize },
}

impl RuntimeFlavor {
    pub fn thread_per_request() -> Self {
        RuntimeFlavor::ThreadPerRequest {
            workers: DEFAULT_REQUEST_THREADS,
        }
    }

    /// One worker per available core
    pub fn event_loop() -> Self {
        RuntimeFlavor::EventLoop {
            workers: available_cores(),
        }
    }

    pub fn workers(&self) -> usize {
        match self {
            RuntimeFlavor::ThreadPerRequest { workers } | RuntimeFlavor::EventLoop { workers } => {
                *workers
            }
        }
    }

    /// Same flavor, different pool size (at least one worker)
    pub fn with_workers(self, workers: usize) -> Self {
        let workers = workers.max(1);
        match self {
            RuntimeFlavor::ThreadPerRequest { .. } => RuntimeFlavor::ThreadPerRequest { workers },
            RuntimeFlavor::EventLoop { .. } => RuntimeFlavor::EventLoop { workers },
        }
    }

    pub fn blocking_mode(&self) -> BlockingMode {
        match self {
            RuntimeFlavor::ThreadPerRequest { .. } => BlockingMode::Isolated,
            RuntimeFlavor::EventLoop { .. } => BlockingMode::Inline,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RuntimeFlavor::ThreadPerRequest { .. } => "thread-per-request",
            RuntimeFlavor::EventLoop { .. } => "event-loop",
        }
    }

    /// Build the tokio runtime for this flavor
    ///
    /// Thread-per-request keeps a core-sized set of async workers for
    /// accepting and parsing, and caps the blocking pool at `workers` request
    /// threads. Event-loop gets exactly `workers` async workers.
    pub fn build_runtime(&self) -> Result<Runtime> {
        let mut builder = Builder::new_multi_thread();
        match *self {
            RuntimeFlavor::ThreadPerRequest { workers } => {
                let workers = workers.max(1);
                builder
                    .worker_threads(available_cores().min(workers))
                    .max_blocking_threads(workers)
                    .thread_name("request-worker");
            }
            RuntimeFlavor::EventLoop { workers } => {
                builder.worker_threads(workers.max(1)).thread_name("event-loop");
            }
        }

        builder
            .enable_all()
            .build()
            .map_err(|e| PocError::Internal(format!("Failed to build {} runtime: {}", self.name(), e)))
    }
}

fn available_cores() -> usize {
    available_parallelism().map(|n| n.get()).unwrap_or(1)
}

impl Default for RuntimeFlavor {
    fn default() -> Self {
        RuntimeFlavor::event_loop()
    }
}

impl fmt::Display for RuntimeFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} workers)", self.name(), self.workers())
    }
}

impl FromStr for RuntimeFlavor {
    type Err = PocError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "thread-per-request" | "threaded" | "mvc" => Ok(RuntimeFlavor::thread_per_request()),
            "event-loop" | "reactive" | "flux" => Ok(RuntimeFlavor::event_loop()),
            other => Err(PocError::InvalidInput(format!("Unknown runtime flavor: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_parse_flavor() {
        assert_eq!(
            "thread-per-request".parse::<RuntimeFlavor>().unwrap(),
            RuntimeFlavor::thread_per_request()
        );
        assert_eq!("Event-Loop".parse::<RuntimeFlavor>().unwrap().name(), "event-loop");
        assert_eq!("mvc".parse::<RuntimeFlavor>().unwrap(), RuntimeFlavor::thread_per_request());
        assert_eq!("flux".parse::<RuntimeFlavor>().unwrap(), RuntimeFlavor::event_loop());
        assert!("fibers".parse::<RuntimeFlavor>().is_err());
    }

    #[test]
    fn test_with_workers_keeps_flavor() {
        let flavor = RuntimeFlavor::thread_per_request().with_workers(0);
        assert_eq!(flavor, RuntimeFlavor::ThreadPerRequest { workers: 1 });
        assert_eq!(flavor.to_string(), "thread-per-request (1 workers)");
    }

    #[test]
    fn test_blocking_mode_follows_flavor() {
        assert_eq!(RuntimeFlavor::thread_per_request().blocking_mode(), BlockingMode::Isolated);
        assert_eq!(RuntimeFlavor::event_loop().blocking_mode(), BlockingMode::Inline);
        assert_eq!(BlockingMode::default(), BlockingMode::Inline);
    }

    #[test]
    fn test_inline_blocking_serializes_on_single_worker() {
        let flavor = RuntimeFlavor::EventLoop { workers: 1 };
        let mode = flavor.blocking_mode();
        let runtime = flavor.build_runtime().unwrap();
        let elapsed = runtime.block_on(async move {
            let start = Instant::now();
            let handles: Vec<_> = (0..3)
                .map(|_| {
                    tokio::spawn(async move {
                        mode.run(|| std::thread::sleep(Duration::from_millis(100)))
                    })
                })
                .collect();
            for handle in handles {
                handle.await.unwrap();
            }
            start.elapsed()
        });
        assert!(elapsed >= Duration::from_millis(300));
    }

    #[test]
    fn test_isolated_blocking_overlaps_on_thread_per_request() {
        // Each blocking section gets its own thread, whatever the async worker count
        let flavor = RuntimeFlavor::ThreadPerRequest { workers: 8 };
        let mode = flavor.blocking_mode();
        let runtime = flavor.build_runtime().unwrap();
        let elapsed = runtime.block_on(async move {
            let start = Instant::now();
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    tokio::spawn(async move {
                        mode.run(|| std::thread::sleep(Duration::from_millis(100)))
                    })
                })
                .collect();
            for handle in handles {
                handle.await.unwrap();
            }
            start.elapsed()
        });
        assert!(elapsed < Duration::from_millis(350));
    }
}
