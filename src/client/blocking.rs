//! Synchronous waiting on an async lookup
//!
//! [`block_on_bridge`] runs a future on a dedicated runtime that lives on its
//! own thread, and parks the *calling* thread on a channel until the result
//! arrives. Called from a server worker, that worker is held for the whole
//! call, which is exactly what the `clientsync` route demonstrates.
//!
//! The future must not need the caller's runtime to make progress: on a
//! one-worker runtime the only worker is the one waiting. That is why the
//! bridge owns its runtime, and why the server gives the blocking route its
//! own client (its connections get spawned here, not on the server runtime).

use lazy_static::lazy_static;
use std::future::Future;
use std::sync::mpsc;
use tokio::runtime::{Builder, Handle};
use tracing::{debug, error};

use crate::{PocError, Result};

lazy_static! {
    static ref BRIDGE: std::result::Result<Handle, String> = start_bridge();
}

/// Spawn the bridge thread and hand back its runtime handle
///
/// The runtime is never dropped; the thread parks in `block_on` for the
/// lifetime of the process.
fn start_bridge() -> std::result::Result<Handle, String> {
    let (tx, rx) = mpsc::channel();

    std::thread::Builder::new()
        .name("client-bridge".to_string())
        .spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = tx.send(Err(format!("Failed to build bridge runtime: {}", e)));
                    return;
                }
            };
            let _ = tx.send(Ok(runtime.handle().clone()));
            runtime.block_on(std::future::pending::<()>());
        })
        .map_err(|e| format!("Failed to start bridge thread: {}", e))?;

    rx.recv()
        .map_err(|e| format!("Bridge thread exited during startup: {}", e))?
}

/// Drive `future` on the bridge runtime, blocking this thread until it resolves
pub fn block_on_bridge<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let handle = BRIDGE.as_ref().map_err(|e| {
        error!("{}", e);
        PocError::Internal(e.clone())
    })?;

    let (tx, rx) = mpsc::sync_channel(1);
    handle.spawn(async move {
        let _ = tx.send(future.await);
    });

    debug!("waiting on bridge task");
    rx.recv()
        .map_err(|_| PocError::Internal("Bridge task ended without a result".to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_block_on_bridge_outside_any_runtime() {
        let value = block_on_bridge(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(7)
        })
        .unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_block_on_bridge_propagates_errors() {
        let result: Result<()> =
            block_on_bridge(async { Err(PocError::PersonNotFound { id: 10_000 }) });
        assert!(matches!(result, Err(PocError::PersonNotFound { id: 10_000 })));
    }

    #[test]
    fn test_block_on_bridge_holds_single_worker() {
        // The only worker waits on the bridge, so a second task cannot start
        // until the first call returns
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();

        let elapsed = runtime.block_on(async {
            let start = Instant::now();
            let call = || {
                tokio::spawn(async {
                    block_on_bridge(async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(())
                    })
                })
            };
            let (a, b) = (call(), call());
            a.await.unwrap().unwrap();
            b.await.unwrap().unwrap();
            start.elapsed()
        });

        assert!(elapsed >= Duration::from_millis(200));
    }
}
