// Server-level tests: the same routes timed on both runtime flavors
use crate::{
    client::{fanout::fan_out, PersonClient, PersonLookup},
    models::Person,
    server::{PersonServerBuilder, RuntimeFlavor},
    service::PersonService,
    Result,
};

use async_trait::async_trait;
use std::{
    net::{SocketAddr, TcpListener},
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{runtime::Runtime, sync::oneshot};

const DELAY: Duration = Duration::from_millis(200);
const CALLS: usize = 4;

// Test helpers

/// Upstream stand-in that waits without holding any thread
struct SleepingLookup {
    delay: Duration,
    service: PersonService,
}

#[async_trait]
impl PersonLookup for SleepingLookup {
    async fn fetch(&self, id: i64) -> Result<Person> {
        tokio::time::sleep(self.delay).await;
        self.service.lookup(id)
    }
}

/// A server running on its own flavor runtime; stopped on drop
struct FlavorServer {
    addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    runtime: Option<Runtime>,
}

impl FlavorServer {
    fn start(flavor: RuntimeFlavor) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = PersonServerBuilder::new()
            .with_flavor(flavor)
            .with_delay_ms(DELAY.as_millis() as u64)
            .with_cors(false)
            .with_lookup(Arc::new(SleepingLookup {
                delay: DELAY,
                service: PersonService::new(Duration::ZERO),
            }))
            .build();

        let runtime = flavor.build_runtime().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        runtime.spawn(async move {
            server
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            stop: Some(tx),
            runtime: Some(runtime),
        }
    }

    /// Fire `CALLS` requests at `/persons/{id}/{route}` at once and time the batch
    fn time_batch(&self, route: &'static str) -> Duration {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let client = PersonClient::new(&format!("http://{}", self.addr)).unwrap();
            let start = Instant::now();
            let results = fan_out(1..=CALLS as i64, CALLS, |id| {
                let client = client.clone();
                async move { client.retrieve_via_action(id, route).await }
            })
            .await;
            let elapsed = start.elapsed();

            for (id, result) in (1..).zip(results) {
                assert_eq!(result.unwrap(), Person::synthesize(id), "route {}", route);
            }
            elapsed
        })
    }
}

impl Drop for FlavorServer {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_timeout(Duration::from_secs(1));
        }
    }
}

// Event loop with a single worker

#[test]
fn test_single_event_loop_serializes_blocking_routes() {
    let server = FlavorServer::start(RuntimeFlavor::EventLoop { workers: 1 });

    // Every call holds the only worker, so the batch takes about CALLS delays
    for route in ["servicesync", "serviceblock", "clientsync"] {
        let elapsed = server.time_batch(route);
        assert!(
            elapsed >= DELAY * (CALLS as u32 - 1),
            "{} took {:?}",
            route,
            elapsed
        );
    }
}

#[test]
fn test_single_event_loop_keeps_async_routes_concurrent() {
    let server = FlavorServer::start(RuntimeFlavor::EventLoop { workers: 1 });

    for route in ["service", "client"] {
        let elapsed = server.time_batch(route);
        assert!(elapsed >= DELAY, "{} took {:?}", route, elapsed);
        assert!(elapsed < DELAY * 5 / 2, "{} took {:?}", route, elapsed);
    }
}

// Thread per request

#[test]
fn test_thread_per_request_isolates_blocking_routes() {
    let server = FlavorServer::start(RuntimeFlavor::ThreadPerRequest { workers: 16 });

    for route in ["servicesync", "serviceblock", "clientsync", "service", "client"] {
        let elapsed = server.time_batch(route);
        assert!(elapsed >= DELAY, "{} took {:?}", route, elapsed);
        assert!(elapsed < DELAY * 5 / 2, "{} took {:?}", route, elapsed);
    }
}

#[test]
fn test_thread_per_request_reports_not_found() {
    let server = FlavorServer::start(RuntimeFlavor::ThreadPerRequest { workers: 4 });
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let client = PersonClient::new(&format!("http://{}", server.addr)).unwrap();
        for route in ["servicesync", "clientsync"] {
            match client.retrieve_via_action(10_000, route).await {
                Err(crate::PocError::Upstream { status, message }) => {
                    assert_eq!(status, 404);
                    assert_eq!(message, "Cannot find person with id 10000");
                }
                other => panic!("expected 404 from {}, got {:?}", route, other),
            }
        }
    });
}
