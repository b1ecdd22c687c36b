// HTTP server for the person API
// Wires config, service, upstream client and runtime flavor together

use axum::Router;
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::runtime::RuntimeFlavor;
use crate::api::{create_router, AppState};
use crate::client::{PersonClient, PersonLookup};
use crate::config::PocConfig;
use crate::service::PersonService;
use crate::{PocError, Result};

/// Person API server
pub struct PersonServer {
    config: PocConfig,
    flavor: RuntimeFlavor,
    lookup: Option<Arc<dyn PersonLookup>>,
}

impl PersonServer {
    pub fn new(config: PocConfig, flavor: RuntimeFlavor) -> Self {
        Self {
            config,
            flavor,
            lookup: None,
        }
    }

    pub fn config(&self) -> &PocConfig {
        &self.config
    }

    pub fn flavor(&self) -> RuntimeFlavor {
        self.flavor
    }

    /// Create the router, with the upstream clients built from config unless overridden
    ///
    /// `clientsync` gets its own `PersonClient` so that none of its pooled
    /// connections live on this server's runtime.
    pub fn create_router(&self) -> Result<Router> {
        let (lookup, blocking_lookup): (Arc<dyn PersonLookup>, Arc<dyn PersonLookup>) =
            match &self.lookup {
                Some(lookup) => (lookup.clone(), lookup.clone()),
                None => (
                    Arc::new(PersonClient::from_settings(&self.config.client)?),
                    Arc::new(PersonClient::from_settings(&self.config.client)?),
                ),
            };

        let state = AppState::new(PersonService::from_settings(&self.config.service), lookup)
            .with_blocking_client(blocking_lookup)
            .with_parallel_search_max(self.config.controller.parallel_search_max)
            .with_blocking_mode(self.flavor.blocking_mode());

        let router = create_router(state);
        if self.config.server.cors_enabled {
            Ok(router.layer(CorsLayer::permissive()))
        } else {
            Ok(router)
        }
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// Must be polled on a multi-thread runtime when the flavor is
    /// thread-per-request; [`PersonServer::run_blocking`] takes care of that.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.create_router()?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        info!("🚀 Person API ({}) listening on http://{}", self.flavor, addr);
        info!("   service delay: {} ms", self.config.service.delay_ms);
        info!("   upstream: {}", self.config.client.base_url);
        info!("   search concurrency: {}", self.config.controller.parallel_search_max);

        axum::Server::from_tcp(listener)
            .map_err(|e| PocError::Internal(format!("Failed to serve on {}: {}", addr, e)))?
            .serve(app.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| PocError::Internal(format!("Server on {} failed: {}", addr, e)))?;

        info!("Person API on {} stopped", addr);
        Ok(())
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .map_err(|e| PocError::Config(format!("Invalid listen address: {}", e)))?;
        let listener = TcpListener::bind(addr)?;

        self.serve(listener, async {
            // If the signal handler cannot be installed, keep serving
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await
    }

    /// Build this server's runtime flavor and run on it
    pub fn run_blocking(self) -> Result<()> {
        let runtime = self.flavor.build_runtime()?;
        runtime.block_on(self.run())
    }
}

/// Builder pattern for the person API server
pub struct PersonServerBuilder {
    config: PocConfig,
    flavor: RuntimeFlavor,
    lookup: Option<Arc<dyn PersonLookup>>,
}

impl PersonServerBuilder {
    pub fn new() -> Self {
        Self {
            config: PocConfig::default(),
            flavor: RuntimeFlavor::default(),
            lookup: None,
        }
    }

    pub fn with_config(mut self, config: PocConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_flavor(mut self, flavor: RuntimeFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.config.server.cors_enabled = enabled;
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.service.delay_ms = delay_ms;
        self
    }

    pub fn with_upstream(mut self, base_url: impl Into<String>) -> Self {
        self.config.client.base_url = base_url.into();
        self
    }

    /// Replace the HTTP upstream with any lookup (tests use in-process ones)
    pub fn with_lookup(mut self, lookup: Arc<dyn PersonLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn build(self) -> PersonServer {
        PersonServer {
            config: self.config,
            flavor: self.flavor,
            lookup: self.lookup,
        }
    }
}

impl Default for PersonServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let server = PersonServerBuilder::new()
            .with_port(8082)
            .with_cors(false)
            .with_delay_ms(0)
            .with_flavor(RuntimeFlavor::thread_per_request())
            .build();

        assert_eq!(server.config().server.port, 8082);
        assert!(!server.config().server.cors_enabled);
        assert_eq!(server.config().service.delay_ms, 0);
        assert_eq!(server.flavor().name(), "thread-per-request");
    }

    #[test]
    fn test_create_router_rejects_bad_upstream() {
        let server = PersonServerBuilder::new().with_upstream("::nope::").build();
        assert!(matches!(server.create_router(), Err(PocError::Config(_))));
    }

    #[tokio::test]
    async fn test_run_rejects_bad_host() {
        let server = PersonServerBuilder::new().with_host("not a host").build();
        assert!(matches!(server.run().await, Err(PocError::Config(_))));
    }
}
