use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use log::{error, info};

use super::routes::routes;
use crate::catalog::CatalogService;
use crate::error_handling::types::WebError;
use crate::sync_coordinator::SyncCoordinator;

/// Web server for the HTTP API and dashboard
pub struct WebServer {
    catalog: Arc<CatalogService>,
    coordinator: Arc<SyncCoordinator>,
}

impl WebServer {
    pub fn new(catalog: Arc<CatalogService>, coordinator: Arc<SyncCoordinator>) -> Self {
        Self {
            catalog,
            coordinator,
        }
    }

    /// Serves until Ctrl-C.
    pub async fn start(&self, bind_address: &str, port: u16) -> Result<(), WebError> {
        self.serve(bind_address, port, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Unable to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received, stopping web server");
        })
        .await
    }

    /// Serves until `shutdown` resolves.
    pub async fn serve(
        &self,
        bind_address: &str,
        port: u16,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), WebError> {
        let addr = parse_addr(bind_address, port)?;
        let routes = routes(self.catalog.clone(), self.coordinator.clone());

        let (bound, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .map_err(|e| {
                error!("Unable to bind web server on {}: {}", addr, e);
                WebError::BindFailed(addr.to_string(), e.to_string())
            })?;

        info!("Web interface listening on http://{}", bound);
        server.await;
        info!("Web server stopped");
        Ok(())
    }
}

fn parse_addr(bind_address: &str, port: u16) -> Result<SocketAddr, WebError> {
    let ip: IpAddr = bind_address
        .parse()
        .map_err(|e| WebError::BindFailed(format!("{}:{}", bind_address, port), format!("{}", e)))?;
    Ok(SocketAddr::new(ip, port))
}
