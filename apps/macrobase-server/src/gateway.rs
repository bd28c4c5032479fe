//! Gateway service in front of the application endpoint.
//!
//! Health-check probes (`/health`, `/_health`) are intercepted and served by
//! the health endpoint; every other request goes to the application endpoint.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use hyper::body::Incoming;
use hyper::service::Service;

use macrobase_http::{EndpointService, Response};

/// Gateway routing health probes and application traffic.
#[derive(Debug, Clone)]
pub struct GatewayService {
    app: EndpointService,
    health: EndpointService,
}

impl GatewayService {
    /// Create a new gateway.
    pub fn new(app: EndpointService, health: EndpointService) -> Self {
        Self { app, health }
    }
}

impl Service<http::Request<Incoming>> for GatewayService {
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        if is_health_check(req.uri().path()) {
            return self.health.call(req);
        }
        self.app.call(req)
    }
}

/// Check if the request targets a health-check path.
fn is_health_check(path: &str) -> bool {
    path == "/health" || path == "/_health"
}
