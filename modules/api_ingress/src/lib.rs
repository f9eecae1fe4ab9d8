use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use axum::http::{header, Method};
use axum::response::IntoResponse;
use axum::{middleware::from_fn, routing::get, Router};
use dashmap::DashMap;
use modkit::api::{OpenApiRegistry, OperationSpec};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};
use utoipa::openapi::{schema::Schema, RefOr};

mod config;
pub mod openapi;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;
use openapi::ComponentsRegistry;

/// HTTP host: owns the middleware stack, `/health`, the OpenAPI document
/// and the listening socket. Other modules register routes through the
/// [`OpenApiRegistry`] it implements.
#[derive(Debug)]
pub struct ApiIngress {
    config: ArcSwap<ApiIngressConfig>,
    components_registry: ArcSwap<ComponentsRegistry>,
    // Keyed by (method, path); first registration wins.
    operation_specs: DashMap<(Method, String), OperationSpec>,
}

impl Default for ApiIngress {
    fn default() -> Self {
        Self::new(ApiIngressConfig::default())
    }
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            components_registry: ArcSwap::from_pointee(ComponentsRegistry::default()),
            operation_specs: DashMap::new(),
        }
    }

    /// Current configuration (cheap clone from ArcSwap).
    pub fn get_config(&self) -> ApiIngressConfig {
        (**self.config.load()).clone()
    }

    /// Number of operations registered so far.
    pub fn operation_count(&self) -> usize {
        self.operation_specs.len()
    }

    /// Wrap `router` with the global middleware.
    ///
    /// Request flow, outermost first:
    /// SetRequestId → PropagateRequestId → Trace → push_req_id → CORS → Timeout → BodyLimit
    pub fn apply_middleware(&self, router: Router) -> Router {
        let cfg = self.get_config();
        let x_request_id = request_id::header();

        // Layers added later wrap the ones added earlier.
        let mut router = router
            .layer(RequestBodyLimitLayer::new(cfg.body_limit_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(cfg.request_timeout_secs)));
        if cfg.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }
        router
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(request_id::create_trace_layer())
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId))
    }

    /// Build the OpenAPI document from every registered operation.
    pub fn build_openapi(&self) -> Result<serde_json::Value> {
        let components = self.components_registry.load();
        let mut specs: Vec<OperationSpec> = self
            .operation_specs
            .iter()
            .map(|e| e.value().clone())
            .collect();
        specs.sort_by(|a, b| (&a.path, a.method.as_str()).cmp(&(&b.path, b.method.as_str())));

        tracing::info!("Building OpenAPI: found {} registered operations", specs.len());
        openapi::build_document(specs.iter(), &components)
    }

    /// Resolve the listen address: the configured `bind_addr`, else `fallback`.
    pub fn bind_addr(&self, fallback: &str) -> Result<SocketAddr> {
        let cfg = self.get_config();
        let addr = cfg.bind_addr.as_deref().unwrap_or(fallback);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", addr, e))
    }

    /// Bind and serve until `cancel` fires, then drain in-flight requests.
    pub async fn serve(
        &self,
        router: Router,
        addr: SocketAddr,
        cancel: CancellationToken,
    ) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP server bound on {}", listener.local_addr()?);

        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}

#[async_trait]
impl modkit::Module for ApiIngress {
    fn name(&self) -> &'static str {
        "api_ingress"
    }

    async fn init(&self, ctx: &modkit::ModuleCtx) -> Result<()> {
        let cfg = ctx.module_config::<ApiIngressConfig>()?;
        tracing::debug!(module = "api_ingress", ?cfg, "Module initialized with context");
        self.config.store(Arc::new(cfg));
        Ok(())
    }
}

impl modkit::RestHostModule for ApiIngress {
    fn rest_prepare(&self, _ctx: &modkit::ModuleCtx, router: Router) -> Result<Router> {
        tracing::debug!("REST host prepared base router with health check");
        Ok(router.route("/health", get(web::health_check)))
    }

    fn rest_finalize(&self, _ctx: &modkit::ModuleCtx, mut router: Router) -> Result<Router> {
        if self.get_config().enable_docs {
            // Build once, serve as static JSON.
            let doc = Arc::new(self.build_openapi()?);
            router = router
                .route(
                    "/openapi.json",
                    get(move || {
                        let doc = doc.clone();
                        async move {
                            ([(header::CACHE_CONTROL, "no-store")], axum::Json((*doc).clone()))
                                .into_response()
                        }
                    }),
                )
                .route("/docs", get(web::serve_docs));
        }

        let router = self.apply_middleware(router);

        tracing::debug!("REST host finalized router");
        Ok(router)
    }

    fn as_registry(&self) -> &dyn OpenApiRegistry {
        self
    }
}

impl OpenApiRegistry for ApiIngress {
    fn register_operation(&self, spec: &OperationSpec) {
        let key = (spec.method.clone(), spec.path.clone());
        if self.operation_specs.contains_key(&key) {
            tracing::error!(
                method = %spec.method,
                path = %spec.path,
                "Duplicate (method, path) detected; ignoring subsequent registration"
            );
            return;
        }
        self.operation_specs.insert(key, spec.clone());

        tracing::debug!(
            handler_id = %spec.handler_id,
            method = %spec.method,
            path = %spec.path,
            total_operations = self.operation_specs.len(),
            "Registered API operation"
        );
    }

    fn ensure_schema_raw(&self, name: &str, schemas: Vec<(String, RefOr<Schema>)>) -> String {
        // Copy-on-write update of the components snapshot.
        self.components_registry.rcu(|current| {
            let mut reg = (**current).clone();
            for (schema_name, schema) in &schemas {
                if !reg.register_schema(schema_name, schema.clone()) {
                    tracing::trace!(schema = %schema_name, "Schema already registered; reusing");
                }
            }
            reg
        });
        name.to_string()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
