//! # Axum Helpers
//!
//! Shared HTTP plumbing for the service binaries.
//!
//! ## Modules
//!
//! - **[`server`]**: Router assembly, health checks, graceful shutdown
//! - **[`http`]**: CORS and security headers
//! - **[`errors`]**: `AppError` and the `{error, message}` response body
//! - **[`extractors`]**: Validated query extractor

pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app, create_router,
    health_router, run_health_checks, serve_with_shutdown, shutdown_signal,
};

pub use http::{cors_layer_from_env, security_headers};

pub use errors::{AppError, ErrorResponse, error_response};

pub use extractors::ValidatedQuery;
