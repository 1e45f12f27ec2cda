//! OpenAPI documentation configuration

use utoipa::OpenApi;

/// Combined OpenAPI documentation for all APIs
#[derive(OpenApi)]
#[openapi(
    info(
        title = "SMS Store API",
        version = "0.1.0",
        description = "Read API over SMS records consumed from Kafka"
    ),
    servers(
        (url = "http://localhost:8090", description = "Local development server")
    ),
    nest(
        (path = "/v0", api = domain_sms::ApiDoc)
    ),
    tags(
        (name = "Messages", description = "Stored SMS records by user")
    )
)]
pub struct ApiDoc;
