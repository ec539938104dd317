use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Portal API",
        version = "0.1.0",
        description = "Account registration and email verification for the game portal"
    ),
    servers(
        (url = "/api", description = "API base path")
    )
)]
struct PortalDoc;

/// Portal document with the registration endpoints merged in at the API root.
pub struct ApiDoc;

impl OpenApi for ApiDoc {
    fn openapi() -> utoipa::openapi::OpenApi {
        let mut doc = PortalDoc::openapi();
        doc.merge(domain_registration::handlers::ApiDoc::openapi());
        doc
    }
}
