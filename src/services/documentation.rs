use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Clicker Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::announcements_stream,
        crate::routes::team::create_team,
        crate::routes::team::get_team,
        crate::routes::team::click,
        crate::routes::leaderboard::get_leaderboard,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dao::models::Team,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "teams", description = "Team creation and clicks"),
        (name = "leaderboard", description = "Team ranking"),
    )
)]
pub struct ApiDoc;
