/// Channel sinks delivering announcements to SSE, logs and webhooks.
pub mod announcement_sinks;
/// Rate-limited announcement loop.
pub mod announcer;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Score events and the bounded queues carrying them.
pub mod notifier;
/// Token bucket used to pace announcements.
pub mod rate_limit;
/// Team creation, clicks and leaderboard.
pub mod score_service;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
