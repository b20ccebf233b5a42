/// Game/team/question authoring behind the admin REST routes.
pub mod admin_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Participant join lookups.
pub mod participant_service;
/// Dense ranking engine.
pub mod ranking;
/// Scoring engine.
pub mod scoring;
/// The session orchestrator.
pub mod session_service;
/// Storage supervision and degraded-mode management.
pub mod storage_supervisor;
/// WebSocket connection and message handling.
pub mod websocket_service;
/// Audience broadcast and direct-send helpers.
pub mod ws_events;
