/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Join code generation.
pub mod join_code;
/// Leaderboard ranking over session rosters.
pub mod leaderboard;
/// Quiz and question authoring.
pub mod quiz_service;
/// Latency-weighted answer scoring policy.
pub mod scoring;
/// Live session coordination and fan-out.
pub mod session_service;
/// Storage connection supervision and degraded mode.
pub mod storage_supervisor;
/// WebSocket connection and message handling service.
pub mod websocket_service;
