use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quizmaster Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
        crate::routes::quiz::create_quiz,
        crate::routes::quiz::get_quiz,
        crate::routes::quiz::create_question,
        crate::routes::quiz::list_questions,
        crate::routes::session::bind_host,
        crate::routes::session::leaderboard,
    ),
    components(
        schemas(
            crate::dao::models::QuizStatus,
            crate::dto::health::HealthResponse,
            crate::dto::quiz::CreateQuizRequest,
            crate::dto::quiz::CreateQuestionRequest,
            crate::dto::quiz::OptionInput,
            crate::dto::quiz::QuizSummary,
            crate::dto::quiz::QuestionSummary,
            crate::dto::quiz::OptionSummary,
            crate::dto::session::BindHostRequest,
            crate::dto::session::RosterSnapshot,
            crate::dto::session::LeaderboardResponse,
            crate::dto::session::ParticipantSummary,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "quiz", description = "Quiz authoring endpoints"),
        (name = "session", description = "Live session operations"),
        (name = "realtime", description = "WebSocket channel for hosts and participants"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_status_schema_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("document has components");
        assert!(components.schemas.contains_key("QuizStatus"));
        assert!(components.schemas.contains_key("QuizSummary"));
    }
}
