use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::quiz::{CreateQuestionRequest, CreateQuizRequest, QuestionSummary, QuizSummary},
    error::AppError,
    services::quiz_service,
    state::SharedState,
};

/// Routes handling quiz authoring operations.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/quizzes", post(create_quiz))
        .route("/quizzes/{id}", get(get_quiz))
        .route(
            "/quizzes/{id}/questions",
            post(create_question).get(list_questions),
        )
}

/// Create a fresh quiz definition and persist it.
#[utoipa::path(
    post,
    path = "/quizzes",
    tag = "quiz",
    request_body = CreateQuizRequest,
    responses(
        (status = 200, description = "Quiz created", body = QuizSummary),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create_quiz(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateQuizRequest>>,
) -> Result<Json<QuizSummary>, AppError> {
    let summary = quiz_service::create_quiz(&state, payload).await?;
    Ok(Json(summary))
}

/// Fetch an existing quiz definition.
#[utoipa::path(
    get,
    path = "/quizzes/{id}",
    tag = "quiz",
    params(("id" = String, Path, description = "Identifier of the quiz")),
    responses(
        (status = 200, description = "Quiz found", body = QuizSummary),
        (status = 404, description = "Quiz not found")
    )
)]
pub async fn get_quiz(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuizSummary>, AppError> {
    let summary = quiz_service::get_quiz(&state, id).await?;
    Ok(Json(summary))
}

/// Append a question to a quiz.
#[utoipa::path(
    post,
    path = "/quizzes/{id}/questions",
    tag = "quiz",
    params(("id" = String, Path, description = "Identifier of the quiz")),
    request_body = CreateQuestionRequest,
    responses(
        (status = 200, description = "Question added", body = QuestionSummary),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Quiz not found")
    )
)]
pub async fn create_question(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<CreateQuestionRequest>>,
) -> Result<Json<QuestionSummary>, AppError> {
    let summary = quiz_service::add_question(&state, id, payload).await?;
    Ok(Json(summary))
}

/// List a quiz's questions in position order, correctness flags included.
#[utoipa::path(
    get,
    path = "/quizzes/{id}/questions",
    tag = "quiz",
    params(("id" = String, Path, description = "Identifier of the quiz")),
    responses(
        (status = 200, description = "Questions listed", body = [QuestionSummary]),
        (status = 404, description = "Quiz not found")
    )
)]
pub async fn list_questions(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<QuestionSummary>>, AppError> {
    let summaries = quiz_service::list_questions(&state, id).await?;
    Ok(Json(summaries))
}
