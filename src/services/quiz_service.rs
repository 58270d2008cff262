//! Quiz and question authoring against the record store.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{QuestionEntity, QuizEntity, QuizStatus},
    dto::quiz::{CreateQuestionRequest, CreateQuizRequest, QuestionSummary, QuizSummary},
    error::ServiceError,
    services::join_code,
    state::SharedState,
};

/// Default answering window when a question does not specify one.
const DEFAULT_TIME_LIMIT_SECONDS: u32 = 15;

/// Create a quiz in draft status with a freshly generated join code.
pub async fn create_quiz(
    state: &SharedState,
    request: CreateQuizRequest,
) -> Result<QuizSummary, ServiceError> {
    let store = state.require_quiz_store().await?;
    let code = join_code::generate_unique(&store, state.config().join_code_length()).await?;

    let now = SystemTime::now();
    let quiz = QuizEntity {
        id: Uuid::new_v4(),
        owner_id: request.owner_id,
        title: request.title.trim().to_owned(),
        code,
        status: QuizStatus::Draft,
        created_at: now,
        updated_at: now,
    };
    store.save_quiz(quiz.clone()).await?;

    info!(quiz_id = %quiz.id, code = %quiz.code, "quiz created");

    Ok(quiz.into())
}

/// Fetch a single quiz by id.
pub async fn get_quiz(state: &SharedState, quiz_id: Uuid) -> Result<QuizSummary, ServiceError> {
    let store = state.require_quiz_store().await?;
    let quiz = store
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("quiz `{quiz_id}` not found")))?;
    Ok(quiz.into())
}

/// Append a question to a quiz.
///
/// Positions are assigned in authoring order; the payload has already been
/// validated by the extractor.
pub async fn add_question(
    state: &SharedState,
    quiz_id: Uuid,
    request: CreateQuestionRequest,
) -> Result<QuestionSummary, ServiceError> {
    let store = state.require_quiz_store().await?;
    store
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("quiz `{quiz_id}` not found")))?;

    let position = store.list_questions(quiz_id).await?.len() as u32;
    let question = QuestionEntity {
        id: Uuid::new_v4(),
        quiz_id,
        position,
        prompt: request.prompt.trim().to_owned(),
        options: request.options.into_iter().map(Into::into).collect(),
        time_limit_seconds: request
            .time_limit_seconds
            .unwrap_or(DEFAULT_TIME_LIMIT_SECONDS),
    };
    store.save_question(question.clone()).await?;

    info!(quiz_id = %quiz_id, question_id = %question.id, position, "question added");

    Ok(question.into())
}

/// List a quiz's questions in position order.
pub async fn list_questions(
    state: &SharedState,
    quiz_id: Uuid,
) -> Result<Vec<QuestionSummary>, ServiceError> {
    let store = state.require_quiz_store().await?;
    store
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("quiz `{quiz_id}` not found")))?;

    let questions = store.list_questions(quiz_id).await?;
    Ok(questions.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dao::quiz_store::memory::MemoryQuizStore,
        dto::quiz::OptionInput,
        services::join_code::CODE_ALPHABET,
        state::AppState,
    };

    async fn state_with_memory_store() -> SharedState {
        let state = AppState::new(crate::config::AppConfig::default());
        state
            .install_quiz_store(Arc::new(MemoryQuizStore::new()))
            .await;
        state
    }

    fn question_payload(prompt: &str) -> CreateQuestionRequest {
        CreateQuestionRequest {
            prompt: prompt.into(),
            options: vec![
                OptionInput {
                    id: 0,
                    text: "yes".into(),
                    is_correct: true,
                },
                OptionInput {
                    id: 1,
                    text: "no".into(),
                    is_correct: false,
                },
            ],
            time_limit_seconds: None,
        }
    }

    #[tokio::test]
    async fn created_quiz_is_draft_with_valid_code() {
        let state = state_with_memory_store().await;
        let summary = create_quiz(
            &state,
            CreateQuizRequest {
                title: "  Capitals  ".into(),
                owner_id: Uuid::new_v4(),
            },
        )
        .await
        .unwrap();

        assert_eq!(summary.title, "Capitals");
        assert_eq!(summary.status, QuizStatus::Draft);
        assert_eq!(summary.code.len(), 6);
        assert!(
            summary
                .code
                .bytes()
                .all(|byte| CODE_ALPHABET.contains(&byte))
        );
    }

    #[tokio::test]
    async fn questions_are_positioned_in_authoring_order() {
        let state = state_with_memory_store().await;
        let quiz = create_quiz(
            &state,
            CreateQuizRequest {
                title: "Capitals".into(),
                owner_id: Uuid::new_v4(),
            },
        )
        .await
        .unwrap();

        let first = add_question(&state, quiz.id, question_payload("Q1")).await.unwrap();
        let second = add_question(&state, quiz.id, question_payload("Q2")).await.unwrap();
        assert_eq!(first.position, 0);
        assert_eq!(second.position, 1);
        assert_eq!(first.time_limit_seconds, DEFAULT_TIME_LIMIT_SECONDS);

        let listed = list_questions(&state, quiz.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].prompt, "Q1");
    }

    #[tokio::test]
    async fn authoring_against_unknown_quiz_fails() {
        let state = state_with_memory_store().await;
        let err = add_question(&state, Uuid::new_v4(), question_payload("Q1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
