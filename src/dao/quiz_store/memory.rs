//! In-memory record store used by tests and single-node deployments that do
//! not need durability (`STORE_BACKEND=memory`).

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{AnswerEntity, ParticipantEntity, QuestionEntity, QuizEntity},
    quiz_store::QuizStore,
    storage::StorageResult,
};

/// `DashMap`-backed [`QuizStore`] keeping every record in process memory.
#[derive(Clone, Default)]
pub struct MemoryQuizStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    quizzes: DashMap<Uuid, QuizEntity>,
    questions: DashMap<Uuid, QuestionEntity>,
    participants: DashMap<Uuid, ParticipantEntity>,
    answers: DashMap<Uuid, AnswerEntity>,
}

impl MemoryQuizStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuizStore for MemoryQuizStore {
    fn save_quiz(&self, quiz: QuizEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.quizzes.insert(quiz.id, quiz);
            Ok(())
        })
    }

    fn find_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.quizzes.get(&id).map(|entry| entry.clone())) })
    }

    fn find_quiz_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .quizzes
                .iter()
                .find(|entry| entry.code == code)
                .map(|entry| entry.clone()))
        })
    }

    fn code_exists(&self, code: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.quizzes.iter().any(|entry| entry.code == code)) })
    }

    fn save_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.questions.insert(question.id, question);
            Ok(())
        })
    }

    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.questions.get(&id).map(|entry| entry.clone())) })
    }

    fn list_questions(
        &self,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut questions: Vec<QuestionEntity> = store
                .inner
                .questions
                .iter()
                .filter(|entry| entry.quiz_id == quiz_id)
                .map(|entry| entry.clone())
                .collect();
            questions.sort_by_key(|question| question.position);
            Ok(questions)
        })
    }

    fn save_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.participants.insert(participant.id, participant);
            Ok(())
        })
    }

    fn list_participants(
        &self,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut participants: Vec<ParticipantEntity> = store
                .inner
                .participants
                .iter()
                .filter(|entry| entry.quiz_id == quiz_id)
                .map(|entry| entry.clone())
                .collect();
            participants.sort_by_key(|participant| participant.joined_at);
            Ok(participants)
        })
    }

    fn save_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.answers.insert(answer.id, answer);
            Ok(())
        })
    }

    fn find_answer(
        &self,
        participant_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .answers
                .iter()
                .find(|entry| {
                    entry.participant_id == participant_id && entry.question_id == question_id
                })
                .map(|entry| entry.clone()))
        })
    }

    fn list_answers(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut answers: Vec<AnswerEntity> = store
                .inner
                .answers
                .iter()
                .filter(|entry| entry.question_id == question_id)
                .map(|entry| entry.clone())
                .collect();
            answers.sort_by_key(|answer| answer.created_at);
            Ok(answers)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
