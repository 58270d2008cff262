use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoAnswerDocument, MongoParticipantDocument, MongoQuestionDocument, MongoQuizDocument,
        doc_id, uuid_as_binary,
    },
};
use crate::dao::{
    models::{AnswerEntity, ParticipantEntity, QuestionEntity, QuizEntity},
    quiz_store::QuizStore,
    storage::StorageResult,
};

const QUIZ_COLLECTION_NAME: &str = "quizzes";
const QUESTION_COLLECTION_NAME: &str = "questions";
const PARTICIPANT_COLLECTION_NAME: &str = "participants";
const ANSWER_COLLECTION_NAME: &str = "answers";

/// MongoDB-backed [`QuizStore`].
#[derive(Clone)]
pub struct MongoQuizStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.database = database;
        Ok(())
    }
}

impl MongoQuizStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        // Join codes resolve sessions; lookups by code must be unique and fast.
        let quiz_collection =
            database.collection::<mongodb::bson::Document>(QUIZ_COLLECTION_NAME);
        let code_index = mongodb::IndexModel::builder()
            .keys(doc! {"code": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("quiz_code_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        quiz_collection
            .create_index(code_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: QUIZ_COLLECTION_NAME,
                index: "code",
                source,
            })?;

        let question_collection =
            database.collection::<mongodb::bson::Document>(QUESTION_COLLECTION_NAME);
        let question_index = mongodb::IndexModel::builder()
            .keys(doc! {"quiz_id": 1, "position": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("question_quiz_idx".to_owned()))
                    .build(),
            )
            .build();
        question_collection
            .create_index(question_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: QUESTION_COLLECTION_NAME,
                index: "quiz_id,position",
                source,
            })?;

        // Backs the at-most-one-answer-per-(participant, question) invariant at
        // the storage level as well as in the coordinator.
        let answer_collection =
            database.collection::<mongodb::bson::Document>(ANSWER_COLLECTION_NAME);
        let answer_index = mongodb::IndexModel::builder()
            .keys(doc! {"participant_id": 1, "question_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("answer_participant_question_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        answer_collection
            .create_index(answer_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ANSWER_COLLECTION_NAME,
                index: "participant_id,question_id",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn quiz_collection(&self) -> Collection<MongoQuizDocument> {
        self.database()
            .await
            .collection::<MongoQuizDocument>(QUIZ_COLLECTION_NAME)
    }

    async fn question_collection(&self) -> Collection<MongoQuestionDocument> {
        self.database()
            .await
            .collection::<MongoQuestionDocument>(QUESTION_COLLECTION_NAME)
    }

    async fn participant_collection(&self) -> Collection<MongoParticipantDocument> {
        self.database()
            .await
            .collection::<MongoParticipantDocument>(PARTICIPANT_COLLECTION_NAME)
    }

    async fn answer_collection(&self) -> Collection<MongoAnswerDocument> {
        self.database()
            .await
            .collection::<MongoAnswerDocument>(ANSWER_COLLECTION_NAME)
    }

    async fn save_quiz(&self, quiz: QuizEntity) -> MongoResult<()> {
        let id = quiz.id;
        let document: MongoQuizDocument = quiz.into();
        self.quiz_collection()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveRecord {
                collection: QUIZ_COLLECTION_NAME,
                id,
                source,
            })?;
        Ok(())
    }

    async fn find_quiz(&self, id: Uuid) -> MongoResult<Option<QuizEntity>> {
        let document = self
            .quiz_collection()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadRecord {
                collection: QUIZ_COLLECTION_NAME,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn find_quiz_by_code(&self, code: &str) -> MongoResult<Option<QuizEntity>> {
        let document = self
            .quiz_collection()
            .await
            .find_one(doc! {"code": code})
            .await
            .map_err(|source| MongoDaoError::LoadRecord {
                collection: QUIZ_COLLECTION_NAME,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn save_question(&self, question: QuestionEntity) -> MongoResult<()> {
        let id = question.id;
        let document: MongoQuestionDocument = question.into();
        self.question_collection()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveRecord {
                collection: QUESTION_COLLECTION_NAME,
                id,
                source,
            })?;
        Ok(())
    }

    async fn find_question(&self, id: Uuid) -> MongoResult<Option<QuestionEntity>> {
        let document = self
            .question_collection()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadRecord {
                collection: QUESTION_COLLECTION_NAME,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn list_questions(&self, quiz_id: Uuid) -> MongoResult<Vec<QuestionEntity>> {
        let documents: Vec<MongoQuestionDocument> = self
            .question_collection()
            .await
            .find(doc! {"quiz_id": uuid_as_binary(quiz_id)})
            .sort(doc! {"position": 1})
            .await
            .map_err(|source| MongoDaoError::ListRecords {
                collection: QUESTION_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListRecords {
                collection: QUESTION_COLLECTION_NAME,
                source,
            })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn save_participant(&self, participant: ParticipantEntity) -> MongoResult<()> {
        let id = participant.id;
        let document: MongoParticipantDocument = participant.into();
        self.participant_collection()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveRecord {
                collection: PARTICIPANT_COLLECTION_NAME,
                id,
                source,
            })?;
        Ok(())
    }

    async fn list_participants(&self, quiz_id: Uuid) -> MongoResult<Vec<ParticipantEntity>> {
        let documents: Vec<MongoParticipantDocument> = self
            .participant_collection()
            .await
            .find(doc! {"quiz_id": uuid_as_binary(quiz_id)})
            .sort(doc! {"joined_at": 1})
            .await
            .map_err(|source| MongoDaoError::ListRecords {
                collection: PARTICIPANT_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListRecords {
                collection: PARTICIPANT_COLLECTION_NAME,
                source,
            })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn save_answer(&self, answer: AnswerEntity) -> MongoResult<()> {
        let id = answer.id;
        let document: MongoAnswerDocument = answer.into();
        self.answer_collection()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveRecord {
                collection: ANSWER_COLLECTION_NAME,
                id,
                source,
            })?;
        Ok(())
    }

    async fn find_answer(
        &self,
        participant_id: Uuid,
        question_id: Uuid,
    ) -> MongoResult<Option<AnswerEntity>> {
        let document = self
            .answer_collection()
            .await
            .find_one(doc! {
                "participant_id": uuid_as_binary(participant_id),
                "question_id": uuid_as_binary(question_id),
            })
            .await
            .map_err(|source| MongoDaoError::LoadRecord {
                collection: ANSWER_COLLECTION_NAME,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn list_answers(&self, question_id: Uuid) -> MongoResult<Vec<AnswerEntity>> {
        let documents: Vec<MongoAnswerDocument> = self
            .answer_collection()
            .await
            .find(doc! {"question_id": uuid_as_binary(question_id)})
            .await
            .map_err(|source| MongoDaoError::ListRecords {
                collection: ANSWER_COLLECTION_NAME,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListRecords {
                collection: ANSWER_COLLECTION_NAME,
                source,
            })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }
}

impl QuizStore for MongoQuizStore {
    fn save_quiz(&self, quiz: QuizEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_quiz(quiz).await.map_err(Into::into) })
    }

    fn find_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_quiz(id).await.map_err(Into::into) })
    }

    fn find_quiz_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_quiz_by_code(&code).await.map_err(Into::into) })
    }

    fn code_exists(&self, code: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let found = store.find_quiz_by_code(&code).await?;
            Ok(found.is_some())
        })
    }

    fn save_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_question(question).await.map_err(Into::into) })
    }

    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_question(id).await.map_err(Into::into) })
    }

    fn list_questions(
        &self,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_questions(quiz_id).await.map_err(Into::into) })
    }

    fn save_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_participant(participant).await.map_err(Into::into) })
    }

    fn list_participants(
        &self,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_participants(quiz_id).await.map_err(Into::into) })
    }

    fn save_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_answer(answer).await.map_err(Into::into) })
    }

    fn find_answer(
        &self,
        participant_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_answer(participant_id, question_id)
                .await
                .map_err(Into::into)
        })
    }

    fn list_answers(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_answers(question_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
