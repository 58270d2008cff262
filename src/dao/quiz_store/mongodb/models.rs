use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    AnswerEntity, OptionEntity, ParticipantEntity, QuestionEntity, QuizEntity, QuizStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQuizDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    owner_id: Uuid,
    title: String,
    code: String,
    status: QuizStatus,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<QuizEntity> for MongoQuizDocument {
    fn from(value: QuizEntity) -> Self {
        Self {
            id: value.id,
            owner_id: value.owner_id,
            title: value.title,
            code: value.code,
            status: value.status,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoQuizDocument> for QuizEntity {
    fn from(value: MongoQuizDocument) -> Self {
        Self {
            id: value.id,
            owner_id: value.owner_id,
            title: value.title,
            code: value.code,
            status: value.status,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoQuestionDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    quiz_id: Uuid,
    position: u32,
    prompt: String,
    options: Vec<OptionEntity>,
    time_limit_seconds: u32,
}

impl From<QuestionEntity> for MongoQuestionDocument {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id,
            quiz_id: value.quiz_id,
            position: value.position,
            prompt: value.prompt,
            options: value.options,
            time_limit_seconds: value.time_limit_seconds,
        }
    }
}

impl From<MongoQuestionDocument> for QuestionEntity {
    fn from(value: MongoQuestionDocument) -> Self {
        Self {
            id: value.id,
            quiz_id: value.quiz_id,
            position: value.position,
            prompt: value.prompt,
            options: value.options,
            time_limit_seconds: value.time_limit_seconds,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoParticipantDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    quiz_id: Uuid,
    alias: String,
    score: u32,
    joined_at: DateTime,
}

impl From<ParticipantEntity> for MongoParticipantDocument {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            id: value.id,
            quiz_id: value.quiz_id,
            alias: value.alias,
            score: value.score,
            joined_at: DateTime::from_system_time(value.joined_at),
        }
    }
}

impl From<MongoParticipantDocument> for ParticipantEntity {
    fn from(value: MongoParticipantDocument) -> Self {
        Self {
            id: value.id,
            quiz_id: value.quiz_id,
            alias: value.alias,
            score: value.score,
            joined_at: value.joined_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoAnswerDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    participant_id: Uuid,
    question_id: Uuid,
    option_id: u32,
    is_correct: bool,
    response_time_ms: u64,
    points: u32,
    created_at: DateTime,
}

impl From<AnswerEntity> for MongoAnswerDocument {
    fn from(value: AnswerEntity) -> Self {
        Self {
            id: value.id,
            participant_id: value.participant_id,
            question_id: value.question_id,
            option_id: value.option_id,
            is_correct: value.is_correct,
            response_time_ms: value.response_time_ms,
            points: value.points,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoAnswerDocument> for AnswerEntity {
    fn from(value: MongoAnswerDocument) -> Self {
        Self {
            id: value.id,
            participant_id: value.participant_id,
            question_id: value.question_id,
            option_id: value.option_id,
            is_correct: value.is_correct,
            response_time_ms: value.response_time_ms,
            points: value.points,
            created_at: value.created_at.to_system_time(),
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
