use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{OptionEntity, QuestionEntity, QuizEntity, QuizStatus},
    dto::{format_system_time, validation::validate_options},
};

/// Payload used to author a new quiz.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    /// Display title shown to joining participants.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Principal that owns the quiz and may host its sessions.
    pub owner_id: Uuid,
}

/// Payload used to author a question for an existing quiz.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    /// Free-text prompt.
    pub prompt: String,
    /// Answer options; exactly one must be flagged correct.
    pub options: Vec<OptionInput>,
    /// Answering time limit in seconds; defaults to 15.
    #[serde(default)]
    pub time_limit_seconds: Option<u32>,
}

impl Validate for CreateQuestionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.prompt.trim().is_empty() {
            let mut err = validator::ValidationError::new("prompt_blank");
            err.message = Some("prompt must not be blank".into());
            errors.add("prompt", err);
        }

        if let Err(err) = validate_options(&self.options) {
            errors.add("options", err);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Incoming option definition for question authoring.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptionInput {
    /// Identifier unique within the question.
    pub id: u32,
    /// Option text.
    pub text: String,
    /// Whether this is the correct option.
    pub is_correct: bool,
}

impl From<OptionInput> for OptionEntity {
    fn from(value: OptionInput) -> Self {
        Self {
            id: value.id,
            text: value.text,
            is_correct: value.is_correct,
        }
    }
}

/// Summary returned once a quiz has been created or fetched.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    /// Quiz identifier.
    pub id: Uuid,
    /// Display title.
    pub title: String,
    /// Human-shareable join code.
    pub code: String,
    /// Lifecycle status.
    pub status: QuizStatus,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Last update timestamp (RFC 3339).
    pub updated_at: String,
}

impl From<QuizEntity> for QuizSummary {
    fn from(quiz: QuizEntity) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title,
            code: quiz.code,
            status: quiz.status,
            created_at: format_system_time(quiz.created_at),
            updated_at: format_system_time(quiz.updated_at),
        }
    }
}

/// Authored question as returned to its owner, correctness flags included.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSummary {
    /// Question identifier.
    pub id: Uuid,
    /// Position within the quiz.
    pub position: u32,
    /// Prompt text.
    pub prompt: String,
    /// Authored options.
    pub options: Vec<OptionSummary>,
    /// Answering time limit in seconds.
    pub time_limit_seconds: u32,
}

/// Authored option projection.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptionSummary {
    /// Option identifier.
    pub id: u32,
    /// Option text.
    pub text: String,
    /// Whether this is the correct option.
    pub is_correct: bool,
}

impl From<OptionEntity> for OptionSummary {
    fn from(option: OptionEntity) -> Self {
        Self {
            id: option.id,
            text: option.text,
            is_correct: option.is_correct,
        }
    }
}

impl From<QuestionEntity> for QuestionSummary {
    fn from(question: QuestionEntity) -> Self {
        Self {
            id: question.id,
            position: question.position,
            prompt: question.prompt,
            options: question.options.into_iter().map(Into::into).collect(),
            time_limit_seconds: question.time_limit_seconds,
        }
    }
}
