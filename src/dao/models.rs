use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status persisted on a quiz record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    /// Authored but never started.
    Draft,
    /// A live session is (or was) running for this quiz.
    Active,
    /// The live session reached its terminal phase.
    Finished,
}

/// Quiz definition owned by a host principal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizEntity {
    /// Primary key of the quiz.
    pub id: Uuid,
    /// Principal that authored the quiz and may host its sessions.
    pub owner_id: Uuid,
    /// Display title shown to joining participants.
    pub title: String,
    /// Human-shareable join code (6 characters, unambiguous alphabet).
    pub code: String,
    /// Current lifecycle status.
    pub status: QuizStatus,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the quiz record was updated.
    pub updated_at: SystemTime,
}

/// Single answer option of a question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OptionEntity {
    /// Identifier of the option, unique within its question.
    pub id: u32,
    /// Option text shown to participants.
    pub text: String,
    /// Whether this option is the correct one. Exactly one option per
    /// question carries `true`; authoring enforces it and scoring relies on it.
    pub is_correct: bool,
}

/// Question belonging to a quiz.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Primary key of the question.
    pub id: Uuid,
    /// Quiz this question belongs to.
    pub quiz_id: Uuid,
    /// Zero-based position within the quiz.
    pub position: u32,
    /// Free-text prompt.
    pub prompt: String,
    /// Ordered answer options.
    pub options: Vec<OptionEntity>,
    /// Time participants have to answer, in seconds.
    pub time_limit_seconds: u32,
}

impl QuestionEntity {
    /// Identifier of the option flagged correct.
    ///
    /// Authoring guarantees the flag exists; a record that lost it is treated
    /// as having no correct option and every submission scores zero.
    pub fn correct_option_id(&self) -> Option<u32> {
        self.options
            .iter()
            .find(|option| option.is_correct)
            .map(|option| option.id)
    }
}

/// Participant joined to one live quiz session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Primary key of the participant.
    pub id: Uuid,
    /// Quiz whose session this participant joined.
    pub quiz_id: Uuid,
    /// Display alias chosen at join time (immutable afterwards, not unique).
    pub alias: String,
    /// Cumulative score, only ever incremented by the scoring engine.
    pub score: u32,
    /// Join timestamp; also the leaderboard tie-break order.
    pub joined_at: SystemTime,
}

/// Recorded answer for one (participant, question) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEntity {
    /// Primary key of the answer.
    pub id: Uuid,
    /// Participant that submitted.
    pub participant_id: Uuid,
    /// Question answered.
    pub question_id: Uuid,
    /// Option the participant chose.
    pub option_id: u32,
    /// Whether the chosen option was the correct one.
    pub is_correct: bool,
    /// Client-reported response latency, clamped to non-negative.
    pub response_time_ms: u64,
    /// Points awarded for this answer.
    pub points: u32,
    /// Submission timestamp.
    pub created_at: SystemTime,
}
