//! Envelope types for the bidirectional real-time channel.
//!
//! Every frame is a JSON object `{"type": ..., "data": ...}`. Unknown types
//! deserialize into [`ClientMessage::Unknown`] so the socket handler can log
//! and drop them without replying.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::session::ParticipantSummary;

/// Messages accepted from WebSocket clients.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    /// Participant joins a session by quiz code.
    #[serde(rename = "JOIN_QUIZ", rename_all = "camelCase")]
    JoinQuiz {
        /// Human-shareable join code.
        quiz_code: String,
        /// Display alias for the joining participant.
        alias: String,
    },
    /// Host starts the session.
    #[serde(rename = "QUIZ_STARTED", rename_all = "camelCase")]
    QuizStarted {
        /// Quiz being started.
        quiz_id: Uuid,
    },
    /// Host presents a question.
    #[serde(rename = "NEW_QUESTION", rename_all = "camelCase")]
    NewQuestion {
        /// Question to open for answers.
        question_id: Uuid,
    },
    /// Participant submits an answer to the active question.
    #[serde(rename = "SUBMIT_ANSWER", rename_all = "camelCase")]
    SubmitAnswer {
        /// Question the participant believes is active.
        question_id: Uuid,
        /// Chosen option.
        option_id: u32,
        /// Client-reported response latency in milliseconds. Signed because
        /// the value is attacker-controlled; the coordinator clamps it.
        response_time: i64,
    },
    /// Host closes the active question.
    #[serde(rename = "QUESTION_ENDED", rename_all = "camelCase")]
    QuestionEnded {
        /// Question to close.
        question_id: Uuid,
    },
    /// Host ends the session.
    #[serde(rename = "QUIZ_ENDED", rename_all = "camelCase")]
    QuizEnded {
        /// Quiz whose session ends.
        quiz_id: Uuid,
    },
    /// Any unrecognized envelope type.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// `type` tags recognized on inbound frames.
    const KNOWN_TYPES: [&str; 6] = [
        "JOIN_QUIZ",
        "QUIZ_STARTED",
        "NEW_QUESTION",
        "SUBMIT_ANSWER",
        "QUESTION_ENDED",
        "QUIZ_ENDED",
    ];

    /// Parse a client frame from its JSON text.
    ///
    /// An unrecognized `type` maps to [`ClientMessage::Unknown`] whatever its
    /// `data` payload holds; a known `type` with a malformed payload is an
    /// error.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        let envelope: serde_json::Value = serde_json::from_str(text)?;
        match envelope.get("type").and_then(serde_json::Value::as_str) {
            Some(tag) if !Self::KNOWN_TYPES.contains(&tag) => Ok(Self::Unknown),
            _ => serde_json::from_value(envelope),
        }
    }
}

/// Sanitized option projection broadcast while a question is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OptionView {
    /// Option identifier.
    pub id: u32,
    /// Option text.
    pub text: String,
}

/// Per-option results row broadcast once a question ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptionResult {
    /// Option identifier.
    pub option_id: u32,
    /// Option text.
    pub text: String,
    /// Whether this option was the correct one.
    pub is_correct: bool,
    /// Share of submissions that picked this option, in whole percent.
    pub percentage: u32,
    /// Number of submissions that picked this option.
    pub count: usize,
}

/// Messages pushed to WebSocket clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// Identity assignment sent immediately after connect.
    #[serde(rename = "client_id", rename_all = "camelCase")]
    ClientId {
        /// Generated connection identifier.
        connection_id: Uuid,
    },
    /// Join acknowledgement sent to the joining participant.
    #[serde(rename = "JOIN_QUIZ", rename_all = "camelCase")]
    JoinedQuiz {
        /// Quiz the code resolved to.
        quiz_id: Uuid,
        /// Created participant record.
        participant_id: Uuid,
        /// Quiz title.
        title: String,
    },
    /// Host notification that a participant joined.
    #[serde(rename = "PLAYER_JOINED", rename_all = "camelCase")]
    PlayerJoined {
        /// The new participant.
        participant: ParticipantSummary,
    },
    /// Broadcast to participants when the host starts the session.
    #[serde(rename = "QUIZ_STARTED", rename_all = "camelCase")]
    QuizStarted {
        /// Started quiz.
        quiz_id: Uuid,
    },
    /// Sanitized question broadcast; correctness flags stripped.
    #[serde(rename = "NEW_QUESTION", rename_all = "camelCase")]
    NewQuestion {
        /// Presented question.
        question_id: Uuid,
        /// Prompt text.
        question_text: String,
        /// Options without correctness flags.
        options: Vec<OptionView>,
        /// Answering time limit in seconds.
        time_limit: u32,
    },
    /// Per-submitter answer outcome.
    #[serde(rename = "SUBMIT_ANSWER", rename_all = "camelCase")]
    AnswerResult {
        /// Recorded answer.
        answer_id: Uuid,
        /// Whether the chosen option was correct.
        is_correct: bool,
        /// Points awarded for this answer.
        score: u32,
        /// The correct option, revealed to the submitter with the outcome.
        correct_option_id: Option<u32>,
    },
    /// Live ranking pushed to the host after every scored answer.
    #[serde(rename = "LEADERBOARD_UPDATE", rename_all = "camelCase")]
    LeaderboardUpdate {
        /// Full ranking, descending by score.
        leaderboard: Vec<ParticipantSummary>,
    },
    /// Results broadcast once the host closes a question.
    #[serde(rename = "QUESTION_ENDED", rename_all = "camelCase")]
    QuestionEnded {
        /// Closed question.
        question_id: Uuid,
        /// Prompt text.
        question_text: String,
        /// Response distribution with correctness revealed.
        options: Vec<OptionResult>,
        /// Top entries of the ranking.
        leaderboard: Vec<ParticipantSummary>,
    },
    /// Final broadcast when the host ends the session.
    #[serde(rename = "QUIZ_ENDED", rename_all = "camelCase")]
    QuizEnded {
        /// Ended quiz.
        quiz_id: Uuid,
        /// Final full ranking.
        leaderboard: Vec<ParticipantSummary>,
    },
    /// Rejection notice, sent only to the offending sender.
    #[serde(rename = "ERROR", rename_all = "camelCase")]
    Error {
        /// Human-readable rejection reason.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_envelope_round_trips() {
        let text = r#"{"type":"JOIN_QUIZ","data":{"quizCode":"GEO123","alias":"Alice"}}"#;
        let message = ClientMessage::from_json_str(text).unwrap();
        match message {
            ClientMessage::JoinQuiz { quiz_code, alias } => {
                assert_eq!(quiz_code, "GEO123");
                assert_eq!(alias, "Alice");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn submit_answer_accepts_negative_response_time() {
        let question_id = Uuid::new_v4();
        let text = format!(
            r#"{{"type":"SUBMIT_ANSWER","data":{{"questionId":"{question_id}","optionId":0,"responseTime":-42}}}}"#
        );
        let message = ClientMessage::from_json_str(&text).unwrap();
        match message {
            ClientMessage::SubmitAnswer { response_time, .. } => assert_eq!(response_time, -42),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_maps_to_unknown_variant() {
        let message =
            ClientMessage::from_json_str(r#"{"type":"SELF_DESTRUCT","data":{}}"#).unwrap();
        assert!(matches!(message, ClientMessage::Unknown));

        // With or without a payload.
        let message = ClientMessage::from_json_str(r#"{"type":"PING"}"#).unwrap();
        assert!(matches!(message, ClientMessage::Unknown));
    }

    #[test]
    fn known_type_with_malformed_payload_is_an_error() {
        let text = r#"{"type":"SUBMIT_ANSWER","data":{"questionId":"not-a-uuid"}}"#;
        assert!(ClientMessage::from_json_str(text).is_err());
    }

    #[test]
    fn server_error_envelope_shape() {
        let value = serde_json::to_value(ServerMessage::Error {
            message: "duplicate: already answered".into(),
        })
        .unwrap();
        assert_eq!(value["type"], "ERROR");
        assert_eq!(value["data"]["message"], "duplicate: already answered");
    }

    #[test]
    fn new_question_payload_uses_camel_case() {
        let value = serde_json::to_value(ServerMessage::NewQuestion {
            question_id: Uuid::nil(),
            question_text: "Capital of France?".into(),
            options: vec![OptionView {
                id: 0,
                text: "Paris".into(),
            }],
            time_limit: 15,
        })
        .unwrap();
        assert_eq!(value["type"], "NEW_QUESTION");
        assert!(value["data"]["questionText"].is_string());
        assert_eq!(value["data"]["timeLimit"], 15);
        // Sanitized options must not leak correctness flags.
        assert!(value["data"]["options"][0].get("isCorrect").is_none());
    }
}
