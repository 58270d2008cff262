use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Public projection of a participant, used for join notifications, roster
/// snapshots, and leaderboard rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    /// Participant identifier.
    pub participant_id: Uuid,
    /// Display alias chosen at join time.
    pub alias: String,
    /// Cumulative score.
    pub score: u32,
}

/// Request authorizing a connection as host for a session.
///
/// Sent out-of-band over REST after the host has authenticated; the real-time
/// channel never grants host status by itself.
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BindHostRequest {
    /// Connection to promote, as assigned by the `client_id` handshake.
    pub connection_id: Uuid,
    /// Principal claiming host rights; must match the quiz owner.
    pub host_id: Uuid,
}

/// Roster snapshot returned once a host binding succeeds.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RosterSnapshot {
    /// Participants already joined, in join order.
    pub participants: Vec<ParticipantSummary>,
}

/// Leaderboard returned by the read-only REST query.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardResponse {
    /// Participants ranked descending by score, ties in join order.
    pub leaderboard: Vec<ParticipantSummary>,
}
