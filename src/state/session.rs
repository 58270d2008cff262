use std::{
    collections::HashSet,
    sync::Arc,
    time::{Instant, SystemTime},
};

use dashmap::DashMap;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dao::models::{OptionEntity, ParticipantEntity, QuestionEntity};
use crate::state::phase::SessionPhase;

/// Per-participant data cached in the session roster.
///
/// The roster is the fan-out and leaderboard source; the record store keeps
/// the durable copy. Insertion order is join order.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    /// Display alias chosen at join time.
    pub alias: String,
    /// Cumulative score mirrored from the participant record.
    pub score: u32,
    /// Join timestamp, carried so participant record rewrites keep it.
    pub joined_at: SystemTime,
    /// Questions this participant has already answered.
    pub answered: HashSet<Uuid>,
}

/// Cached copy of the question currently open for answers.
#[derive(Debug, Clone)]
pub struct ActiveQuestion {
    /// Identifier of the live question.
    pub question_id: Uuid,
    /// Prompt text, kept for the results broadcast.
    pub prompt: String,
    /// Authored options including correctness flags. Never sent to
    /// participants before the question ends.
    pub options: Vec<OptionEntity>,
    /// Identifier of the correct option, if the record carries one.
    pub correct_option_id: Option<u32>,
    /// Instant the question was pushed to participants.
    pub presented_at: Instant,
    /// Per-option submission counts for the results distribution.
    pub tallies: IndexMap<u32, usize>,
}

impl ActiveQuestion {
    /// Cache the parts of a question record the coordinator needs while the
    /// question is live.
    pub fn from_question(question: &QuestionEntity) -> Self {
        let tallies = question.options.iter().map(|option| (option.id, 0)).collect();
        Self {
            question_id: question.id,
            prompt: question.prompt.clone(),
            options: question.options.clone(),
            correct_option_id: question.correct_option_id(),
            presented_at: Instant::now(),
            tallies,
        }
    }

    /// Total number of recorded submissions.
    pub fn total_answers(&self) -> usize {
        self.tallies.values().sum()
    }
}

/// In-memory state of one live quiz session.
#[derive(Debug)]
pub struct Session {
    /// Quiz this session plays; also the session's key in the table.
    pub quiz_id: Uuid,
    /// Quiz title, cached for join acknowledgements.
    pub title: String,
    /// Current lifecycle phase.
    pub phase: SessionPhase,
    /// Connection currently bound as host, if any. Cleared when the host
    /// socket closes; the session keeps its phase until a new host binds.
    pub host_connection: Option<Uuid>,
    /// Question currently accepting answers.
    pub active: Option<ActiveQuestion>,
    /// Joined participants in join order.
    pub roster: IndexMap<Uuid, RosterEntry>,
}

impl Session {
    /// Create a session in the waiting phase for the given quiz.
    pub fn new(quiz_id: Uuid, title: String) -> Self {
        Self {
            quiz_id,
            title,
            phase: SessionPhase::Waiting,
            host_connection: None,
            active: None,
            roster: IndexMap::new(),
        }
    }

    /// Add a participant to the roster preserving join order.
    pub fn admit(&mut self, participant: &ParticipantEntity) {
        self.roster.insert(
            participant.id,
            RosterEntry {
                alias: participant.alias.clone(),
                score: participant.score,
                joined_at: participant.joined_at,
                answered: HashSet::new(),
            },
        );
    }
}

/// Table of live sessions keyed by quiz id.
///
/// Each entry carries its own async mutex; every session mutation happens
/// under that lock, held across store round-trips so the duplicate-answer
/// check-then-write is atomic per session.
#[derive(Default)]
pub struct SessionTable {
    inner: DashMap<Uuid, Arc<Mutex<Session>>>,
}

impl SessionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the session for a quiz.
    pub fn get(&self, quiz_id: Uuid) -> Option<Arc<Mutex<Session>>> {
        self.inner.get(&quiz_id).map(|entry| entry.clone())
    }

    /// Fetch the session for a quiz, creating it in the waiting phase if it
    /// does not exist yet.
    pub fn get_or_create(&self, quiz_id: Uuid, title: &str) -> Arc<Mutex<Session>> {
        self.inner
            .entry(quiz_id)
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(quiz_id, title.to_owned()))))
            .clone()
    }
}
