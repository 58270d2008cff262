//! The session coordinator: validates host/participant actions against the
//! session table, scores answers, and fans out notifications.
//!
//! Every handler locks the session entry for its whole run, including store
//! round-trips, so message handling is run-to-completion per session and the
//! duplicate-answer check-then-write cannot interleave with a resubmission.

use std::time::SystemTime;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{AnswerEntity, ParticipantEntity, QuizStatus},
    dto::{
        session::{BindHostRequest, ParticipantSummary, RosterSnapshot},
        validation::validate_alias,
        ws::{ClientMessage, OptionResult, OptionView, ServerMessage},
    },
    error::ServiceError,
    services::{leaderboard, scoring, websocket_service::send_message},
    state::{
        ActiveQuestion, ConnectionRole, Session, SessionEvent, SessionPhase, SharedState,
    },
};

/// Route one inbound client frame to its handler and report rejections back
/// to the sender only.
pub async fn dispatch(state: &SharedState, connection_id: Uuid, message: ClientMessage) {
    let result = match message {
        ClientMessage::JoinQuiz { quiz_code, alias } => {
            handle_join(state, connection_id, &quiz_code, alias).await
        }
        ClientMessage::QuizStarted { quiz_id } => {
            handle_start(state, connection_id, quiz_id).await
        }
        ClientMessage::NewQuestion { question_id } => {
            handle_present_question(state, connection_id, question_id).await
        }
        ClientMessage::SubmitAnswer {
            question_id,
            option_id,
            response_time,
        } => handle_submit_answer(state, connection_id, question_id, option_id, response_time).await,
        ClientMessage::QuestionEnded { question_id } => {
            handle_end_question(state, connection_id, question_id).await
        }
        ClientMessage::QuizEnded { quiz_id } => {
            handle_end_session(state, connection_id, quiz_id).await
        }
        ClientMessage::Unknown => {
            // No reply: the sender's identity may not be resolvable yet.
            warn!(connection_id = %connection_id, "dropping message with unknown type");
            return;
        }
    };

    if let Err(err) = result {
        warn!(connection_id = %connection_id, error = %err, "rejected client action");
        reply(
            state,
            connection_id,
            &ServerMessage::Error {
                message: err.to_string(),
            },
        );
    }
}

/// Authorize a connection as host for a quiz's session.
///
/// Out-of-band side channel: the caller has already authenticated the host
/// principal; this only checks ownership and records the host affinity. A
/// successful re-bind replaces any previous host connection.
pub async fn bind_host(
    state: &SharedState,
    quiz_id: Uuid,
    request: BindHostRequest,
) -> Result<RosterSnapshot, ServiceError> {
    let store = state.require_quiz_store().await?;
    let quiz = store
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("quiz `{quiz_id}` not found")))?;

    if quiz.owner_id != request.host_id {
        return Err(ServiceError::Unauthorized(
            "host principal does not own this quiz".into(),
        ));
    }

    if state.connections().resolve(request.connection_id).is_none() {
        return Err(ServiceError::NotFound(format!(
            "connection `{}` is not registered",
            request.connection_id
        )));
    }

    let session = state.sessions().get_or_create(quiz.id, &quiz.title);
    let mut session = session.lock().await;
    if session.phase.is_terminal() {
        return Err(ServiceError::NotActive("session has ended".into()));
    }

    // After a restart the table entry is fresh but participants may already be
    // on record; restore them so the roster and leaderboard survive.
    if session.roster.is_empty() {
        for participant in store.list_participants(quiz.id).await? {
            session.admit(&participant);
        }
    }

    state
        .connections()
        .bind(request.connection_id, ConnectionRole::Host, quiz.id, None);
    if let Some(previous) = session.host_connection.replace(request.connection_id) {
        if previous != request.connection_id {
            info!(quiz_id = %quiz.id, previous = %previous, "replacing bound host connection");
        }
    }

    info!(quiz_id = %quiz.id, connection_id = %request.connection_id, "host bound to session");

    Ok(RosterSnapshot {
        participants: leaderboard::rank(&session.roster),
    })
}

/// Read-only leaderboard query, valid in every phase including `ended`.
pub async fn session_leaderboard(
    state: &SharedState,
    quiz_id: Uuid,
) -> Result<Vec<ParticipantSummary>, ServiceError> {
    let session = state
        .sessions()
        .get(quiz_id)
        .ok_or_else(|| ServiceError::NotFound(format!("no session for quiz `{quiz_id}`")))?;
    let session = session.lock().await;
    Ok(leaderboard::rank(&session.roster))
}

/// Drop a closed connection's host affinity, leaving the session phase
/// untouched until a new host re-binds. Participant closes are silent.
pub async fn handle_disconnect(state: &SharedState, connection_id: Uuid) {
    let Some(connection) = state.connections().unregister(connection_id) else {
        return;
    };
    let Some(binding) = connection.binding else {
        return;
    };

    if binding.role != ConnectionRole::Host {
        return;
    }

    if let Some(session) = state.sessions().get(binding.quiz_id) {
        let mut session = session.lock().await;
        if session.host_connection == Some(connection_id) {
            session.host_connection = None;
            info!(quiz_id = %binding.quiz_id, "host connection lost; session keeps its phase");
        }
    }
}

async fn handle_join(
    state: &SharedState,
    connection_id: Uuid,
    quiz_code: &str,
    alias: String,
) -> Result<(), ServiceError> {
    let alias = alias.trim().to_owned();
    validate_alias(&alias)
        .map_err(|err| ServiceError::InvalidInput(format!("invalid alias: {err}")))?;

    let store = state.require_quiz_store().await?;
    let code = quiz_code.trim().to_uppercase();
    let quiz = store
        .find_quiz_by_code(code.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("quiz code `{code}` not found")))?;

    let session = state.sessions().get_or_create(quiz.id, &quiz.title);
    let mut session = session.lock().await;
    // Latecomers are admitted in every phase but the terminal one; they just
    // cannot answer questions that already closed.
    if session.phase.is_terminal() {
        return Err(ServiceError::NotActive("session has ended".into()));
    }

    let participant = ParticipantEntity {
        id: Uuid::new_v4(),
        quiz_id: quiz.id,
        alias,
        score: 0,
        joined_at: SystemTime::now(),
    };
    store.save_participant(participant.clone()).await?;

    session.admit(&participant);
    state.connections().bind(
        connection_id,
        ConnectionRole::Participant,
        quiz.id,
        Some(participant.id),
    );

    info!(quiz_id = %quiz.id, participant_id = %participant.id, alias = %participant.alias, "participant joined");

    reply(
        state,
        connection_id,
        &ServerMessage::JoinedQuiz {
            quiz_id: quiz.id,
            participant_id: participant.id,
            title: session.title.clone(),
        },
    );

    notify_host(
        state,
        &session,
        &ServerMessage::PlayerJoined {
            participant: ParticipantSummary {
                participant_id: participant.id,
                alias: participant.alias,
                score: participant.score,
            },
        },
    );

    Ok(())
}

async fn handle_start(
    state: &SharedState,
    connection_id: Uuid,
    quiz_id: Uuid,
) -> Result<(), ServiceError> {
    let session = state
        .sessions()
        .get(quiz_id)
        .ok_or_else(|| ServiceError::NotFound(format!("no session for quiz `{quiz_id}`")))?;
    let session = session.lock().await;
    ensure_host(&session, connection_id)?;

    if session.phase != SessionPhase::Waiting {
        return Err(ServiceError::NotActive(
            "session has already been started".into(),
        ));
    }

    persist_quiz_status(state, quiz_id, QuizStatus::Active).await?;

    info!(quiz_id = %quiz_id, "session started");

    broadcast_to_participants(state, quiz_id, &ServerMessage::QuizStarted { quiz_id });
    Ok(())
}

async fn handle_present_question(
    state: &SharedState,
    connection_id: Uuid,
    question_id: Uuid,
) -> Result<(), ServiceError> {
    let quiz_id = bound_quiz_id(state, connection_id)?;
    let store = state.require_quiz_store().await?;
    let session = state
        .sessions()
        .get(quiz_id)
        .ok_or_else(|| ServiceError::NotFound(format!("no session for quiz `{quiz_id}`")))?;
    let mut session = session.lock().await;
    ensure_host(&session, connection_id)?;

    let question = store
        .find_question(question_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("question `{question_id}` not found")))?;
    if question.quiz_id != session.quiz_id {
        return Err(ServiceError::NotFound(format!(
            "question `{question_id}` does not belong to this quiz"
        )));
    }

    let next = session
        .phase
        .transition(SessionEvent::PresentQuestion { question_id })?;

    let active = ActiveQuestion::from_question(&question);
    let options: Vec<OptionView> = active
        .options
        .iter()
        .map(|option| OptionView {
            id: option.id,
            text: option.text.clone(),
        })
        .collect();

    session.phase = next;
    session.active = Some(active);

    info!(quiz_id = %quiz_id, question_id = %question_id, "question presented");

    broadcast_to_session(
        state,
        quiz_id,
        &ServerMessage::NewQuestion {
            question_id,
            question_text: question.prompt,
            options,
            time_limit: question.time_limit_seconds,
        },
    );

    Ok(())
}

async fn handle_submit_answer(
    state: &SharedState,
    connection_id: Uuid,
    question_id: Uuid,
    option_id: u32,
    response_time: i64,
) -> Result<(), ServiceError> {
    let connection = state
        .connections()
        .resolve(connection_id)
        .ok_or_else(|| ServiceError::Unauthorized("connection is not registered".into()))?;
    let binding = connection
        .binding
        .ok_or_else(|| ServiceError::Unauthorized("connection has not joined a session".into()))?;
    let participant_id = binding.participant_id.ok_or_else(|| {
        ServiceError::Unauthorized("only joined participants may submit answers".into())
    })?;

    let store = state.require_quiz_store().await?;
    let session = state
        .sessions()
        .get(binding.quiz_id)
        .ok_or_else(|| ServiceError::NotFound("session no longer exists".into()))?;
    let mut session = session.lock().await;

    match &session.phase {
        SessionPhase::QuestionActive {
            question_id: active_id,
        } if *active_id == question_id => {}
        SessionPhase::QuestionActive { .. } => {
            return Err(ServiceError::NotActive(
                "submitted question is not the active one".into(),
            ));
        }
        _ => {
            return Err(ServiceError::NotActive(
                "no question is accepting answers".into(),
            ));
        }
    }

    let entry = session
        .roster
        .get(&participant_id)
        .ok_or_else(|| ServiceError::Unauthorized("participant is not in this session".into()))?;
    if entry.answered.contains(&question_id) {
        return Err(ServiceError::Duplicate(
            "this question was already answered".into(),
        ));
    }
    let previous_score = entry.score;
    let alias = entry.alias.clone();
    let joined_at = entry.joined_at;

    let active = session
        .active
        .as_ref()
        .ok_or_else(|| ServiceError::NotActive("no question is accepting answers".into()))?;
    if !active.options.iter().any(|option| option.id == option_id) {
        return Err(ServiceError::NotFound(format!(
            "option `{option_id}` does not exist on the active question"
        )));
    }

    // Client-reported latency; clamp before it reaches the scoring policy.
    let response_time_ms = response_time.max(0) as u64;
    let is_correct = active.correct_option_id == Some(option_id);
    let correct_option_id = active.correct_option_id;
    let points = scoring::score(is_correct, response_time);

    let answer = AnswerEntity {
        id: Uuid::new_v4(),
        participant_id,
        question_id,
        option_id,
        is_correct,
        response_time_ms,
        points,
        created_at: SystemTime::now(),
    };

    // Store writes happen under the session lock and the Answer write is the
    // commit point. The participant row goes in first and is restored if the
    // Answer write fails, so a failed submit leaves neither record behind and
    // a retry starts from the pre-submit score.
    store
        .save_participant(ParticipantEntity {
            id: participant_id,
            quiz_id: binding.quiz_id,
            alias: alias.clone(),
            score: previous_score + points,
            joined_at,
        })
        .await?;
    if let Err(err) = store.save_answer(answer.clone()).await {
        if let Err(rollback) = store
            .save_participant(ParticipantEntity {
                id: participant_id,
                quiz_id: binding.quiz_id,
                alias,
                score: previous_score,
                joined_at,
            })
            .await
        {
            warn!(
                participant_id = %participant_id,
                error = %rollback,
                "failed to restore participant score after a failed answer write"
            );
        }
        return Err(err.into());
    }

    let active = session
        .active
        .as_mut()
        .ok_or_else(|| ServiceError::NotActive("no question is accepting answers".into()))?;
    *active.tallies.entry(option_id).or_insert(0) += 1;
    if let Some(entry) = session.roster.get_mut(&participant_id) {
        entry.score += points;
        entry.answered.insert(question_id);
    }

    reply(
        state,
        connection_id,
        &ServerMessage::AnswerResult {
            answer_id: answer.id,
            is_correct,
            score: points,
            correct_option_id,
        },
    );

    let ranking = leaderboard::rank(&session.roster);
    notify_host(
        state,
        &session,
        &ServerMessage::LeaderboardUpdate {
            leaderboard: ranking,
        },
    );

    Ok(())
}

async fn handle_end_question(
    state: &SharedState,
    connection_id: Uuid,
    question_id: Uuid,
) -> Result<(), ServiceError> {
    let quiz_id = bound_quiz_id(state, connection_id)?;
    let session = state
        .sessions()
        .get(quiz_id)
        .ok_or_else(|| ServiceError::NotFound(format!("no session for quiz `{quiz_id}`")))?;
    let mut session = session.lock().await;
    ensure_host(&session, connection_id)?;

    match &session.phase {
        SessionPhase::QuestionActive {
            question_id: active_id,
        } if *active_id == question_id => {}
        _ => {
            return Err(ServiceError::NotActive(
                "this question is not the active one".into(),
            ));
        }
    }

    let next = session.phase.transition(SessionEvent::EndQuestion)?;
    let active = session
        .active
        .take()
        .ok_or_else(|| ServiceError::NotActive("no question is active".into()))?;
    session.phase = next;

    let total = active.total_answers();
    let options: Vec<OptionResult> = active
        .options
        .iter()
        .map(|option| {
            let count = active.tallies.get(&option.id).copied().unwrap_or(0);
            let percentage = if total == 0 {
                0
            } else {
                (count * 100 / total) as u32
            };
            OptionResult {
                option_id: option.id,
                text: option.text.clone(),
                is_correct: option.is_correct,
                percentage,
                count,
            }
        })
        .collect();

    let top_n = state.config().leaderboard_top_n();
    let ranking = leaderboard::top(&session.roster, top_n);

    info!(quiz_id = %quiz_id, question_id = %question_id, answers = total, "question ended");

    broadcast_to_session(
        state,
        quiz_id,
        &ServerMessage::QuestionEnded {
            question_id,
            question_text: active.prompt,
            options,
            leaderboard: ranking,
        },
    );

    Ok(())
}

async fn handle_end_session(
    state: &SharedState,
    connection_id: Uuid,
    quiz_id: Uuid,
) -> Result<(), ServiceError> {
    let session = state
        .sessions()
        .get(quiz_id)
        .ok_or_else(|| ServiceError::NotFound(format!("no session for quiz `{quiz_id}`")))?;
    let mut session = session.lock().await;
    ensure_host(&session, connection_id)?;

    let next = session.phase.transition(SessionEvent::EndSession)?;
    persist_quiz_status(state, quiz_id, QuizStatus::Finished).await?;

    session.phase = next;
    session.active = None;

    let ranking = leaderboard::rank(&session.roster);

    info!(quiz_id = %quiz_id, participants = session.roster.len(), "session ended");

    broadcast_to_session(
        state,
        quiz_id,
        &ServerMessage::QuizEnded {
            quiz_id,
            leaderboard: ranking,
        },
    );

    Ok(())
}

/// Host-only guard: the sender must be the currently bound host connection.
fn ensure_host(session: &Session, connection_id: Uuid) -> Result<(), ServiceError> {
    if session.host_connection == Some(connection_id) {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(
            "only the bound host may perform this action".into(),
        ))
    }
}

/// Session the sender is bound to, for actions that do not carry a quiz id.
fn bound_quiz_id(state: &SharedState, connection_id: Uuid) -> Result<Uuid, ServiceError> {
    state
        .connections()
        .resolve(connection_id)
        .and_then(|connection| connection.binding)
        .map(|binding| binding.quiz_id)
        .ok_or_else(|| ServiceError::Unauthorized("connection is not bound to a session".into()))
}

async fn persist_quiz_status(
    state: &SharedState,
    quiz_id: Uuid,
    status: QuizStatus,
) -> Result<(), ServiceError> {
    let store = state.require_quiz_store().await?;
    let mut quiz = store
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("quiz `{quiz_id}` not found")))?;
    quiz.status = status;
    quiz.updated_at = SystemTime::now();
    store.save_quiz(quiz).await?;
    Ok(())
}

fn reply(state: &SharedState, connection_id: Uuid, message: &ServerMessage) {
    if let Some(tx) = state.connections().sender(connection_id) {
        send_message(&tx, message);
    }
}

fn notify_host(state: &SharedState, session: &Session, message: &ServerMessage) {
    let Some(host_connection) = session.host_connection else {
        return;
    };
    reply(state, host_connection, message);
}

fn broadcast_to_session(state: &SharedState, quiz_id: Uuid, message: &ServerMessage) {
    for connection in state.connections().connections_in_session(quiz_id) {
        send_message(&connection.tx, message);
    }
}

fn broadcast_to_participants(state: &SharedState, quiz_id: Uuid, message: &ServerMessage) {
    for tx in state.connections().participant_senders(quiz_id) {
        send_message(&tx, message);
    }
}
