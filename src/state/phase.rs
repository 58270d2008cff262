use thiserror::Error;
use uuid::Uuid;

/// Lifecycle phases of a live quiz session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// Session exists, no question has been presented yet (or the host has
    /// not moved on after ending one via a fresh session).
    Waiting,
    /// A question is live and accepting answers; the payload identifies it.
    QuestionActive {
        /// The question currently open for answers.
        question_id: Uuid,
    },
    /// The last presented question was closed; results are visible.
    QuestionEnded,
    /// Terminal. Only read-only leaderboard queries remain valid.
    Ended,
}

/// Events the coordinator applies to a session's phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Host presents a question, opening it for answers.
    PresentQuestion {
        /// Question being opened.
        question_id: Uuid,
    },
    /// Host closes the active question.
    EndQuestion,
    /// Host ends the whole session.
    EndSession,
}

/// Error returned when an event cannot be applied from the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the session was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

impl SessionPhase {
    /// Whether the session still accepts host/participant actions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Ended)
    }

    /// Compute the phase an event leads to, without mutating.
    pub fn transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.clone(), event) {
            (
                SessionPhase::Waiting | SessionPhase::QuestionEnded,
                SessionEvent::PresentQuestion { question_id },
            ) => SessionPhase::QuestionActive { question_id },
            (SessionPhase::QuestionActive { .. }, SessionEvent::EndQuestion) => {
                SessionPhase::QuestionEnded
            }
            (
                SessionPhase::Waiting
                | SessionPhase::QuestionActive { .. }
                | SessionPhase::QuestionEnded,
                SessionEvent::EndSession,
            ) => SessionPhase::Ended,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(phase: &mut SessionPhase, event: SessionEvent) -> SessionPhase {
        *phase = phase.transition(event).unwrap();
        phase.clone()
    }

    #[test]
    fn full_happy_path_through_session() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let mut phase = SessionPhase::Waiting;

        assert_eq!(
            apply(&mut phase, SessionEvent::PresentQuestion { question_id: q1 }),
            SessionPhase::QuestionActive { question_id: q1 }
        );
        assert_eq!(
            apply(&mut phase, SessionEvent::EndQuestion),
            SessionPhase::QuestionEnded
        );
        assert_eq!(
            apply(&mut phase, SessionEvent::PresentQuestion { question_id: q2 }),
            SessionPhase::QuestionActive { question_id: q2 }
        );
        assert_eq!(
            apply(&mut phase, SessionEvent::EndQuestion),
            SessionPhase::QuestionEnded
        );
        assert_eq!(
            apply(&mut phase, SessionEvent::EndSession),
            SessionPhase::Ended
        );
        assert!(phase.is_terminal());
    }

    #[test]
    fn present_while_active_is_rejected() {
        let q1 = Uuid::new_v4();
        let phase = SessionPhase::QuestionActive { question_id: q1 };

        let err = phase
            .transition(SessionEvent::PresentQuestion {
                question_id: Uuid::new_v4(),
            })
            .unwrap_err();
        assert_eq!(err.from, phase);
    }

    #[test]
    fn end_question_requires_active_question() {
        let err = SessionPhase::Waiting
            .transition(SessionEvent::EndQuestion)
            .unwrap_err();
        assert_eq!(err.from, SessionPhase::Waiting);
        assert_eq!(err.event, SessionEvent::EndQuestion);
    }

    #[test]
    fn end_session_allowed_from_every_non_terminal_phase() {
        let q1 = Uuid::new_v4();
        for phase in [
            SessionPhase::Waiting,
            SessionPhase::QuestionActive { question_id: q1 },
            SessionPhase::QuestionEnded,
        ] {
            assert_eq!(
                phase.transition(SessionEvent::EndSession).unwrap(),
                SessionPhase::Ended
            );
        }
    }

    #[test]
    fn terminal_phase_accepts_nothing() {
        for event in [
            SessionEvent::PresentQuestion {
                question_id: Uuid::new_v4(),
            },
            SessionEvent::EndQuestion,
            SessionEvent::EndSession,
        ] {
            assert!(SessionPhase::Ended.transition(event).is_err());
        }
    }
}
