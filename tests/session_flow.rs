//! End-to-end coordinator tests over the in-memory store and fake connections.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::SystemTime,
};

use axum::extract::ws::Message;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use quizmaster_back::{
    config::AppConfig,
    dao::{
        models::{
            AnswerEntity, OptionEntity, ParticipantEntity, QuestionEntity, QuizEntity, QuizStatus,
        },
        quiz_store::{QuizStore, memory::MemoryQuizStore},
        storage::{StorageError, StorageResult},
    },
    dto::{session::BindHostRequest, ws::ClientMessage},
    services::session_service,
    state::{AppState, SharedState},
};

struct Fixture {
    state: SharedState,
    store: Arc<dyn QuizStore>,
    quiz_id: Uuid,
    owner_id: Uuid,
    question_id: Uuid,
}

/// Quiz `GEO123` with one question: "Capital of France?" (Paris correct).
async fn fixture() -> Fixture {
    fixture_with_store(Arc::new(MemoryQuizStore::new())).await
}

async fn fixture_with_store(store: Arc<dyn QuizStore>) -> Fixture {
    let state = AppState::new(AppConfig::default());
    state.install_quiz_store(store.clone()).await;

    let quiz_id = Uuid::new_v4();
    let owner_id = Uuid::new_v4();
    let now = SystemTime::now();
    store
        .save_quiz(QuizEntity {
            id: quiz_id,
            owner_id,
            title: "World Geography".into(),
            code: "GEO123".into(),
            status: QuizStatus::Draft,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    let question_id = Uuid::new_v4();
    store
        .save_question(QuestionEntity {
            id: question_id,
            quiz_id,
            position: 0,
            prompt: "Capital of France?".into(),
            options: vec![
                OptionEntity {
                    id: 0,
                    text: "Paris".into(),
                    is_correct: true,
                },
                OptionEntity {
                    id: 1,
                    text: "London".into(),
                    is_correct: false,
                },
            ],
            time_limit_seconds: 20,
        })
        .await
        .unwrap();

    Fixture {
        state,
        store,
        quiz_id,
        owner_id,
        question_id,
    }
}

/// Memory store wrapper whose participant and answer writes can be switched
/// to fail, for exercising storage outages mid-submit.
struct OutageStore {
    inner: MemoryQuizStore,
    fail_participant_writes: AtomicBool,
    fail_answer_writes: AtomicBool,
}

impl OutageStore {
    fn new() -> Self {
        Self {
            inner: MemoryQuizStore::new(),
            fail_participant_writes: AtomicBool::new(false),
            fail_answer_writes: AtomicBool::new(false),
        }
    }

    fn outage() -> StorageError {
        StorageError::unavailable("write rejected".into(), std::io::Error::other("socket closed"))
    }
}

impl QuizStore for OutageStore {
    fn save_quiz(&self, quiz: QuizEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.save_quiz(quiz)
    }

    fn find_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        self.inner.find_quiz(id)
    }

    fn find_quiz_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        self.inner.find_quiz_by_code(code)
    }

    fn code_exists(&self, code: String) -> BoxFuture<'static, StorageResult<bool>> {
        self.inner.code_exists(code)
    }

    fn save_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.save_question(question)
    }

    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        self.inner.find_question(id)
    }

    fn list_questions(
        &self,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        self.inner.list_questions(quiz_id)
    }

    fn save_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        if self.fail_participant_writes.load(Ordering::SeqCst) {
            return Box::pin(async { Err(Self::outage()) });
        }
        self.inner.save_participant(participant)
    }

    fn list_participants(
        &self,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        self.inner.list_participants(quiz_id)
    }

    fn save_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>> {
        if self.fail_answer_writes.load(Ordering::SeqCst) {
            return Box::pin(async { Err(Self::outage()) });
        }
        self.inner.save_answer(answer)
    }

    fn find_answer(
        &self,
        participant_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>> {
        self.inner.find_answer(participant_id, question_id)
    }

    fn list_answers(&self, question_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        self.inner.list_answers(question_id)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}

/// Register a fake connection and return its id plus the outbound frame queue.
fn connect(state: &SharedState) -> (Uuid, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = state.connections().register(tx);
    (id, rx)
}

/// Pop the next queued frame as parsed JSON.
fn next_json(rx: &mut mpsc::UnboundedReceiver<Message>) -> Value {
    match rx.try_recv().expect("expected a queued frame") {
        Message::Text(text) => serde_json::from_str(&text).expect("frame is valid JSON"),
        other => panic!("unexpected frame: {other:?}"),
    }
}

fn assert_no_frames(rx: &mut mpsc::UnboundedReceiver<Message>) {
    assert!(rx.try_recv().is_err(), "expected no queued frames");
}

async fn bind_host(fixture: &Fixture, connection_id: Uuid) {
    session_service::bind_host(
        &fixture.state,
        fixture.quiz_id,
        BindHostRequest {
            connection_id,
            host_id: fixture.owner_id,
        },
    )
    .await
    .expect("host binds");
}

async fn join(
    fixture: &Fixture,
    connection_id: Uuid,
    rx: &mut mpsc::UnboundedReceiver<Message>,
    alias: &str,
) -> Uuid {
    session_service::dispatch(
        &fixture.state,
        connection_id,
        ClientMessage::JoinQuiz {
            quiz_code: "GEO123".into(),
            alias: alias.into(),
        },
    )
    .await;
    let ack = next_json(rx);
    assert_eq!(ack["type"], "JOIN_QUIZ");
    ack["data"]["participantId"]
        .as_str()
        .and_then(|raw| raw.parse().ok())
        .expect("join ack carries the participant id")
}

#[tokio::test]
async fn full_session_flow_scores_and_ranks() {
    let fixture = fixture().await;
    let (host, mut host_rx) = connect(&fixture.state);
    bind_host(&fixture, host).await;

    let (alice, mut alice_rx) = connect(&fixture.state);
    let alice_id = join(&fixture, alice, &mut alice_rx, "Alice").await;

    let joined = next_json(&mut host_rx);
    assert_eq!(joined["type"], "PLAYER_JOINED");
    assert_eq!(joined["data"]["participant"]["alias"], "Alice");

    session_service::dispatch(
        &fixture.state,
        host,
        ClientMessage::QuizStarted {
            quiz_id: fixture.quiz_id,
        },
    )
    .await;
    assert_eq!(next_json(&mut alice_rx)["type"], "QUIZ_STARTED");

    session_service::dispatch(
        &fixture.state,
        host,
        ClientMessage::NewQuestion {
            question_id: fixture.question_id,
        },
    )
    .await;
    let question = next_json(&mut alice_rx);
    assert_eq!(question["type"], "NEW_QUESTION");
    assert_eq!(question["data"]["questionText"], "Capital of France?");
    assert_eq!(question["data"]["timeLimit"], 20);
    assert!(
        question["data"]["options"][0].get("isCorrect").is_none(),
        "live question must not leak correctness"
    );
    // The host screen receives the same broadcast.
    assert_eq!(next_json(&mut host_rx)["type"], "NEW_QUESTION");

    session_service::dispatch(
        &fixture.state,
        alice,
        ClientMessage::SubmitAnswer {
            question_id: fixture.question_id,
            option_id: 0,
            response_time: 3000,
        },
    )
    .await;
    let ack = next_json(&mut alice_rx);
    assert_eq!(ack["type"], "SUBMIT_ANSWER");
    assert_eq!(ack["data"]["isCorrect"], true);
    assert_eq!(ack["data"]["score"], 150);
    assert_eq!(ack["data"]["correctOptionId"], 0);

    let update = next_json(&mut host_rx);
    assert_eq!(update["type"], "LEADERBOARD_UPDATE");
    assert_eq!(update["data"]["leaderboard"][0]["alias"], "Alice");
    assert_eq!(update["data"]["leaderboard"][0]["score"], 150);

    // Resubmission is rejected for the sender only and changes nothing.
    session_service::dispatch(
        &fixture.state,
        alice,
        ClientMessage::SubmitAnswer {
            question_id: fixture.question_id,
            option_id: 1,
            response_time: 100,
        },
    )
    .await;
    let rejection = next_json(&mut alice_rx);
    assert_eq!(rejection["type"], "ERROR");
    assert!(
        rejection["data"]["message"]
            .as_str()
            .unwrap()
            .starts_with("duplicate"),
    );
    assert_no_frames(&mut host_rx);
    assert_eq!(
        fixture
            .store
            .list_answers(fixture.question_id)
            .await
            .unwrap()
            .len(),
        1
    );

    session_service::dispatch(
        &fixture.state,
        host,
        ClientMessage::QuestionEnded {
            question_id: fixture.question_id,
        },
    )
    .await;
    let results = next_json(&mut alice_rx);
    assert_eq!(results["type"], "QUESTION_ENDED");
    assert_eq!(results["data"]["options"][0]["isCorrect"], true);
    assert_eq!(results["data"]["options"][0]["percentage"], 100);
    assert_eq!(results["data"]["options"][0]["count"], 1);
    assert_eq!(results["data"]["options"][1]["count"], 0);
    assert_eq!(next_json(&mut host_rx)["type"], "QUESTION_ENDED");

    session_service::dispatch(
        &fixture.state,
        host,
        ClientMessage::QuizEnded {
            quiz_id: fixture.quiz_id,
        },
    )
    .await;
    let finale = next_json(&mut alice_rx);
    assert_eq!(finale["type"], "QUIZ_ENDED");
    assert_eq!(finale["data"]["leaderboard"][0]["score"], 150);
    assert_eq!(next_json(&mut host_rx)["type"], "QUIZ_ENDED");

    let quiz = fixture
        .store
        .find_quiz(fixture.quiz_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(quiz.status, QuizStatus::Finished);

    let stored = fixture
        .store
        .find_answer(alice_id, fixture.question_id)
        .await
        .unwrap()
        .expect("answer persisted");
    assert!(stored.is_correct);
    assert_eq!(stored.points, 150);
}

#[tokio::test]
async fn non_host_cannot_drive_progression() {
    let fixture = fixture().await;
    let (host, mut host_rx) = connect(&fixture.state);
    bind_host(&fixture, host).await;

    let (alice, mut alice_rx) = connect(&fixture.state);
    join(&fixture, alice, &mut alice_rx, "Alice").await;
    let _ = next_json(&mut host_rx); // PLAYER_JOINED

    session_service::dispatch(
        &fixture.state,
        alice,
        ClientMessage::NewQuestion {
            question_id: fixture.question_id,
        },
    )
    .await;
    let rejection = next_json(&mut alice_rx);
    assert_eq!(rejection["type"], "ERROR");
    assert!(
        rejection["data"]["message"]
            .as_str()
            .unwrap()
            .starts_with("unauthorized"),
    );
    assert_no_frames(&mut host_rx);
}

#[tokio::test]
async fn submissions_outside_an_active_question_are_rejected() {
    let fixture = fixture().await;
    let (host, mut host_rx) = connect(&fixture.state);
    bind_host(&fixture, host).await;

    let (alice, mut alice_rx) = connect(&fixture.state);
    join(&fixture, alice, &mut alice_rx, "Alice").await;
    let _ = next_json(&mut host_rx);

    // Waiting phase: nothing to answer yet.
    session_service::dispatch(
        &fixture.state,
        alice,
        ClientMessage::SubmitAnswer {
            question_id: fixture.question_id,
            option_id: 0,
            response_time: 1000,
        },
    )
    .await;
    let rejection = next_json(&mut alice_rx);
    assert_eq!(rejection["type"], "ERROR");
    assert!(
        rejection["data"]["message"]
            .as_str()
            .unwrap()
            .starts_with("not active"),
    );

    assert!(
        fixture
            .store
            .list_answers(fixture.question_id)
            .await
            .unwrap()
            .is_empty(),
        "rejected submissions must not be persisted"
    );
}

#[tokio::test]
async fn results_distribution_splits_between_options() {
    let fixture = fixture().await;
    let (host, mut host_rx) = connect(&fixture.state);
    bind_host(&fixture, host).await;

    let (alice, mut alice_rx) = connect(&fixture.state);
    join(&fixture, alice, &mut alice_rx, "Alice").await;
    let (bob, mut bob_rx) = connect(&fixture.state);
    join(&fixture, bob, &mut bob_rx, "Bob").await;
    let _ = next_json(&mut host_rx);
    let _ = next_json(&mut host_rx);
    // Join notifications go to the host only.
    assert_no_frames(&mut alice_rx);

    session_service::dispatch(
        &fixture.state,
        host,
        ClientMessage::NewQuestion {
            question_id: fixture.question_id,
        },
    )
    .await;
    for rx in [&mut host_rx, &mut alice_rx, &mut bob_rx] {
        assert_eq!(next_json(rx)["type"], "NEW_QUESTION");
    }

    session_service::dispatch(
        &fixture.state,
        alice,
        ClientMessage::SubmitAnswer {
            question_id: fixture.question_id,
            option_id: 0,
            response_time: 3000,
        },
    )
    .await;
    session_service::dispatch(
        &fixture.state,
        bob,
        ClientMessage::SubmitAnswer {
            question_id: fixture.question_id,
            option_id: 1,
            response_time: 7000,
        },
    )
    .await;
    let bob_ack = next_json(&mut bob_rx);
    assert_eq!(bob_ack["data"]["isCorrect"], false);
    assert_eq!(bob_ack["data"]["score"], 0);

    session_service::dispatch(
        &fixture.state,
        host,
        ClientMessage::QuestionEnded {
            question_id: fixture.question_id,
        },
    )
    .await;
    // Skip Alice's ack and both leaderboard updates queued before the results.
    let _ = next_json(&mut alice_rx);
    let _ = next_json(&mut host_rx);
    let _ = next_json(&mut host_rx);

    let results = next_json(&mut host_rx);
    assert_eq!(results["type"], "QUESTION_ENDED");
    assert_eq!(results["data"]["options"][0]["percentage"], 50);
    assert_eq!(results["data"]["options"][0]["count"], 1);
    assert_eq!(results["data"]["options"][1]["percentage"], 50);
    assert_eq!(results["data"]["options"][1]["count"], 1);
    assert_eq!(results["data"]["leaderboard"][0]["alias"], "Alice");
}

#[tokio::test]
async fn question_from_another_quiz_is_not_presentable() {
    let fixture = fixture().await;
    let stray_question = Uuid::new_v4();
    fixture
        .store
        .save_question(QuestionEntity {
            id: stray_question,
            quiz_id: Uuid::new_v4(),
            position: 0,
            prompt: "Capital of Spain?".into(),
            options: vec![
                OptionEntity {
                    id: 0,
                    text: "Madrid".into(),
                    is_correct: true,
                },
                OptionEntity {
                    id: 1,
                    text: "Lisbon".into(),
                    is_correct: false,
                },
            ],
            time_limit_seconds: 20,
        })
        .await
        .unwrap();

    let (host, mut host_rx) = connect(&fixture.state);
    bind_host(&fixture, host).await;
    let (alice, mut alice_rx) = connect(&fixture.state);
    join(&fixture, alice, &mut alice_rx, "Alice").await;
    let _ = next_json(&mut host_rx);

    session_service::dispatch(
        &fixture.state,
        host,
        ClientMessage::QuizStarted {
            quiz_id: fixture.quiz_id,
        },
    )
    .await;
    assert_eq!(next_json(&mut alice_rx)["type"], "QUIZ_STARTED");

    session_service::dispatch(
        &fixture.state,
        host,
        ClientMessage::NewQuestion {
            question_id: stray_question,
        },
    )
    .await;
    let rejection = next_json(&mut host_rx);
    assert_eq!(rejection["type"], "ERROR");
    assert!(
        rejection["data"]["message"]
            .as_str()
            .unwrap()
            .starts_with("not found"),
    );
    assert_no_frames(&mut alice_rx);

    // The phase is untouched: the session's own question still opens.
    session_service::dispatch(
        &fixture.state,
        host,
        ClientMessage::NewQuestion {
            question_id: fixture.question_id,
        },
    )
    .await;
    assert_eq!(next_json(&mut alice_rx)["type"], "NEW_QUESTION");
    assert_eq!(next_json(&mut host_rx)["type"], "NEW_QUESTION");
}

#[tokio::test]
async fn failed_submit_leaves_no_partial_records() {
    let outage = Arc::new(OutageStore::new());
    let fixture = fixture_with_store(outage.clone()).await;
    let (host, mut host_rx) = connect(&fixture.state);
    bind_host(&fixture, host).await;
    let (alice, mut alice_rx) = connect(&fixture.state);
    let alice_id = join(&fixture, alice, &mut alice_rx, "Alice").await;
    let _ = next_json(&mut host_rx);

    session_service::dispatch(
        &fixture.state,
        host,
        ClientMessage::QuizStarted {
            quiz_id: fixture.quiz_id,
        },
    )
    .await;
    assert_eq!(next_json(&mut alice_rx)["type"], "QUIZ_STARTED");
    session_service::dispatch(
        &fixture.state,
        host,
        ClientMessage::NewQuestion {
            question_id: fixture.question_id,
        },
    )
    .await;
    assert_eq!(next_json(&mut alice_rx)["type"], "NEW_QUESTION");
    assert_eq!(next_json(&mut host_rx)["type"], "NEW_QUESTION");

    // Answer write fails after the participant row went in.
    outage.fail_answer_writes.store(true, Ordering::SeqCst);
    session_service::dispatch(
        &fixture.state,
        alice,
        ClientMessage::SubmitAnswer {
            question_id: fixture.question_id,
            option_id: 0,
            response_time: 3000,
        },
    )
    .await;
    let rejection = next_json(&mut alice_rx);
    assert_eq!(rejection["type"], "ERROR");
    assert!(
        rejection["data"]["message"]
            .as_str()
            .unwrap()
            .starts_with("storage unavailable"),
    );
    assert_no_frames(&mut host_rx);
    assert!(
        fixture
            .store
            .list_answers(fixture.question_id)
            .await
            .unwrap()
            .is_empty(),
        "failed submit must not leave an Answer behind"
    );
    let participants = fixture.store.list_participants(fixture.quiz_id).await.unwrap();
    assert_eq!(participants[0].score, 0, "score must be rolled back");

    // Participant write fails before anything was recorded.
    outage.fail_answer_writes.store(false, Ordering::SeqCst);
    outage.fail_participant_writes.store(true, Ordering::SeqCst);
    session_service::dispatch(
        &fixture.state,
        alice,
        ClientMessage::SubmitAnswer {
            question_id: fixture.question_id,
            option_id: 0,
            response_time: 3000,
        },
    )
    .await;
    assert_eq!(next_json(&mut alice_rx)["type"], "ERROR");
    assert!(
        fixture
            .store
            .list_answers(fixture.question_id)
            .await
            .unwrap()
            .is_empty()
    );

    // A retry once storage recovers is not a duplicate and scores normally.
    outage.fail_participant_writes.store(false, Ordering::SeqCst);
    session_service::dispatch(
        &fixture.state,
        alice,
        ClientMessage::SubmitAnswer {
            question_id: fixture.question_id,
            option_id: 0,
            response_time: 3000,
        },
    )
    .await;
    let ack = next_json(&mut alice_rx);
    assert_eq!(ack["type"], "SUBMIT_ANSWER");
    assert_eq!(ack["data"]["score"], 150);
    assert_eq!(next_json(&mut host_rx)["type"], "LEADERBOARD_UPDATE");

    let answers = fixture.store.list_answers(fixture.question_id).await.unwrap();
    assert_eq!(answers.len(), 1);
    let stored = fixture
        .store
        .find_answer(alice_id, fixture.question_id)
        .await
        .unwrap()
        .expect("retried answer persisted");
    assert_eq!(stored.points, 150);
    let participants = fixture.store.list_participants(fixture.quiz_id).await.unwrap();
    assert_eq!(participants[0].score, 150);
}

#[tokio::test]
async fn terminal_session_rejects_joins_but_serves_leaderboard() {
    let fixture = fixture().await;
    let (host, mut host_rx) = connect(&fixture.state);
    bind_host(&fixture, host).await;

    let (alice, mut alice_rx) = connect(&fixture.state);
    join(&fixture, alice, &mut alice_rx, "Alice").await;
    let _ = next_json(&mut host_rx);

    session_service::dispatch(
        &fixture.state,
        host,
        ClientMessage::QuizEnded {
            quiz_id: fixture.quiz_id,
        },
    )
    .await;
    assert_eq!(next_json(&mut alice_rx)["type"], "QUIZ_ENDED");
    assert_eq!(next_json(&mut host_rx)["type"], "QUIZ_ENDED");

    let (late, mut late_rx) = connect(&fixture.state);
    session_service::dispatch(
        &fixture.state,
        late,
        ClientMessage::JoinQuiz {
            quiz_code: "GEO123".into(),
            alias: "Latecomer".into(),
        },
    )
    .await;
    let rejection = next_json(&mut late_rx);
    assert_eq!(rejection["type"], "ERROR");
    assert!(
        rejection["data"]["message"]
            .as_str()
            .unwrap()
            .starts_with("not active"),
    );

    let ranking = session_service::session_leaderboard(&fixture.state, fixture.quiz_id)
        .await
        .expect("leaderboard readable after the session ends");
    assert_eq!(ranking.len(), 1);
    assert_eq!(ranking[0].alias, "Alice");
}
