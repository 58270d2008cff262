use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Role a connection acquired through an explicit bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    /// Drives question progression for its session.
    Host,
    /// Answers questions in its session.
    Participant,
}

/// Session affiliation of a bound connection.
#[derive(Debug, Clone)]
pub struct Binding {
    /// Role acquired via bind.
    pub role: ConnectionRole,
    /// Quiz/session the connection belongs to.
    pub quiz_id: Uuid,
    /// Participant record backed by this connection, for participant roles.
    pub participant_id: Option<Uuid>,
}

/// Handle used to push messages to a connected client.
#[derive(Clone)]
pub struct ClientConnection {
    /// Process-unique connection identifier.
    pub id: Uuid,
    /// Writer channel feeding the socket's dedicated writer task.
    pub tx: mpsc::UnboundedSender<Message>,
    /// Role and session affiliation once bound; `None` while anonymous.
    pub binding: Option<Binding>,
}

/// Registry of every open real-time connection.
///
/// Ids are unique for the process lifetime, lookups are `O(1)`, and fan-out
/// collects a stable copy of the matching senders so concurrent registry
/// mutation cannot disturb iteration.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: DashMap<Uuid, ClientConnection>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly opened channel, returning its generated identifier.
    pub fn register(&self, tx: mpsc::UnboundedSender<Message>) -> Uuid {
        let id = Uuid::new_v4();
        self.inner.insert(
            id,
            ClientConnection {
                id,
                tx,
                binding: None,
            },
        );
        id
    }

    /// Attach a role and session affiliation to a registered connection.
    ///
    /// Returns `false` when the connection is not (or no longer) registered.
    pub fn bind(
        &self,
        connection_id: Uuid,
        role: ConnectionRole,
        quiz_id: Uuid,
        participant_id: Option<Uuid>,
    ) -> bool {
        match self.inner.get_mut(&connection_id) {
            Some(mut connection) => {
                connection.binding = Some(Binding {
                    role,
                    quiz_id,
                    participant_id,
                });
                true
            }
            None => false,
        }
    }

    /// Resolve a connection by id.
    pub fn resolve(&self, connection_id: Uuid) -> Option<ClientConnection> {
        self.inner
            .get(&connection_id)
            .map(|connection| connection.clone())
    }

    /// Writer channel of a single connection.
    pub fn sender(&self, connection_id: Uuid) -> Option<mpsc::UnboundedSender<Message>> {
        self.inner
            .get(&connection_id)
            .map(|connection| connection.tx.clone())
    }

    /// Stable snapshot of the connections bound to a session.
    pub fn connections_in_session(&self, quiz_id: Uuid) -> Vec<ClientConnection> {
        self.inner
            .iter()
            .filter(|connection| {
                connection
                    .binding
                    .as_ref()
                    .is_some_and(|binding| binding.quiz_id == quiz_id)
            })
            .map(|connection| connection.clone())
            .collect()
    }

    /// Stable snapshot of the participant senders bound to a session.
    pub fn participant_senders(&self, quiz_id: Uuid) -> Vec<mpsc::UnboundedSender<Message>> {
        self.connections_in_session(quiz_id)
            .into_iter()
            .filter(|connection| {
                connection
                    .binding
                    .as_ref()
                    .is_some_and(|binding| binding.role == ConnectionRole::Participant)
            })
            .map(|connection| connection.tx)
            .collect()
    }

    /// Forget a closed connection, returning its last known state.
    pub fn unregister(&self, connection_id: Uuid) -> Option<ClientConnection> {
        self.inner.remove(&connection_id).map(|(_, conn)| conn)
    }

    /// Number of open connections.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no connection is open.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> mpsc::UnboundedSender<Message> {
        let (tx, _rx) = mpsc::unbounded_channel();
        tx
    }

    #[test]
    fn register_assigns_unique_ids() {
        let registry = ConnectionRegistry::new();
        let a = registry.register(channel());
        let b = registry.register(channel());
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn bind_then_resolve_reports_affiliation() {
        let registry = ConnectionRegistry::new();
        let id = registry.register(channel());
        let quiz_id = Uuid::new_v4();
        let participant_id = Uuid::new_v4();

        assert!(registry.bind(
            id,
            ConnectionRole::Participant,
            quiz_id,
            Some(participant_id)
        ));

        let connection = registry.resolve(id).unwrap();
        let binding = connection.binding.unwrap();
        assert_eq!(binding.role, ConnectionRole::Participant);
        assert_eq!(binding.quiz_id, quiz_id);
        assert_eq!(binding.participant_id, Some(participant_id));
    }

    #[test]
    fn bind_unknown_connection_fails() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.bind(Uuid::new_v4(), ConnectionRole::Host, Uuid::new_v4(), None));
    }

    #[test]
    fn session_snapshot_filters_by_quiz_and_role() {
        let registry = ConnectionRegistry::new();
        let quiz_a = Uuid::new_v4();
        let quiz_b = Uuid::new_v4();

        let host = registry.register(channel());
        let p1 = registry.register(channel());
        let p2 = registry.register(channel());
        let other = registry.register(channel());
        let _anonymous = registry.register(channel());

        registry.bind(host, ConnectionRole::Host, quiz_a, None);
        registry.bind(p1, ConnectionRole::Participant, quiz_a, Some(Uuid::new_v4()));
        registry.bind(p2, ConnectionRole::Participant, quiz_a, Some(Uuid::new_v4()));
        registry.bind(other, ConnectionRole::Participant, quiz_b, Some(Uuid::new_v4()));

        assert_eq!(registry.connections_in_session(quiz_a).len(), 3);
        assert_eq!(registry.participant_senders(quiz_a).len(), 2);
        assert_eq!(registry.participant_senders(quiz_b).len(), 1);
    }

    #[test]
    fn unregister_forgets_connection() {
        let registry = ConnectionRegistry::new();
        let id = registry.register(channel());
        assert!(registry.unregister(id).is_some());
        assert!(registry.resolve(id).is_none());
        assert!(registry.is_empty());
    }
}
