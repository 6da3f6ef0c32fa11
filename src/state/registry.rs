//! Process-wide lookup from session id to session and from player id to the
//! session they are playing in. All mutations of the two maps go through the
//! methods below; the registry itself performs no I/O.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::EngineError,
    state::{
        game::{GameSession, PlayerId, PlayerState},
        state_machine::GamePhase,
        timers::TimerBank,
    },
};

/// Shared handle to one registered session and the timers it owns. The timer
/// bank lives next to the session so teardown is a single, total operation.
#[derive(Clone)]
pub struct SessionEntry {
    session: Arc<RwLock<GameSession>>,
    timers: Arc<TimerBank>,
}

impl SessionEntry {
    /// The session state behind its lock.
    pub fn session(&self) -> &Arc<RwLock<GameSession>> {
        &self.session
    }

    /// The timer bank owned by this session.
    pub fn timers(&self) -> &Arc<TimerBank> {
        &self.timers
    }
}

/// Registry of every live session. A player id maps to at most one session
/// at a time; only the owning lifecycle callbacks mutate a given session's
/// state, so the session lock is never contended across sessions.
#[derive(Default)]
pub struct GameRegistry {
    sessions: DashMap<Uuid, SessionEntry>,
    players: DashMap<PlayerId, Uuid>,
}

impl GameRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly built session. Fails with `AlreadyInGame` when the
    /// owner is still mapped to another session; on success the owner's
    /// player mapping is reserved atomically.
    pub fn create_session(&self, session: GameSession) -> Result<Uuid, EngineError> {
        let session_id = session.id;
        let owner_id = session.owner_id.clone();

        match self.players.entry(owner_id.clone()) {
            Entry::Occupied(_) => return Err(EngineError::AlreadyInGame(owner_id)),
            Entry::Vacant(slot) => {
                slot.insert(session_id);
            }
        }

        self.sessions.insert(
            session_id,
            SessionEntry {
                session: Arc::new(RwLock::new(session)),
                timers: Arc::new(TimerBank::new()),
            },
        );

        Ok(session_id)
    }

    /// Fetch the entry for a session id.
    pub fn lookup(&self, session_id: Uuid) -> Result<SessionEntry, EngineError> {
        self.sessions
            .get(&session_id)
            .map(|entry| entry.value().clone())
            .ok_or(EngineError::SessionNotFound(session_id))
    }

    /// The session a player is currently registered to, if any.
    pub fn session_for_player(&self, player_id: &str) -> Option<Uuid> {
        self.players.get(player_id).map(|entry| *entry)
    }

    /// Add a player to a session that is still accepting them.
    pub async fn join_session(
        &self,
        session_id: Uuid,
        player: PlayerState,
    ) -> Result<(), EngineError> {
        let entry = self.lookup(session_id)?;
        let mut session = entry.session.write().await;

        match session.phase() {
            GamePhase::Waiting | GamePhase::Starting => {}
            _ => return Err(EngineError::SessionClosed(session_id)),
        }
        if session.players.len() >= session.max_players {
            return Err(EngineError::SessionFull(session_id));
        }

        let player_id = player.id.clone();
        match self.players.entry(player_id.clone()) {
            Entry::Occupied(_) => return Err(EngineError::AlreadyInGame(player_id)),
            Entry::Vacant(slot) => {
                slot.insert(session_id);
            }
        }

        session.players.insert(player_id, player);
        Ok(())
    }

    /// Remove a player from whatever session they are in. Idempotent: an
    /// unregistered player is a no-op. Returns the session id and whether the
    /// session is now empty, so the caller can decide on teardown.
    pub async fn remove_player(&self, player_id: &str) -> Option<(Uuid, bool)> {
        let (_, session_id) = self.players.remove(player_id)?;

        let Ok(entry) = self.lookup(session_id) else {
            return Some((session_id, true));
        };

        let mut session = entry.session.write().await;
        session.players.shift_remove(player_id);
        let empty = session.players.is_empty();
        Some((session_id, empty))
    }

    /// Tear a session down: cancel all of its timers and drop both the
    /// session entry and every player mapping pointing at it. Idempotent.
    pub async fn teardown(&self, session_id: Uuid) {
        let Some((_, entry)) = self.sessions.remove(&session_id) else {
            return;
        };

        entry.timers.cancel_all();

        let player_ids: Vec<PlayerId> = {
            let session = entry.session.read().await;
            session.players.keys().cloned().collect()
        };
        for player_id in player_ids {
            self.players
                .remove_if(&player_id, |_, mapped| *mapped == session_id);
        }
    }

    /// Run a closure over a shared borrow of a session's state.
    pub async fn with_session<F, R>(&self, session_id: Uuid, f: F) -> Result<R, EngineError>
    where
        F: FnOnce(&GameSession) -> R,
    {
        let entry = self.lookup(session_id)?;
        let session = entry.session.read().await;
        Ok(f(&session))
    }

    /// Run a closure over an exclusive borrow of a session's state.
    pub async fn with_session_mut<F, R>(&self, session_id: Uuid, f: F) -> Result<R, EngineError>
    where
        F: FnOnce(&mut GameSession) -> R,
    {
        let entry = self.lookup(session_id)?;
        let mut session = entry.session.write().await;
        Ok(f(&mut session))
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{game::Difficulty, state_machine::GameEvent};

    fn new_session(owner: &str, max_players: usize) -> GameSession {
        GameSession::new(
            owner.to_string(),
            owner.to_string(),
            Difficulty::Easy,
            5,
            max_players,
            max_players == 1,
        )
    }

    fn player(id: &str) -> PlayerState {
        PlayerState::new(id.to_string(), id.to_string())
    }

    #[tokio::test]
    async fn owner_cannot_create_two_sessions() {
        let registry = GameRegistry::new();
        registry.create_session(new_session("ana", 4)).unwrap();

        let err = registry.create_session(new_session("ana", 4)).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyInGame(id) if id == "ana"));
        assert_eq!(registry.session_count(), 1);
    }

    #[tokio::test]
    async fn join_rejects_player_from_another_session() {
        let registry = GameRegistry::new();
        registry.create_session(new_session("ana", 4)).unwrap();
        let second = registry.create_session(new_session("bo", 4)).unwrap();

        let err = registry.join_session(second, player("ana")).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyInGame(id) if id == "ana"));

        // Nothing was mutated: ana still maps to her own session.
        let own = registry.session_for_player("ana").unwrap();
        assert_ne!(own, second);
        let count = registry
            .with_session(second, |session| session.players.len())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn join_rejects_when_full_or_closed() {
        let registry = GameRegistry::new();
        let id = registry.create_session(new_session("ana", 2)).unwrap();
        registry.join_session(id, player("bo")).await.unwrap();

        let err = registry.join_session(id, player("cy")).await.unwrap_err();
        assert!(matches!(err, EngineError::SessionFull(_)));

        registry
            .with_session_mut(id, |session| {
                session.apply_event(GameEvent::StartGeneration).unwrap();
                session.apply_event(GameEvent::GenerationReady).unwrap();
            })
            .await
            .unwrap();
        registry.remove_player("bo").await.unwrap();
        let err = registry.join_session(id, player("cy")).await.unwrap_err();
        assert!(matches!(err, EngineError::SessionClosed(_)));
    }

    #[tokio::test]
    async fn remove_player_is_idempotent() {
        let registry = GameRegistry::new();
        let id = registry.create_session(new_session("ana", 4)).unwrap();
        registry.join_session(id, player("bo")).await.unwrap();

        assert_eq!(registry.remove_player("bo").await, Some((id, false)));
        assert_eq!(registry.remove_player("bo").await, None);
        assert_eq!(registry.remove_player("ana").await, Some((id, true)));
        assert_eq!(registry.remove_player("ana").await, None);
    }

    #[tokio::test]
    async fn teardown_releases_all_player_mappings() {
        let registry = GameRegistry::new();
        let id = registry.create_session(new_session("ana", 4)).unwrap();
        registry.join_session(id, player("bo")).await.unwrap();

        registry.teardown(id).await;

        assert!(matches!(
            registry.lookup(id),
            Err(EngineError::SessionNotFound(_))
        ));
        assert_eq!(registry.session_for_player("ana"), None);
        assert_eq!(registry.session_for_player("bo"), None);

        // Second teardown is a no-op.
        registry.teardown(id).await;
    }
}
