//! In-memory session store keyed by player identity.
//!
//! Each player owns one slot holding `Option<GameSession>`. Requests read the
//! slot, run a game operation against it and write it back. How that
//! read-modify-write behaves under concurrency is chosen by
//! [`ConsistencyMode`]:
//!
//! - `Atomic`: the whole update runs under the player's lock, so concurrent
//!   guesses are all counted.
//! - `LastWriteWins`: the slot is copied at entry and written back at exit.
//!   Two overlapping updates both start from the same copy and the later
//!   write discards the earlier one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::ConsistencyMode;
use crate::error::{GameError, Result};
use crate::game::GameSession;

/// Longest accepted player identity.
pub const MAX_PLAYER_ID_LEN: usize = 64;

// ============================================================================
// PlayerId
// ============================================================================

/// Identity of the player a session belongs to.
///
/// Non-empty, at most [`MAX_PLAYER_ID_LEN`] characters, ASCII alphanumerics
/// plus `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerId(String);

impl PlayerId {
    /// Validates and wraps a player identity.
    ///
    /// # Examples
    ///
    /// ```
    /// use guess_game::PlayerId;
    ///
    /// assert!(PlayerId::new("player-1").is_ok());
    /// assert!(PlayerId::new("").is_err());
    /// assert!(PlayerId::new("no spaces").is_err());
    /// ```
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(GameError::invalid_player_id(value, "must not be empty"));
        }
        if value.len() > MAX_PLAYER_ID_LEN {
            return Err(GameError::invalid_player_id(
                value,
                "must be at most 64 characters",
            ));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(GameError::invalid_player_id(
                value,
                "may only contain ASCII letters, digits, '-' and '_'",
            ));
        }
        Ok(Self(value))
    }

    /// Generates a fresh random identity.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// The identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PlayerId {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> Self {
        id.0
    }
}

// ============================================================================
// SessionStore
// ============================================================================

type Slot = Arc<tokio::sync::Mutex<Option<GameSession>>>;

/// Session slots for every known player.
#[derive(Debug, Default)]
pub struct SessionStore {
    mode: ConsistencyMode,
    slots: Mutex<HashMap<PlayerId, Slot>>,
}

impl SessionStore {
    /// Creates an empty store using `mode` for updates.
    #[must_use]
    pub fn new(mode: ConsistencyMode) -> Self {
        Self {
            mode,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The consistency mode of this store.
    #[must_use]
    pub const fn mode(&self) -> ConsistencyMode {
        self.mode
    }

    /// Number of player slots currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no slots are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, player: &PlayerId) -> Option<Slot> {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(player)
            .cloned()
    }

    fn slot_or_insert(&self, player: &PlayerId) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(player.clone()).or_default())
    }

    /// Returns a copy of the player's session, if any.
    pub async fn load(&self, player: &PlayerId) -> Option<GameSession> {
        let slot = self.slot(player)?;
        let session = slot.lock().await.clone();
        session
    }

    /// Overwrites the player's slot.
    pub async fn save(&self, player: &PlayerId, session: Option<GameSession>) {
        let slot = self.slot_or_insert(player);
        *slot.lock().await = session;
    }

    /// Runs `f` against the player's slot and stores the result.
    ///
    /// Players without a slot see `None`; a slot is only created when `f`
    /// leaves a session behind.
    pub async fn update<F, R>(&self, player: &PlayerId, f: F) -> R
    where
        F: FnOnce(&mut Option<GameSession>) -> R,
    {
        let Some(slot) = self.slot(player) else {
            let mut fresh = None;
            let result = f(&mut fresh);
            if fresh.is_some() {
                self.save(player, fresh).await;
            }
            return result;
        };

        match self.mode {
            ConsistencyMode::Atomic => {
                let mut session = slot.lock().await;
                f(&mut *session)
            }
            ConsistencyMode::LastWriteWins => {
                let mut copy = slot.lock().await.clone();
                // The lock is released here; other requests may write before we do.
                tokio::task::yield_now().await;
                let result = f(&mut copy);
                *slot.lock().await = copy;
                result
            }
        }
    }

    /// Removes empty slots and sessions unchanged since `cutoff`.
    ///
    /// Slots held by an in-flight request are left alone, whether or not it
    /// has locked them yet. Returns the number of slots removed.
    pub fn purge_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let before = slots.len();
        // Slots are only cloned under the map lock, so extra references
        // mean a request is using the slot.
        slots.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(session) => session
                    .as_ref()
                    .is_some_and(|s| !s.is_idle_since(cutoff)),
                Err(_) => true,
            }
        });
        before - slots.len()
    }
}

/// Spawns a task that purges sessions idle for longer than `idle_timeout`
/// every `interval`.
pub fn spawn_idle_sweeper(
    store: Arc<SessionStore>,
    interval: Duration,
    idle_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let idle = chrono::Duration::from_std(idle_timeout).unwrap_or(chrono::Duration::MAX);
            let cutoff = Utc::now()
                .checked_sub_signed(idle)
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            let removed = store.purge_idle(cutoff);
            if removed > 0 {
                debug!(removed, remaining = store.len(), "Purged idle sessions");
            }
        }
    })
}
