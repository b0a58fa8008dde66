//! Guessing game session state machine.
//!
//! A player's game lives in a session slot, `Option<GameSession>`, which the
//! caller owns and passes in explicitly. The three operations are:
//!
//! - [`start`]: draw a new secret and replace whatever the slot held.
//! - [`submit_guess`]: compare a guess against the secret.
//! - [`get_state`]: describe the slot without touching it.
//!
//! ```text
//!   NoSession --start--> InProgress --correct guess--> Finished
//!                         |    ^                          |
//!                         +----+ wrong guess              |
//!                                                         |
//!   InProgress <------------------start-------------------+
//! ```
//!
//! Guesses in `NoSession` or `Finished` are rejected without mutation, as are
//! guesses outside `[SECRET_MIN, SECRET_MAX]`. Rejections are reported in the
//! returned [`GuessOutcome`], never as errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::random::SecretSource;

/// Smallest value a secret or a guess may take.
pub const SECRET_MIN: u8 = 0;

/// Largest value a secret or a guess may take.
pub const SECRET_MAX: u8 = 100;

// ============================================================================
// SessionPhase
// ============================================================================

/// Where a player's session slot is in the game lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No game has been started.
    #[default]
    NoSession,
    /// A game is running and accepts guesses.
    InProgress,
    /// The secret was found; guesses are refused until a new start.
    Finished,
}

impl SessionPhase {
    /// Returns the phase of a session slot.
    ///
    /// # Examples
    ///
    /// ```
    /// use guess_game::SessionPhase;
    ///
    /// assert_eq!(SessionPhase::of(None), SessionPhase::NoSession);
    /// ```
    #[must_use]
    pub const fn of(slot: Option<&GameSession>) -> Self {
        match slot {
            None => Self::NoSession,
            Some(session) if session.finished => Self::Finished,
            Some(_) => Self::InProgress,
        }
    }

    /// Returns `true` if guesses are refused in this phase.
    ///
    /// # Examples
    ///
    /// ```
    /// use guess_game::SessionPhase;
    ///
    /// assert!(SessionPhase::NoSession.is_terminal());
    /// assert!(SessionPhase::Finished.is_terminal());
    /// assert!(!SessionPhase::InProgress.is_terminal());
    /// ```
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::NoSession | Self::Finished)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSession => write!(f, "no_session"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

// ============================================================================
// GameSession
// ============================================================================

/// One player's game: the secret, the attempts so far and whether it is over.
///
/// The secret is private and never serialized into responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    secret: u8,
    attempts: u32,
    finished: bool,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GameSession {
    /// Creates an in-progress session for `secret`.
    ///
    /// Fails if `secret` lies outside `[SECRET_MIN, SECRET_MAX]`.
    pub fn new(secret: u8) -> Result<Self> {
        if !(SECRET_MIN..=SECRET_MAX).contains(&secret) {
            return Err(GameError::secret_out_of_range(
                secret, SECRET_MIN, SECRET_MAX,
            ));
        }
        let now = Utc::now();
        Ok(Self {
            secret,
            attempts: 0,
            finished: false,
            started_at: now,
            updated_at: now,
        })
    }

    /// The number the player is trying to find.
    #[must_use]
    pub const fn secret(&self) -> u8 {
        self.secret
    }

    /// Valid guesses submitted so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether the secret has been found.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// When the session was started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When the session last changed.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns `true` if the session has not changed since `cutoff`.
    #[must_use]
    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.updated_at < cutoff
    }

    /// Records one in-range guess and returns its verdict.
    fn record_guess(&mut self, value: u8) -> (GuessVerdict, String) {
        self.attempts += 1;
        self.updated_at = Utc::now();
        match value.cmp(&self.secret) {
            std::cmp::Ordering::Greater => (GuessVerdict::Lower, "target is lower".to_string()),
            std::cmp::Ordering::Less => (GuessVerdict::Higher, "target is higher".to_string()),
            std::cmp::Ordering::Equal => {
                self.finished = true;
                (
                    GuessVerdict::Correct,
                    format!("correct! you found it in {} attempts", self.attempts),
                )
            }
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// How a submitted guess was judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuessVerdict {
    /// The secret is lower than the guess.
    Lower,
    /// The secret is higher than the guess.
    Higher,
    /// The guess matched the secret.
    Correct,
    /// The guess was outside the allowed range and was not counted.
    OutOfRange,
    /// There was no game accepting guesses.
    NoActiveGame,
}

impl GuessVerdict {
    /// Returns `true` for verdicts that rejected the guess.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::OutOfRange | Self::NoActiveGame)
    }
}

/// Result of [`submit_guess`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessOutcome {
    /// Human readable description of the verdict.
    pub message: String,
    /// Attempts counted in the session after this guess.
    pub attempts: u32,
    /// Whether the session is over.
    pub finished: bool,
    /// Set when the guess was rejected without changing the session.
    pub error: bool,
    /// Machine readable verdict.
    pub verdict: GuessVerdict,
}

/// Description of a session slot, returned by [`start`] and [`get_state`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Human readable description of the state.
    pub message: String,
    /// Attempts counted so far.
    pub attempts: u32,
    /// Whether guesses are refused. `true` when there is no session.
    pub finished: bool,
    /// Lifecycle phase of the slot.
    pub phase: SessionPhase,
}

// ============================================================================
// Operations
// ============================================================================

/// Starts a new game in `slot`, replacing any previous session.
///
/// Fails only when `secrets` cannot produce a valid secret, in which case the
/// slot is left unchanged.
pub fn start(
    slot: &mut Option<GameSession>,
    secrets: &dyn SecretSource,
) -> Result<StateSnapshot> {
    let secret = secrets.draw(SECRET_MIN, SECRET_MAX)?;
    let session = GameSession::new(secret)?;
    *slot = Some(session);

    Ok(StateSnapshot {
        message: format!(
            "New game started. Guess a number between {SECRET_MIN} and {SECRET_MAX}."
        ),
        attempts: 0,
        finished: false,
        phase: SessionPhase::InProgress,
    })
}

/// Submits `value` as a guess against the session in `slot`.
///
/// # Examples
///
/// ```
/// use guess_game::{game, FixedSecret, GuessVerdict};
///
/// let mut slot = None;
/// game::start(&mut slot, &FixedSecret::new(50)).unwrap();
///
/// let outcome = game::submit_guess(&mut slot, 70);
/// assert_eq!(outcome.verdict, GuessVerdict::Lower);
/// assert_eq!(outcome.attempts, 1);
/// ```
pub fn submit_guess(slot: &mut Option<GameSession>, value: i64) -> GuessOutcome {
    let session = match slot.as_mut() {
        Some(session) if !session.finished => session,
        other => {
            return GuessOutcome {
                message: "No active game. Start a new one.".to_string(),
                attempts: other.map_or(0, |s| s.attempts),
                finished: true,
                error: true,
                verdict: GuessVerdict::NoActiveGame,
            };
        }
    };

    let Some(value) = u8::try_from(value)
        .ok()
        .filter(|v| (SECRET_MIN..=SECRET_MAX).contains(v))
    else {
        return GuessOutcome {
            message: format!(
                "Value out of range: guesses must be between {SECRET_MIN} and {SECRET_MAX}."
            ),
            attempts: session.attempts,
            finished: false,
            error: true,
            verdict: GuessVerdict::OutOfRange,
        };
    };

    let (verdict, message) = session.record_guess(value);

    GuessOutcome {
        message,
        attempts: session.attempts,
        finished: session.finished,
        error: false,
        verdict,
    }
}

/// Describes the session in `slot` without changing it.
pub fn get_state(slot: Option<&GameSession>) -> StateSnapshot {
    let phase = SessionPhase::of(slot);
    let message = match phase {
        SessionPhase::InProgress => "Game in progress.",
        SessionPhase::NoSession | SessionPhase::Finished => {
            "No active game. You can start a new one."
        }
    };

    StateSnapshot {
        message: message.to_string(),
        attempts: slot.map_or(0, GameSession::attempts),
        finished: phase.is_terminal(),
        phase,
    }
}

// ============================================================================
// Tests
// ============================================================================
